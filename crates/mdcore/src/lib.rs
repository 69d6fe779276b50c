pub mod detect;

pub use detect::{detect, is_markdown_path, looks_like_markdown, signals, Signal};

#[cfg(test)]
mod tests;
