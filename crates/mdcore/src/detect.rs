use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

/// File extensions that always put a document into Markdown mode.
pub const MARKDOWN_EXTENSIONS: [&str; 3] = ["md", "markdown", "mdown"];

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"(?m)^#+\s")
        .expect("Invalid HEADING regex pattern");
    static ref EMPHASIS: Regex = Regex::new(r"\*\*[^\n]+?\*\*|__[^\n]+?__")
        .expect("Invalid EMPHASIS regex pattern");
    static ref LINK: Regex = Regex::new(r"\[[^\]\n]+\]\([^)\n]+\)")
        .expect("Invalid LINK regex pattern");
    static ref LIST_OR_QUOTE: Regex = Regex::new(r"(?m)^[-*>]")
        .expect("Invalid LIST_OR_QUOTE regex pattern");
    static ref INLINE_CODE: Regex = Regex::new(r"`[^`\n]+`")
        .expect("Invalid INLINE_CODE regex pattern");
}

/// Which content heuristic fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Heading,
    Emphasis,
    Link,
    ListOrQuote,
    InlineCode,
}

/// True when the path ends in one of [`MARKDOWN_EXTENSIONS`], ignoring case.
pub fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|md| ext.eq_ignore_ascii_case(md))
        })
        .unwrap_or(false)
}

/// True when any content heuristic matches.
pub fn looks_like_markdown(text: &str) -> bool {
    HEADING.is_match(text)
        || EMPHASIS.is_match(text)
        || LINK.is_match(text)
        || LIST_OR_QUOTE.is_match(text)
        || INLINE_CODE.is_match(text)
}

/// Every heuristic that matches `text`, in a fixed order.
pub fn signals(text: &str) -> Vec<Signal> {
    let checks: [(Signal, &Regex); 5] = [
        (Signal::Heading, &HEADING),
        (Signal::Emphasis, &EMPHASIS),
        (Signal::Link, &LINK),
        (Signal::ListOrQuote, &LIST_OR_QUOTE),
        (Signal::InlineCode, &INLINE_CODE),
    ];
    checks
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(signal, _)| *signal)
        .collect()
}

/// Combined rule used by the editor: the path wins, the content is the fallback.
pub fn detect(path: Option<&Path>, text: &str) -> bool {
    path.map(is_markdown_path).unwrap_or(false) || looks_like_markdown(text)
}
