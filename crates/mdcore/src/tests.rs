#[cfg(test)]
mod unit_tests {
    use super::super::*;
    use std::path::Path;

    #[test]
    fn test_markdown_extensions_ignore_case() {
        assert!(is_markdown_path(Path::new("/notes/todo.md")));
        assert!(is_markdown_path(Path::new("README.MD")));
        assert!(is_markdown_path(Path::new("doc.Markdown")));
        assert!(is_markdown_path(Path::new("changes.mdown")));
        assert!(!is_markdown_path(Path::new("notes.txt")));
        assert!(!is_markdown_path(Path::new("md")));
        assert!(!is_markdown_path(Path::new("archive.md.bak")));
    }

    #[test]
    fn test_heading_needs_whitespace() {
        assert!(looks_like_markdown("# Title"));
        assert!(looks_like_markdown("intro\n## Section\nbody"));
        assert!(looks_like_markdown("#\nbody"));
        assert!(!looks_like_markdown("#hashtag"));
        assert!(!looks_like_markdown("value # comment"));
    }

    #[test]
    fn test_emphasis_link_and_code() {
        assert!(looks_like_markdown("this is **bold** text"));
        assert!(looks_like_markdown("this is __bold__ text"));
        assert!(looks_like_markdown("**a*b**"));
        assert!(looks_like_markdown("see [docs](https://example.com)"));
        assert!(looks_like_markdown("run `cargo test` first"));
        assert!(!looks_like_markdown("2 ** 3 is eight"));
    }

    #[test]
    fn test_list_and_quote_lines() {
        assert!(looks_like_markdown("- milk\n- eggs"));
        assert!(looks_like_markdown("* item"));
        assert!(looks_like_markdown("> quoted"));
        assert!(looks_like_markdown("-item"));
        assert!(looks_like_markdown("*item"));
        assert!(looks_like_markdown("-5 degrees"));
        assert!(!looks_like_markdown("plain text\nwith two lines"));
    }

    #[test]
    fn test_detect_prefers_path() {
        assert!(detect(Some(Path::new("empty.md")), ""));
        assert!(detect(None, "# Heading"));
        assert!(!detect(Some(Path::new("plain.txt")), "nothing special"));
    }

    #[test]
    fn test_signals_order() {
        let found = signals("# Title\n\nSome **bold** and `code`.");
        insta::assert_snapshot!(format!("{:?}", found), @"[Heading, Emphasis, InlineCode]");
    }
}
