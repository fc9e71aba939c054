//! Document-level patterns built from the configured syntax tokens.

use crate::config::SyntaxTokens;
use crate::error::Result;
use crate::note::MARKER_PATTERN;
use regex::{escape, Regex};
use std::sync::LazyLock;

/// `$$..$$` regions, claimed before pattern notes are searched.
pub static DISPLAY_MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$[\s\S]*?\$\$").expect("Invalid display math regex"));

/// `$..$` regions that are not part of `$$`.
pub static INLINE_MATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^$])(\$[^\s$](?:[^$]*?[^\s$])?\$)").expect("Invalid inline math regex")
});

#[derive(Debug, Clone)]
pub struct SyntaxPatterns {
    /// Group 1: note body, newline-terminated.
    pub note: Regex,
    /// Group 1: inline note body.
    pub inline: Regex,
    /// Group 1: deck name.
    pub deck: Regex,
    /// Group 1: space separated tags.
    pub tags: Regex,
    /// Group 1: note type, group 2: field lines.
    pub frozen: Regex,
    /// Delete keyword followed by a marker.
    pub delete: Regex,
    /// End token, to keep markers flush against it.
    pub end_token: String,
}

impl SyntaxPatterns {
    /// Compile patterns for `tokens`.
    ///
    /// # Errors
    ///
    /// Returns an error if a token produces an invalid pattern.
    pub fn new(tokens: &SyntaxTokens) -> Result<Self> {
        let begin = escape(&tokens.begin_note);
        let end = escape(&tokens.end_note);
        let begin_inline = escape(&tokens.begin_inline_note);
        let end_inline = escape(&tokens.end_inline_note);
        let deck = escape(&tokens.target_deck_line);
        let tags = escape(&tokens.file_tags_line);
        let frozen = escape(&tokens.frozen_fields_line);
        let delete = escape(&tokens.delete_note_line);

        Ok(Self {
            note: Regex::new(&format!(r"(?m)^{begin}\n([\s\S]*?\n){end}"))?,
            inline: Regex::new(&format!(r"{begin_inline}(.*?){end_inline}"))?,
            deck: Regex::new(&format!(r"(?m)^{deck}(?:\n|: )(.*)"))?,
            tags: Regex::new(&format!(r"(?m)^{tags}(?:\n|: )(.*)"))?,
            frozen: Regex::new(&format!(r"{frozen} - (.*?):\n((?:[^\n][\n]?)+)"))?,
            delete: Regex::new(&format!(r"{delete}\n*{MARKER_PATTERN}"))?,
            end_token: tokens.end_note.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> SyntaxPatterns {
        SyntaxPatterns::new(&SyntaxTokens::default()).unwrap()
    }

    #[test]
    fn test_block_note_body() {
        let p = patterns();
        let caps = p.note.captures("x\nSTART\nBasic\nFront: Q\nEND\n").unwrap();
        assert_eq!(&caps[1], "Basic\nFront: Q\n");
    }

    #[test]
    fn test_inline_does_not_match_block_begin() {
        let p = patterns();
        assert!(p.note.captures("STARTI [Basic] a ENDI").is_none());
        let caps = p.inline.captures("STARTI [Basic] a ENDI").unwrap();
        assert_eq!(&caps[1], " [Basic] a ");
    }

    #[test]
    fn test_deck_and_tag_lines_in_both_forms() {
        let p = patterns();
        assert_eq!(&p.deck.captures("TARGET DECK: Rust::Async").unwrap()[1], "Rust::Async");
        assert_eq!(&p.deck.captures("TARGET DECK\nRust").unwrap()[1], "Rust");
        assert_eq!(&p.tags.captures("FILE TAGS: a b").unwrap()[1], "a b");
    }

    #[test]
    fn test_frozen_and_delete() {
        let p = patterns();
        let caps = p.frozen.captures("FROZEN - Basic:\nBack: from here\n\nrest").unwrap();
        assert_eq!(&caps[1], "Basic");
        assert_eq!(&caps[2], "Back: from here\n");
        let caps = p.delete.captures("DELETE\n<!--ID:1714000000124-->").unwrap();
        assert_eq!(&caps["mdanki_id"], "1714000000124");
    }

    #[test]
    fn test_custom_tokens_are_escaped() {
        let tokens = SyntaxTokens {
            begin_note: "+++".into(),
            end_note: "---".into(),
            ..SyntaxTokens::default()
        };
        let p = SyntaxPatterns::new(&tokens).unwrap();
        assert!(p.note.is_match("+++\nBasic\nFront: Q\n---"));
    }
}
