//! Block notes.
//!
//! ```text
//! START
//! Basic
//! Front: What is ownership?
//! Back: A set of rules...
//! Tags: rust memory
//! <!--ID:1714000000123-->
//! END
//! ```

use super::{IdMarker, NoteKind, NoteSyntax, TAG_PREFIX, assign_lines};
use crate::error::Result;

/// Line-oriented syntax between the begin and end tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockNote;

impl NoteSyntax for BlockNote {
    fn kind(&self) -> NoteKind {
        NoteKind::Block
    }

    fn split(&self, text: &str) -> Vec<String> {
        text.lines().map(ToString::to_string).collect()
    }

    fn note_type(&self, units: &mut Vec<String>) -> Option<String> {
        if units.is_empty() {
            return None;
        }
        Some(units.remove(0).trim().to_string())
    }

    fn identifier(&self, units: &mut Vec<String>) -> Option<IdMarker> {
        let (marker, _) = IdMarker::find(units.last()?)?;
        units.pop();
        Some(marker)
    }

    fn tags(&self, units: &mut Vec<String>) -> Vec<String> {
        let Some(line) = units.last().and_then(|l| l.strip_prefix(TAG_PREFIX)) else {
            return Vec::new();
        };
        let tags = line.split(' ').map(ToString::to_string).collect();
        units.pop();
        tags
    }

    fn field_sources(
        &self,
        _note_type: &str,
        units: &[String],
        field_names: &[String],
    ) -> Result<Vec<(String, String)>> {
        Ok(assign_lines(units, field_names))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{FixedLinks, basic_state, ctx};
    use super::super::{FrozenFields, NoteKind, parse_note};
    use super::*;
    use crate::format::Formatter;
    use std::collections::HashMap;

    #[test]
    fn test_basic_block_note() {
        let state = basic_state();
        let frozen = FrozenFields::new();
        let links = FixedLinks(HashMap::new());
        let mut formatter = Formatter::new("Vault");

        let note = parse_note(
            &BlockNote,
            "Basic\nFront: Q\nBack: A\n",
            "",
            &ctx(&state, &frozen, &links),
            &mut formatter,
        )
        .unwrap()
        .unwrap();

        assert_eq!(note.note_type, "Basic");
        assert_eq!(note.fields["Front"], "Q");
        assert_eq!(note.fields["Back"], "A");
        assert_eq!(note.identifier, None);
        assert_eq!(note.kind, NoteKind::Block);
        assert_eq!(note.deck, "Default");
    }

    #[test]
    fn test_multiline_fields_and_missing_prefix() {
        let state = basic_state();
        let frozen = FrozenFields::new();
        let links = FixedLinks(HashMap::new());
        let mut formatter = Formatter::new("Vault");

        let note = parse_note(
            &BlockNote,
            "Basic\nThis goes to Front\nBack: line one\n\nline two",
            "",
            &ctx(&state, &frozen, &links),
            &mut formatter,
        )
        .unwrap()
        .unwrap();

        assert_eq!(note.fields["Front"], "This goes to Front");
        assert_eq!(note.fields["Back"], "<p>line one</p>\n<p>line two</p>");
    }

    #[test]
    fn test_identifier_and_tags_are_stripped() {
        let mut units = BlockNote.split("Basic\nFront: Q\nTags: a b\n<!--ID:1714000000123-->");
        assert_eq!(BlockNote.note_type(&mut units).as_deref(), Some("Basic"));
        assert_eq!(BlockNote.identifier(&mut units).map(|m| m.id), Some(1_714_000_000_123));
        assert_eq!(BlockNote.tags(&mut units), vec!["a", "b"]);
        assert_eq!(units, vec!["Front: Q"]);
    }
}
