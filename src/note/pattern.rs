//! Notes found by a user-supplied pattern.
//!
//! The pattern's first group is the title (first field) and its second group
//! the body (second field). A `Tags: ...` suffix and an identifier marker may
//! follow the match; the scanner appends those to the pattern.

use super::{IdMarker, NoteKind, NoteSyntax, TAG_PREFIX};
use crate::error::{Error, Result};
use regex::Captures;

/// Name of the tag group appended to user patterns.
pub const TAGS_GROUP: &str = "mdanki_tags";

#[derive(Debug, Clone)]
pub struct PatternNote {
    note_type: String,
    title: String,
    body: String,
    marker: Option<IdMarker>,
    tags_line: Option<String>,
    extra_field: String,
}

impl PatternNote {
    /// Build from one match of the composite pattern.
    ///
    /// `user_groups` is the number of groups in the user's own pattern; the
    /// body is only read when there are at least two.
    #[must_use]
    pub fn from_captures(
        note_type: &str,
        extra_field: &str,
        user_groups: usize,
        caps: &Captures<'_>,
    ) -> Self {
        let group = |i: usize| {
            caps.get(i)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        Self {
            note_type: note_type.to_string(),
            title: group(1),
            body: if user_groups >= 2 { group(2) } else { String::new() },
            marker: IdMarker::from_captures(caps),
            tags_line: caps.name(TAGS_GROUP).map(|m| m.as_str().to_string()),
            extra_field: extra_field.to_string(),
        }
    }
}

impl NoteSyntax for PatternNote {
    fn kind(&self) -> NoteKind {
        NoteKind::Pattern
    }

    fn split(&self, _text: &str) -> Vec<String> {
        vec![self.title.clone(), self.body.clone()]
    }

    fn note_type(&self, _units: &mut Vec<String>) -> Option<String> {
        Some(self.note_type.clone())
    }

    fn identifier(&self, _units: &mut Vec<String>) -> Option<IdMarker> {
        self.marker.clone()
    }

    fn tags(&self, _units: &mut Vec<String>) -> Vec<String> {
        self.tags_line
            .as_deref()
            .map(|line| line.strip_prefix(TAG_PREFIX).unwrap_or(line))
            .map(|line| line.split(' ').map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    fn field_sources(
        &self,
        note_type: &str,
        units: &[String],
        field_names: &[String],
    ) -> Result<Vec<(String, String)>> {
        if field_names.len() < 2 {
            return Err(Error::InvalidPattern {
                note_type: note_type.to_string(),
                message: "pattern notes need a note type with at least two fields".to_string(),
            });
        }

        let mut sources = Vec::with_capacity(field_names.len());
        for (i, field) in field_names.iter().enumerate() {
            let source = match i {
                0 | 1 => units.get(i).cloned().unwrap_or_default(),
                _ if *field == self.extra_field => continue,
                _ => String::new(),
            };
            sources.push((field.clone(), source));
        }
        Ok(sources)
    }

    fn link_heading(&self) -> Option<&str> {
        Some(self.title.as_str())
    }
}
