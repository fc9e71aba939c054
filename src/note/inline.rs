//! Inline notes: `STARTI [Basic] Front text Back: back text ENDI`.

use super::{IdMarker, NoteKind, NoteSyntax};
use crate::error::Result;
use regex::Regex;
use std::sync::LazyLock;

static NOTE_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("Invalid inline type regex"));

static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Tags: (.*)").expect("Invalid inline tag regex"));

/// Word-oriented syntax on a single line.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineNote;

fn rejoin(units: &[String]) -> String {
    units.join(" ")
}

impl NoteSyntax for InlineNote {
    fn kind(&self) -> NoteKind {
        NoteKind::Inline
    }

    fn split(&self, text: &str) -> Vec<String> {
        text.split(' ').map(ToString::to_string).collect()
    }

    fn note_type(&self, units: &mut Vec<String>) -> Option<String> {
        let text = rejoin(units);
        let caps = NOTE_TYPE.captures(&text)?;
        let note_type = caps[1].trim().to_string();
        let rest = text[caps.get(0)?.end()..].trim();
        *units = self.split(rest);
        Some(note_type)
    }

    fn identifier(&self, units: &mut Vec<String>) -> Option<IdMarker> {
        let text = rejoin(units);
        let (marker, range) = IdMarker::find(&text)?;
        let mut rest = text[..range.start].to_string();
        rest.push_str(&text[range.end..]);
        *units = self.split(rest.trim());
        Some(marker)
    }

    fn tags(&self, units: &mut Vec<String>) -> Vec<String> {
        let text = rejoin(units);
        let Some(caps) = TAGS.captures(&text) else {
            return Vec::new();
        };
        let tags = caps[1].split(' ').map(ToString::to_string).collect();
        if let Some(whole) = caps.get(0) {
            *units = self.split(text[..whole.start()].trim());
        }
        tags
    }

    fn field_sources(
        &self,
        _note_type: &str,
        units: &[String],
        field_names: &[String],
    ) -> Result<Vec<(String, String)>> {
        let mut sources: Vec<(String, String)> = field_names
            .iter()
            .map(|f| (f.clone(), String::new()))
            .collect();
        let mut current = 0;

        for word in units {
            if let Some(i) = field_names.iter().position(|f| {
                word.strip_suffix(':').is_some_and(|name| name == f)
            }) {
                current = i;
                continue;
            }
            if let Some((_, source)) = sources.get_mut(current) {
                source.push_str(word);
                source.push(' ');
            }
        }

        Ok(sources)
    }
}
