//! Note records and the note parsers.
//!
//! Three syntaxes produce notes:
//!
//! - [`BlockNote`]: `START` / type line / `Field:` lines / `END`
//! - [`InlineNote`]: `STARTI [Type] Field: a Other: b ENDI`
//! - [`PatternNote`]: a user pattern whose first two groups are title and body
//!
//! They differ only in how a fragment is split and how its parts are found,
//! which is what [`NoteSyntax`] captures. Everything else (type lookup,
//! rendering, file links, frozen fields, context, tags, cloze checks) lives
//! in [`parse_note`].

mod block;
mod inline;
mod marker;
mod pattern;

pub use block::BlockNote;
pub use inline::InlineNote;
pub use marker::{ID_MARKER, IdMarker, MARKER_PATTERN, marker_text};
pub use pattern::{PatternNote, TAGS_GROUP};

use crate::anki::{AnkiNote, NoteOptions};
use crate::config::{Defaults, State};
use crate::error::{Error, Result};
use crate::format::{ClozeStyle, FormatOptions, Formatter, has_cloze};
use crate::vault::LinkResolver;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Prefix of a tag line inside a note.
pub const TAG_PREFIX: &str = "Tags: ";

/// Note type → field → text appended to that field for every note.
pub type FrozenFields = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Block,
    Inline,
    Pattern,
}

/// One flashcard, before or after it exists in Anki.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteRecord {
    pub note_type: String,
    /// Keys are always declared fields of `note_type`.
    pub fields: BTreeMap<String, String>,
    pub deck: String,
    pub tags: Vec<String>,
    pub identifier: Option<u64>,
    /// Where the marker goes once an identifier is assigned.
    pub identifier_position: usize,
    pub kind: NoteKind,
}

impl NoteRecord {
    /// The note as `addNote` wants it.
    #[must_use]
    pub fn to_anki_note(&self) -> AnkiNote {
        AnkiNote {
            deck_name: self.deck.clone(),
            model_name: self.note_type.clone(),
            fields: self.fields.clone(),
            options: NoteOptions::default(),
            tags: self.tags.clone(),
        }
    }
}

/// Per-document inputs shared by every note in the document.
pub struct NoteContext<'a> {
    pub state: &'a State,
    pub frozen_fields: &'a FrozenFields,
    /// Document deck, used unless the marker links elsewhere.
    pub deck: &'a str,
    /// Document tag template: global tag, folder tags, tag line.
    pub tags: &'a [String],
    /// Deep link to the document when file links are enabled.
    pub file_url: Option<&'a str>,
    /// Vault-relative path of the document.
    pub path: &'a str,
    pub links: &'a dyn LinkResolver,
}

impl NoteContext<'_> {
    fn field_names(&self, note_type: &str) -> Option<&[String]> {
        self.state
            .fields_by_note_type
            .get(note_type)
            .map(Vec::as_slice)
    }

    /// Deck named after the folder of a linked document.
    fn deck_from_link(&self, link: &str) -> Option<String> {
        let Some(target) = self.links.resolve_link(link, self.path) else {
            warn!(link, path = %self.path, "Could not resolve deck link, keeping document deck");
            return None;
        };
        let global = &self.state.defaults.global_deck;
        match target.rsplit_once('/') {
            Some((folder, _)) => Some(format!("{global}::{}", folder.replace('/', "::"))),
            None => Some(global.clone()),
        }
    }
}

/// How one syntax splits a fragment and finds its parts.
///
/// Methods that find a part remove it from `units`, so later steps only see
/// what is left.
pub trait NoteSyntax {
    fn kind(&self) -> NoteKind;

    /// Split the trimmed fragment into units (lines, words, groups).
    fn split(&self, text: &str) -> Vec<String>;

    fn note_type(&self, units: &mut Vec<String>) -> Option<String>;

    fn identifier(&self, units: &mut Vec<String>) -> Option<IdMarker>;

    fn tags(&self, units: &mut Vec<String>) -> Vec<String>;

    /// Raw source for each field, in declared order.
    ///
    /// # Errors
    ///
    /// Returns an error if the units can't be mapped onto `field_names`.
    fn field_sources(
        &self,
        note_type: &str,
        units: &[String],
        field_names: &[String],
    ) -> Result<Vec<(String, String)>>;

    /// Heading appended to the file link, if any.
    fn link_heading(&self) -> Option<&str> {
        None
    }
}

/// Cloze conversion for a note type.
#[must_use]
pub fn cloze_style(note_type: &str, defaults: &Defaults) -> Option<ClozeStyle> {
    if defaults.anki_custom_cloze {
        Some(ClozeStyle::Custom)
    } else if defaults.curly_cloze && note_type.contains("Cloze") {
        Some(ClozeStyle::Numbered)
    } else {
        None
    }
}

/// Formatter switches for a note type.
#[must_use]
pub fn format_options(note_type: &str, defaults: &Defaults) -> FormatOptions {
    FormatOptions {
        cloze: cloze_style(note_type, defaults),
        highlights_to_cloze: defaults.highlights_to_cloze,
        collect_tags: defaults.add_obsidian_tags,
    }
}

/// Split a block of `Field:` lines into per-field sources.
///
/// Lines that don't start a field continue the current one. The first
/// field is current at the start.
#[must_use]
pub fn assign_lines(lines: &[String], field_names: &[String]) -> Vec<(String, String)> {
    let mut sources: Vec<(String, String)> = field_names
        .iter()
        .map(|f| (f.clone(), String::new()))
        .collect();
    let mut current = 0;

    for line in lines {
        let mut rest = line.as_str();
        for (i, field) in field_names.iter().enumerate() {
            if let Some(stripped) = line
                .strip_prefix(field.as_str())
                .and_then(|l| l.strip_prefix(':'))
            {
                current = i;
                rest = stripped;
                break;
            }
        }
        if let Some((_, source)) = sources.get_mut(current) {
            source.push_str(rest);
            source.push('\n');
        }
    }

    sources
}

/// Parse one note fragment.
///
/// Returns `Ok(None)` when a cloze note has no cloze deletions after
/// rendering.
///
/// # Errors
///
/// Returns `UnknownNoteType` if the note type isn't known, or the error
/// from the syntax's field assignment. Both only affect this note.
pub fn parse_note<S: NoteSyntax>(
    syntax: &S,
    fragment: &str,
    context: &str,
    ctx: &NoteContext<'_>,
    formatter: &mut Formatter,
) -> Result<Option<NoteRecord>> {
    let mut units = syntax.split(fragment.trim());

    let note_type = syntax.note_type(&mut units).unwrap_or_default();
    let Some(field_names) = ctx.field_names(&note_type) else {
        return Err(Error::UnknownNoteType {
            note_type,
            path: ctx.path.to_string(),
        });
    };

    let marker = syntax.identifier(&mut units);
    let line_tags = syntax.tags(&mut units);
    let sources = syntax.field_sources(&note_type, &units, field_names)?;

    let defaults = &ctx.state.defaults;
    let options = format_options(&note_type, defaults);
    let mut fields = BTreeMap::new();
    let mut inline_tags = Vec::new();
    for (field, source) in sources {
        let formatted = formatter.format(source.trim(), options);
        fields.insert(field, formatted.text.trim().to_string());
        inline_tags.extend(formatted.tags);
    }

    let settings = ctx.state.note_type(&note_type);

    if let Some(url) = ctx.file_url {
        let first = field_names
            .first()
            .and_then(|f| fields.get(f))
            .cloned()
            .unwrap_or_default();
        if let Some(value) = fields.get_mut(&settings.file_link_field) {
            let href = match syntax.link_heading() {
                Some(heading) => format!("{url}%23{}", urlencoding::encode(heading)),
                None => url.to_string(),
            };
            value.push_str(&format!(
                "<a href=\"{href}\" class=\"obsidian-link\">{first}</a>"
            ));
        }
    }

    if let Some(frozen) = ctx.frozen_fields.get(&note_type) {
        for (field, value) in &mut fields {
            if let Some(extra) = frozen.get(field) {
                value.push_str(extra);
            }
        }
    }

    if !context.is_empty() {
        if let Some(value) = fields.get_mut(&settings.context_field) {
            value.push_str(context);
        }
    }

    if note_type.contains("Cloze") && !fields.values().any(|v| has_cloze(v)) {
        warn!(path = %ctx.path, note_type = %note_type, "Cloze note without cloze deletions, skipping");
        return Ok(None);
    }

    let mut tags: Vec<String> = ctx.tags.to_vec();
    tags.extend(line_tags);
    if let Some(marker) = &marker {
        tags.extend(marker.tags.iter().cloned());
    }
    tags.extend(inline_tags);
    tags.retain(|t| !t.is_empty());

    let deck = marker
        .as_ref()
        .and_then(|m| m.link.as_deref())
        .and_then(|link| ctx.deck_from_link(link))
        .unwrap_or_else(|| ctx.deck.to_string());

    debug!(path = %ctx.path, note_type = %note_type, kind = ?syntax.kind(), "Parsed note");

    Ok(Some(NoteRecord {
        note_type,
        fields,
        deck,
        tags,
        identifier: marker.map(|m| m.id),
        identifier_position: 0,
        kind: syntax.kind(),
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::NoteTypeSettings;
    use std::collections::HashMap;

    /// Resolver over a fixed link → path table.
    pub struct FixedLinks(pub HashMap<String, String>);

    impl LinkResolver for FixedLinks {
        fn resolve_link(&self, link: &str, _source: &str) -> Option<String> {
            self.0.get(link).cloned()
        }
    }

    pub fn basic_state() -> State {
        let mut state = State::default();
        let mut fields = BTreeMap::new();
        fields.insert("Basic".to_string(), vec!["Front".into(), "Back".into()]);
        fields.insert("Cloze".to_string(), vec!["Text".into(), "Back Extra".into()]);
        fields.insert(
            "Basic (and reversed card)".to_string(),
            vec!["Front".into(), "Back".into()],
        );
        state.apply_note_types(fields);
        state
    }

    pub fn ctx<'a>(state: &'a State, frozen: &'a FrozenFields, links: &'a FixedLinks) -> NoteContext<'a> {
        NoteContext {
            state,
            frozen_fields: frozen,
            deck: "Default",
            tags: &[],
            file_url: None,
            path: "notes/rust.md",
            links,
        }
    }

    #[test]
    fn test_assign_lines_switches_fields() {
        let lines: Vec<String> = ["Front: Q", "more Q", "Back: A"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let fields = vec!["Front".to_string(), "Back".to_string()];
        let sources = assign_lines(&lines, &fields);
        assert_eq!(sources[0], ("Front".to_string(), " Q\nmore Q\n".to_string()));
        assert_eq!(sources[1], ("Back".to_string(), " A\n".to_string()));
    }

    #[test]
    fn test_unknown_note_type_is_an_error() {
        let state = basic_state();
        let frozen = FrozenFields::new();
        let links = FixedLinks(HashMap::new());
        let mut formatter = Formatter::new("Vault");
        let err = parse_note(
            &BlockNote,
            "Basicc\nFront: Q",
            "",
            &ctx(&state, &frozen, &links),
            &mut formatter,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownNoteType { ref note_type, ref path } if note_type == "Basicc" && path == "notes/rust.md"
        ));
    }

    #[test]
    fn test_cloze_note_without_deletions_is_rejected() {
        let state = basic_state();
        let frozen = FrozenFields::new();
        let links = FixedLinks(HashMap::new());
        let mut formatter = Formatter::new("Vault");
        let parsed = parse_note(
            &BlockNote,
            "Cloze\nText: nothing hidden",
            "",
            &ctx(&state, &frozen, &links),
            &mut formatter,
        )
        .unwrap();
        assert!(parsed.is_none());

        let parsed = parse_note(
            &BlockNote,
            "Cloze\nText: {{c1::hidden}}",
            "",
            &ctx(&state, &frozen, &links),
            &mut formatter,
        )
        .unwrap();
        assert!(parsed.is_some());
    }

    #[test]
    fn test_custom_cloze_notes_are_kept() {
        let mut state = basic_state();
        state.defaults.anki_custom_cloze = true;
        let frozen = FrozenFields::new();
        let links = FixedLinks(HashMap::new());
        let mut formatter = Formatter::new("Vault");
        let parsed = parse_note(
            &BlockNote,
            "Cloze\nText: the {hidden} word",
            "",
            &ctx(&state, &frozen, &links),
            &mut formatter,
        )
        .unwrap()
        .unwrap();
        assert_eq!(parsed.fields["Text"], "the {{c1:hidden}} word");
    }

    #[test]
    fn test_file_link_frozen_and_context_are_appended() {
        let mut state = basic_state();
        state.note_type_settings.insert(
            "Basic".into(),
            NoteTypeSettings {
                file_link_field: "Back".into(),
                context_field: "Front".into(),
                ..NoteTypeSettings::default()
            },
        );
        let mut frozen = FrozenFields::new();
        frozen
            .entry("Basic".into())
            .or_default()
            .insert("Back".into(), "<em>frozen</em>".into());
        let links = FixedLinks(HashMap::new());
        let mut note_ctx = ctx(&state, &frozen, &links);
        note_ctx.file_url = Some("obsidian://open?vault=V&file=notes%2Frust.md");

        let mut formatter = Formatter::new("V");
        let note = parse_note(
            &BlockNote,
            "Basic\nFront: Q\nBack: A",
            "notes/rust.md > Ownership",
            &note_ctx,
            &mut formatter,
        )
        .unwrap()
        .unwrap();

        assert_eq!(note.fields["Front"], "Qnotes/rust.md > Ownership");
        assert_eq!(
            note.fields["Back"],
            "A<a href=\"obsidian://open?vault=V&file=notes%2Frust.md\" class=\"obsidian-link\">Q</a><em>frozen</em>"
        );
    }

    #[test]
    fn test_unconfigured_file_link_field_adds_nothing() {
        let state = basic_state();
        let frozen = FrozenFields::new();
        let links = FixedLinks(HashMap::new());
        let mut note_ctx = ctx(&state, &frozen, &links);
        note_ctx.file_url = Some("obsidian://open?vault=V&file=x.md");

        let mut formatter = Formatter::new("V");
        let note = parse_note(&BlockNote, "Basic\nFront: Q\nBack: A", "", &note_ctx, &mut formatter)
            .unwrap()
            .unwrap();
        assert_eq!(note.fields.len(), 2);
        assert_eq!(note.fields["Back"], "A");
    }

    #[test]
    fn test_marker_link_overrides_deck() {
        let state = basic_state();
        let frozen = FrozenFields::new();
        let mut table = HashMap::new();
        table.insert("Ownership".to_string(), "Rust/Memory/Ownership.md".to_string());
        table.insert("Top".to_string(), "Top.md".to_string());
        let links = FixedLinks(table);
        let note_ctx = ctx(&state, &frozen, &links);
        let mut formatter = Formatter::new("V");

        let note = parse_note(
            &BlockNote,
            "Basic\nFront: Q\nBack: A\n<!--ID:1714000000123 [[Ownership]]-->",
            "",
            &note_ctx,
            &mut formatter,
        )
        .unwrap()
        .unwrap();
        assert_eq!(note.deck, "Default::Rust::Memory");
        assert_eq!(note.identifier, Some(1_714_000_000_123));

        let note = parse_note(
            &BlockNote,
            "Basic\nFront: Q\nBack: A\n<!--ID:1714000000123 [[Top]]-->",
            "",
            &note_ctx,
            &mut formatter,
        )
        .unwrap()
        .unwrap();
        assert_eq!(note.deck, "Default");

        let note = parse_note(
            &BlockNote,
            "Basic\nFront: Q\nBack: A\n<!--ID:1714000000123 [[Missing]]-->",
            "",
            &note_ctx,
            &mut formatter,
        )
        .unwrap()
        .unwrap();
        assert_eq!(note.deck, "Default");
    }

    #[test]
    fn test_tags_merge_in_order() {
        let mut state = basic_state();
        state.defaults.add_obsidian_tags = true;
        let frozen = FrozenFields::new();
        let links = FixedLinks(HashMap::new());
        let template = vec!["Obsidian_to_Anki".to_string(), "folder".to_string()];
        let mut note_ctx = ctx(&state, &frozen, &links);
        note_ctx.tags = &template;
        let mut formatter = Formatter::new("V");

        let note = parse_note(
            &BlockNote,
            "Basic\nFront: Q #inline\nBack: A\nTags: line1 line2\n<!--ID:1714000000123 #marker-->",
            "",
            &note_ctx,
            &mut formatter,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            note.tags,
            vec!["Obsidian_to_Anki", "folder", "line1", "line2", "marker", "inline"]
        );
        assert_eq!(note.fields["Front"], "Q");
    }
}
