//! Document scanner.
//!
//! A [`Document`] is one markdown file during a sync run. Scanning finds
//! block, inline and pattern notes, sorts them into creates, edits and
//! deletes, and remembers where new identifiers must be written. After the
//! remote side has assigned identifiers, [`Document::finalize`] rewrites the
//! text.
//!
//! Pattern notes are searched last and may not reuse text already claimed
//! by frozen-field blocks, the deck and tag lines, block and inline notes,
//! math, delete lines or earlier pattern matches.

mod context;
mod rewrite;
mod spans;
mod syntax;

pub use context::{Heading, context_at, headings};
pub use rewrite::{count_markers, fix_newline_ids, insert_all, remove_matches, strip_markers};
pub use spans::{Span, SpanSet};
pub use syntax::{DISPLAY_MATH, INLINE_MATH, SyntaxPatterns};

use crate::config::State;
use crate::error::{Error, Result};
use crate::format::Formatter;
use crate::note::{
    BlockNote, FrozenFields, InlineNote, MARKER_PATTERN, NoteContext, NoteKind, NoteRecord,
    PatternNote, TAGS_GROUP, assign_lines, format_options, marker_text, parse_note,
};
use crate::sync::content_hash;
use crate::vault::LinkResolver;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// A compiled user pattern for one note type.
#[derive(Debug, Clone)]
pub struct NotePattern {
    pub note_type: String,
    pub extra_field: String,
    /// Groups in the user's pattern.
    pub user_groups: usize,
    /// With id and tags, id only, tags only, neither; searched in that order.
    pub variants: Vec<Regex>,
}

impl NotePattern {
    /// Compile the four search variants of a user pattern.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` if the pattern doesn't compile.
    pub fn new(note_type: &str, pattern: &str, extra_field: &str) -> Result<Self> {
        let invalid = |e: regex::Error| Error::InvalidPattern {
            note_type: note_type.to_string(),
            message: e.to_string(),
        };
        let user = Regex::new(pattern).map_err(invalid)?;

        let mut variants = Vec::with_capacity(4);
        for with_id in [true, false] {
            for with_tags in [true, false] {
                let mut composite = format!("(?m)(?:{pattern})");
                if with_tags {
                    composite.push_str(&format!("(?P<{TAGS_GROUP}>Tags: .*)"));
                }
                if with_id {
                    composite.push_str(&format!(r"\n*{MARKER_PATTERN}"));
                }
                variants.push(Regex::new(&composite).map_err(invalid)?);
            }
        }

        Ok(Self {
            note_type: note_type.to_string(),
            extra_field: extra_field.to_string(),
            user_groups: user.captures_len() - 1,
            variants,
        })
    }
}

/// Compile every configured pattern. Broken patterns are logged and skipped.
#[must_use]
pub fn compile_patterns(state: &State) -> Vec<NotePattern> {
    state
        .note_type_settings
        .iter()
        .filter(|(_, settings)| !settings.custom_regexp.trim().is_empty())
        .filter_map(|(note_type, settings)| {
            NotePattern::new(note_type, &settings.custom_regexp, &settings.extra_field)
                .map_err(|e| warn!(note_type = %note_type, error = %e, "Skipping invalid note pattern"))
                .ok()
        })
        .collect()
}

/// Everything a scan needs besides the document.
pub struct ScanContext<'a> {
    pub state: &'a State,
    pub syntax: &'a SyntaxPatterns,
    pub patterns: &'a [NotePattern],
    /// Identifiers of every note in Anki.
    pub known_ids: &'a HashSet<u64>,
    pub vault_name: &'a str,
    pub links: &'a dyn LinkResolver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Unscanned,
    Scanning,
    Scanned { has_changes: bool },
}

/// A note that couldn't be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteFailure {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Document {
    path: String,
    text: String,
    original: String,
    state: ScanState,
    ignored: SpanSet,
    media: Vec<String>,
    pub notes_to_add: Vec<NoteRecord>,
    pub notes_to_edit: Vec<NoteRecord>,
    pub notes_to_delete: Vec<u64>,
    pub failures: Vec<NoteFailure>,
    /// Identifiers found in the document but unknown to Anki.
    pub orphaned: Vec<u64>,
    /// Cloze notes dropped for lack of cloze deletions.
    pub rejected: usize,
}

impl Document {
    #[must_use]
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            path: path.into(),
            original: text.clone(),
            text,
            state: ScanState::Unscanned,
            ignored: SpanSet::new(),
            media: Vec::new(),
            notes_to_add: Vec::new(),
            notes_to_edit: Vec::new(),
            notes_to_delete: Vec::new(),
            failures: Vec::new(),
            orphaned: Vec::new(),
            rejected: 0,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn state(&self) -> ScanState {
        self.state
    }

    #[must_use]
    pub fn ignored_spans(&self) -> &[Span] {
        self.ignored.as_slice()
    }

    /// Media links referenced by the scanned notes.
    #[must_use]
    pub fn media(&self) -> &[String] {
        &self.media
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        matches!(self.state, ScanState::Scanned { has_changes: true })
    }

    /// Whether the working text differs from what was read.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.text != self.original
    }

    #[must_use]
    pub fn content_hash(&self) -> String {
        content_hash(&self.text)
    }

    /// Find all notes in the document.
    pub fn scan(&mut self, ctx: &ScanContext<'_>) {
        self.state = ScanState::Scanning;
        let text = std::mem::take(&mut self.text);
        let path = self.path.clone();
        let defaults = &ctx.state.defaults;
        let mut formatter = Formatter::new(ctx.vault_name);

        self.claim_reserved(&text, ctx.syntax);

        let deck = document_deck(&path, &text, ctx.state, ctx.syntax);
        let tags = document_tags(&path, &text, ctx.state, ctx.syntax);
        let frozen = self.frozen_fields(&text, ctx, &mut formatter);
        let file_url = defaults
            .add_file_link
            .then(|| formatter.obsidian_url(&path));
        let headings = if defaults.add_context {
            headings(&text)
        } else {
            Vec::new()
        };
        let context = |position: usize| {
            if defaults.add_context {
                context_at(&path, &headings, position)
            } else {
                String::new()
            }
        };

        let note_ctx = NoteContext {
            state: ctx.state,
            frozen_fields: &frozen,
            deck: &deck,
            tags: &tags,
            file_url: file_url.as_deref(),
            path: &path,
            links: ctx.links,
        };

        for caps in ctx.syntax.note.captures_iter(&text) {
            let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let result = parse_note(
                &BlockNote,
                body.as_str(),
                &context(whole.start()),
                &note_ctx,
                &mut formatter,
            );
            self.accept(result, body.end(), ctx.known_ids);
        }

        for caps in ctx.syntax.inline.captures_iter(&text) {
            let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let result = parse_note(
                &InlineNote,
                body.as_str(),
                &context(whole.start()),
                &note_ctx,
                &mut formatter,
            );
            self.accept(result, body.end(), ctx.known_ids);
        }

        for pattern in ctx.patterns {
            // Text this pattern already failed on; later variants would only
            // fail on it again.
            let mut attempted = SpanSet::new();
            for variant in &pattern.variants {
                for caps in variant.captures_iter(&text) {
                    let Some(whole) = caps.get(0) else {
                        continue;
                    };
                    let span = Span::new(whole.start(), whole.end());
                    if span.is_empty() || self.ignored.covers(span) || attempted.covers(span) {
                        continue;
                    }

                    let note = PatternNote::from_captures(
                        &pattern.note_type,
                        &pattern.extra_field,
                        pattern.user_groups,
                        &caps,
                    );
                    let result = parse_note(&note, "", &context(span.start), &note_ctx, &mut formatter);
                    // Only a parsed note claims its text.
                    if matches!(result, Ok(Some(_))) {
                        self.ignored.claim(span);
                    } else {
                        attempted.claim(span);
                    }
                    self.accept(result, span.end, ctx.known_ids);
                }
            }
        }

        for caps in ctx.syntax.delete.captures_iter(&text) {
            if let Some(id) = caps
                .name("mdanki_id")
                .and_then(|m| m.as_str().parse().ok())
            {
                self.notes_to_delete.push(id);
            }
        }

        self.media = formatter.detected_media().to_vec();
        self.text = text;

        let has_changes = !(self.notes_to_add.is_empty()
            && self.notes_to_edit.is_empty()
            && self.notes_to_delete.is_empty());
        self.state = ScanState::Scanned { has_changes };

        info!(
            path = %self.path,
            add = self.notes_to_add.len(),
            edit = self.notes_to_edit.len(),
            delete = self.notes_to_delete.len(),
            failed = self.failures.len(),
            "Scanned document"
        );
    }

    fn claim_reserved(&mut self, text: &str, syntax: &SyntaxPatterns) {
        self.ignored.claim_matches(&syntax.frozen, text);
        for line in [&syntax.deck, &syntax.tags] {
            if let Some(m) = line.find(text) {
                self.ignored.claim(Span::new(m.start(), m.end()));
            }
        }
        self.ignored.claim_matches(&syntax.note, text);
        self.ignored.claim_matches(&syntax.inline, text);
        self.ignored.claim_matches(&DISPLAY_MATH, text);
        self.ignored.claim_matches(&INLINE_MATH, text);
        self.ignored.claim_matches(&syntax.delete, text);
    }

    fn frozen_fields(
        &mut self,
        text: &str,
        ctx: &ScanContext<'_>,
        formatter: &mut Formatter,
    ) -> FrozenFields {
        let mut frozen = FrozenFields::new();

        for caps in ctx.syntax.frozen.captures_iter(text) {
            let note_type = caps[1].trim();
            let Some(field_names) = ctx.state.fields_by_note_type.get(note_type) else {
                self.record_failure(&Error::UnknownNoteType {
                    note_type: note_type.to_string(),
                    path: self.path.clone(),
                });
                continue;
            };

            let lines: Vec<String> = caps[2].lines().map(ToString::to_string).collect();
            let options = format_options(note_type, &ctx.state.defaults);
            let entry = frozen.entry(note_type.to_string()).or_default();
            for (field, source) in assign_lines(&lines, field_names) {
                let rendered = formatter.format(source.trim(), options);
                entry.insert(field, rendered.text.trim().to_string());
            }
            debug!(path = %self.path, note_type, "Frozen fields");
        }

        frozen
    }

    fn accept(&mut self, result: Result<Option<NoteRecord>>, position: usize, known_ids: &HashSet<u64>) {
        match result {
            Ok(Some(mut note)) => match note.identifier {
                None => {
                    note.identifier_position = position;
                    self.notes_to_add.push(note);
                }
                Some(id) if known_ids.contains(&id) => self.notes_to_edit.push(note),
                Some(id) => {
                    warn!(path = %self.path, id, "Note does not exist in Anki, skipping");
                    self.orphaned.push(id);
                }
            },
            Ok(None) => self.rejected += 1,
            Err(e) => self.record_failure(&e),
        }
    }

    fn record_failure(&mut self, error: &Error) {
        warn!(path = %self.path, error = %error, "Failed to parse note");
        self.failures.push(NoteFailure {
            path: self.path.clone(),
            message: error.to_string(),
        });
    }

    /// Insert markers for every new note that received an identifier.
    pub fn write_ids(&mut self, id_comments: bool) {
        let inserts: Vec<(usize, String)> = self
            .notes_to_add
            .iter()
            .filter_map(|note| {
                let marker = marker_text(note.identifier?, id_comments);
                let insert = match note.kind {
                    NoteKind::Block => format!("{marker}\n"),
                    NoteKind::Inline => format!("{marker} "),
                    NoteKind::Pattern => format!("\n\n{marker}\n"),
                };
                Some((note.identifier_position, insert))
            })
            .collect();

        if !inserts.is_empty() {
            self.text = insert_all(&self.text, inserts);
        }
    }

    pub fn fix_newline_ids(&mut self, end_token: &str) {
        self.text = fix_newline_ids(&self.text, end_token);
    }

    /// Drop delete lines from the text.
    pub fn remove_empties(&mut self, delete: &Regex) {
        self.text = remove_matches(&self.text, delete);
    }

    /// Apply every rewrite that follows a sync.
    pub fn finalize(&mut self, syntax: &SyntaxPatterns, id_comments: bool) {
        self.write_ids(id_comments);
        self.fix_newline_ids(&syntax.end_token);
        self.remove_empties(&syntax.delete);
    }

    /// New notes still waiting for an identifier.
    #[must_use]
    pub fn unassigned(&self) -> usize {
        self.notes_to_add
            .iter()
            .filter(|n| n.identifier.is_none())
            .count()
    }
}

/// Closest entry for `path` in a folder map: the file itself, then each
/// parent folder, then the vault root (`""`).
fn nearest<'a>(map: &'a BTreeMap<String, String>, path: &str) -> Option<&'a String> {
    if let Some(value) = map.get(path) {
        return Some(value);
    }
    let mut folder = path;
    while let Some((parent, _)) = folder.rsplit_once('/') {
        if let Some(value) = map.get(parent) {
            return Some(value);
        }
        folder = parent;
    }
    map.get("")
}

/// Deck for notes in the document, before any per-note link override.
#[must_use]
pub fn document_deck(path: &str, text: &str, state: &State, syntax: &SyntaxPatterns) -> String {
    let defaults = &state.defaults;
    let mut deck = defaults.global_deck.clone();

    if defaults.mirror_folder_structure {
        let stem = path.strip_suffix(".md").unwrap_or(path);
        let mirrored = stem.replace('/', "::");
        deck = if defaults.global_deck.is_empty() {
            mirrored
        } else {
            format!("{}::{mirrored}", defaults.global_deck)
        };
    }

    if let Some(folder_deck) = nearest(&state.folder_deck_map, path) {
        deck.clone_from(folder_deck);
    }

    if let Some(caps) = syntax.deck.captures(text) {
        let line = caps[1].trim();
        if !line.is_empty() {
            deck = line.to_string();
        }
    }

    deck
}

/// Tags every note in the document starts with.
#[must_use]
pub fn document_tags(path: &str, text: &str, state: &State, syntax: &SyntaxPatterns) -> Vec<String> {
    let mut tags = Vec::new();
    if !state.defaults.global_tag.is_empty() {
        tags.push(state.defaults.global_tag.clone());
    }
    if let Some(folder_tags) = nearest(&state.folder_tag_map, path) {
        tags.extend(folder_tags.split_whitespace().map(ToString::to_string));
    }
    if let Some(caps) = syntax.tags.captures(text) {
        tags.extend(caps[1].split(' ').filter(|t| !t.is_empty()).map(ToString::to_string));
    }
    tags
}
