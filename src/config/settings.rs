//! Persisted settings and sync state.
//!
//! Everything mdanki remembers between runs lives in one JSON document:
//! user settings (note types, syntax tokens, defaults, folder mappings) and
//! bookkeeping (content hashes, uploaded media, field names per note type).
//! Keys are camelCase so the file stays readable next to other vault config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Glob patterns ignored by a fresh state file.
pub const DEFAULT_IGNORED_FILE_GLOBS: &[&str] = &["**/*.excalidraw.md"];

/// Per-note-type settings.
///
/// Empty strings mean "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteTypeSettings {
    /// Two-group pattern (title, body) for pattern-defined notes.
    pub custom_regexp: String,
    /// Field that receives the link back to the source document.
    pub file_link_field: String,
    /// Field that receives the heading context.
    pub context_field: String,
    /// Field left untouched by pattern-defined notes.
    pub extra_field: String,
}

/// Spellings of the in-document markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyntaxTokens {
    pub begin_note: String,
    pub end_note: String,
    pub begin_inline_note: String,
    pub end_inline_note: String,
    pub target_deck_line: String,
    pub file_tags_line: String,
    pub delete_note_line: String,
    pub frozen_fields_line: String,
}

impl Default for SyntaxTokens {
    fn default() -> Self {
        Self {
            begin_note: "START".to_string(),
            end_note: "END".to_string(),
            begin_inline_note: "STARTI".to_string(),
            end_inline_note: "ENDI".to_string(),
            target_deck_line: "TARGET DECK".to_string(),
            file_tags_line: "FILE TAGS".to_string(),
            delete_note_line: "DELETE".to_string(),
            frozen_fields_line: "FROZEN".to_string(),
        }
    }
}

/// Global defaults and feature toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Defaults {
    /// Vault-relative directory scanned by `mdanki sync` without a path.
    pub scan_directory: String,
    pub global_tag: String,
    pub global_deck: String,
    /// Use `<global deck>::<folders>::<file>` as the document deck.
    pub mirror_folder_structure: bool,
    pub add_file_link: bool,
    pub add_context: bool,
    /// Write identifiers as `<!--ID:n-->` rather than `%%ID:n%%`.
    pub id_comments: bool,
    /// Turn `#tags` inside fields into Anki tags.
    pub add_obsidian_tags: bool,
    pub curly_cloze: bool,
    pub highlights_to_cloze: bool,
    pub anki_custom_cloze: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            scan_directory: String::new(),
            global_tag: "Obsidian_to_Anki".to_string(),
            global_deck: "Default".to_string(),
            mirror_folder_structure: false,
            add_file_link: false,
            add_context: false,
            id_comments: true,
            add_obsidian_tags: false,
            curly_cloze: false,
            highlights_to_cloze: false,
            anki_custom_cloze: false,
        }
    }
}

/// The whole persisted blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct State {
    pub note_type_settings: BTreeMap<String, NoteTypeSettings>,
    /// Vault-relative folder (or file) path → deck name.
    pub folder_deck_map: BTreeMap<String, String>,
    /// Vault-relative folder (or file) path → space separated tags.
    pub folder_tag_map: BTreeMap<String, String>,
    pub syntax_tokens: SyntaxTokens,
    pub defaults: Defaults,
    pub ignore_globs: Vec<String>,
    /// Media links already uploaded to Anki.
    pub added_media_list: Vec<String>,
    /// Vault-relative document path → content hash at last sync.
    pub file_hash_map: BTreeMap<String, String>,
    /// Note type → ordered field names, as reported by Anki.
    pub fields_by_note_type: BTreeMap<String, Vec<String>>,
    /// RFC 3339 timestamp of the last completed sync.
    pub last_sync: Option<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            note_type_settings: BTreeMap::new(),
            folder_deck_map: BTreeMap::new(),
            folder_tag_map: BTreeMap::new(),
            syntax_tokens: SyntaxTokens::default(),
            defaults: Defaults::default(),
            ignore_globs: DEFAULT_IGNORED_FILE_GLOBS
                .iter()
                .map(|g| (*g).to_string())
                .collect(),
            added_media_list: Vec::new(),
            file_hash_map: BTreeMap::new(),
            fields_by_note_type: BTreeMap::new(),
            last_sync: None,
        }
    }
}

impl State {
    /// Replace the field table with a fresh one from Anki.
    ///
    /// New note types get empty settings, note types that no longer exist
    /// in Anki are pruned from the settings.
    pub fn apply_note_types(&mut self, fields_by_note_type: BTreeMap<String, Vec<String>>) {
        for note_type in fields_by_note_type.keys() {
            self.note_type_settings
                .entry(note_type.clone())
                .or_default();
        }
        self.note_type_settings
            .retain(|note_type, _| fields_by_note_type.contains_key(note_type));
        self.fields_by_note_type = fields_by_note_type;
    }

    /// Settings for a note type, or the empty default.
    #[must_use]
    pub fn note_type(&self, note_type: &str) -> NoteTypeSettings {
        self.note_type_settings
            .get(note_type)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_with_camel_case_keys() {
        let state = State::default();
        let json = serde_json::to_value(&state).unwrap();

        assert!(json.get("noteTypeSettings").is_some());
        assert!(json.get("fileHashMap").is_some());
        assert_eq!(json["syntaxTokens"]["beginNote"], "START");
        assert_eq!(json["defaults"]["globalDeck"], "Default");
        assert_eq!(json["ignoreGlobs"][0], "**/*.excalidraw.md");
    }

    #[test]
    fn test_partial_state_fills_defaults() {
        let state: State =
            serde_json::from_str(r#"{"defaults": {"globalDeck": "Rust"}}"#).unwrap();
        assert_eq!(state.defaults.global_deck, "Rust");
        assert_eq!(state.defaults.global_tag, "Obsidian_to_Anki");
        assert_eq!(state.syntax_tokens.end_inline_note, "ENDI");
        assert!(state.defaults.id_comments);
    }

    #[test]
    fn test_apply_note_types_prunes_and_adds() {
        let mut state = State::default();
        state
            .note_type_settings
            .insert("Gone".into(), NoteTypeSettings::default());
        state.note_type_settings.insert(
            "Basic".into(),
            NoteTypeSettings {
                custom_regexp: "^Q: (.*)\\nA: (.*)".into(),
                ..NoteTypeSettings::default()
            },
        );

        let mut fields = BTreeMap::new();
        fields.insert("Basic".to_string(), vec!["Front".into(), "Back".into()]);
        fields.insert("Cloze".to_string(), vec!["Text".into(), "Back Extra".into()]);
        state.apply_note_types(fields);

        assert!(!state.note_type_settings.contains_key("Gone"));
        assert!(state.note_type_settings.contains_key("Cloze"));
        assert_eq!(state.note_type("Basic").custom_regexp, "^Q: (.*)\\nA: (.*)");
        assert_eq!(state.fields_by_note_type.len(), 2);
    }
}
