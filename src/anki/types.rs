//! AnkiConnect wire types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// AnkiConnect API version spoken by this crate.
pub const API_VERSION: u8 = 6;

/// One request envelope: `{action, version, params}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub action: String,
    pub version: u8,
    pub params: serde_json::Value,
}

/// Duplicate handling for `addNote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteOptions {
    pub allow_duplicate: bool,
    pub duplicate_scope: String,
}

impl Default for NoteOptions {
    fn default() -> Self {
        Self {
            allow_duplicate: true,
            duplicate_scope: "deck".to_string(),
        }
    }
}

/// A note as `addNote` expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnkiNote {
    pub deck_name: String,
    pub model_name: String,
    pub fields: BTreeMap<String, String>,
    pub options: NoteOptions,
    pub tags: Vec<String>,
}

/// The subset of `notesInfo` output needed to move cards between decks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInfo {
    pub note_id: u64,
    #[serde(default)]
    pub cards: Vec<u64>,
}
