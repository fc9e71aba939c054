//! AnkiConnect protocol.
//!
//! Builders in this module only return [`Request`] envelopes; nothing is sent
//! until a [`CardStore`] invokes them. This keeps batching cheap: the sync
//! manager nests hundreds of envelopes inside `multi` requests and sends them
//! in a single round-trip.
//!
//! Response envelopes have exactly two keys, `error` and `result`. Anything
//! else is a protocol violation.

mod client;
mod types;

pub use client::AnkiClient;
pub use types::{AnkiNote, NoteInfo, NoteOptions, Request, API_VERSION};

use crate::error::{Error, Result};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use tracing::{debug, warn};

/// Anything that can answer AnkiConnect requests.
///
/// Implemented by the HTTP [`AnkiClient`]; tests provide scripted stores.
pub trait CardStore {
    /// Send one request and return its validated `result`.
    ///
    /// Implementations must reject malformed envelopes and non-null errors.
    fn invoke(&self, request: &Request) -> impl Future<Output = Result<Value>> + Send;
}

fn request(action: &str, params: Value) -> Request {
    Request {
        action: action.to_string(),
        version: API_VERSION,
        params,
    }
}

/// Wrap several requests into one `multi` request.
#[must_use]
pub fn multi(actions: Vec<Request>) -> Request {
    request("multi", json!({ "actions": actions }))
}

#[must_use]
pub fn request_permission() -> Request {
    request("requestPermission", json!({}))
}

#[must_use]
pub fn model_names() -> Request {
    request("modelNames", json!({}))
}

#[must_use]
pub fn model_field_names(model_name: &str) -> Request {
    request("modelFieldNames", json!({ "modelName": model_name }))
}

#[must_use]
pub fn find_notes(query: &str) -> Request {
    request("findNotes", json!({ "query": query }))
}

#[must_use]
pub fn notes_info(note_ids: &[u64]) -> Request {
    request("notesInfo", json!({ "notes": note_ids }))
}

#[must_use]
pub fn create_deck(deck: &str) -> Request {
    request("createDeck", json!({ "deck": deck }))
}

#[must_use]
pub fn add_note(note: &AnkiNote) -> Request {
    request("addNote", json!({ "note": note }))
}

#[must_use]
pub fn delete_notes(note_ids: &[u64]) -> Request {
    request("deleteNotes", json!({ "notes": note_ids }))
}

/// Update fields and tags of an existing note. Tags fully replace the old ones.
#[must_use]
pub fn update_note(id: u64, fields: &BTreeMap<String, String>, tags: &[String]) -> Request {
    request(
        "updateNote",
        json!({
            "note": {
                "id": id,
                "fields": fields,
                "tags": tags,
            }
        }),
    )
}

#[must_use]
pub fn change_deck(card_ids: &[u64], deck: &str) -> Request {
    request("changeDeck", json!({ "cards": card_ids, "deck": deck }))
}

#[must_use]
pub fn store_media_file(filename: &str, path: &str) -> Request {
    request("storeMediaFile", json!({ "filename": filename, "path": path }))
}

/// Validate a response envelope and extract its `result`.
///
/// # Errors
///
/// Returns `Protocol` if the envelope does not have exactly the keys
/// `error` and `result`, and `Anki` if `error` is non-null.
pub fn parse_envelope(response: &Value) -> Result<Value> {
    let obj = response
        .as_object()
        .ok_or_else(|| Error::Protocol("response is not an object".to_string()))?;

    if obj.len() != 2 {
        return Err(Error::Protocol(
            "response has an unexpected number of fields".to_string(),
        ));
    }
    let error = obj
        .get("error")
        .ok_or_else(|| Error::Protocol("response is missing required error field".to_string()))?;
    let result = obj
        .get("result")
        .ok_or_else(|| Error::Protocol("response is missing required result field".to_string()))?;

    match error {
        Value::Null => Ok(result.clone()),
        Value::String(msg) => Err(Error::Anki(msg.clone())),
        other => Err(Error::Anki(other.to_string())),
    }
}

/// Ask AnkiConnect for permission to use the API.
///
/// # Errors
///
/// Returns `PermissionDenied` if the answer is anything but `granted`, or
/// the underlying transport error.
pub async fn check_permission<S: CardStore>(store: &S) -> Result<()> {
    let result = store.invoke(&request_permission()).await?;
    match result.get("permission").and_then(Value::as_str) {
        Some("granted") => Ok(()),
        other => {
            debug!(?other, "Permission answer");
            Err(Error::PermissionDenied)
        }
    }
}

/// Fetch every note type with its ordered field names.
///
/// # Errors
///
/// Returns an error if either call fails or returns an unexpected shape.
pub async fn fetch_note_types<S: CardStore>(store: &S) -> Result<BTreeMap<String, Vec<String>>> {
    let names: Vec<String> = serde_json::from_value(store.invoke(&model_names()).await?)?;

    let mut fields_by_note_type = BTreeMap::new();
    for name in names {
        let fields: Vec<String> =
            serde_json::from_value(store.invoke(&model_field_names(&name)).await?)?;
        fields_by_note_type.insert(name, fields);
    }
    Ok(fields_by_note_type)
}

/// Fetch the identifiers of every note in the collection.
///
/// # Errors
///
/// Returns an error if the call fails or the result is not a list of ids.
pub async fn fetch_note_ids<S: CardStore>(store: &S) -> Result<HashSet<u64>> {
    let ids: Vec<u64> = serde_json::from_value(store.invoke(&find_notes("")).await?)?;
    Ok(ids.into_iter().collect())
}

/// Map note identifiers to their card identifiers.
///
/// Notes Anki doesn't report are absent from the map.
///
/// # Errors
///
/// Returns an error if the call fails.
pub async fn fetch_card_ids<S: CardStore>(
    store: &S,
    note_ids: &[u64],
) -> Result<HashMap<u64, Vec<u64>>> {
    if note_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let result = store.invoke(&notes_info(note_ids)).await?;
    let entries = result.as_array().cloned().unwrap_or_default();

    let mut cards = HashMap::new();
    for entry in entries {
        // Deleted notes come back as empty objects.
        match serde_json::from_value::<NoteInfo>(entry) {
            Ok(info) => {
                cards.insert(info.note_id, info.cards);
            }
            Err(e) => warn!(error = %e, "Skipping malformed notesInfo entry"),
        }
    }
    Ok(cards)
}
