//! One multiplexed request per sync run.
//!
//! The request is a `multi` of sections, in a fixed order:
//!
//! 1. `createDeck` for the decks of new notes
//! 2. `addNote` for new notes
//! 3. `updateNote` for edited notes
//! 4. `deleteNotes` for delete lines
//! 5. `changeDeck` for edited notes
//! 6. `storeMediaFile` for new media
//!
//! Sections 1 to 5 hold one entry per document that has work for it, so the
//! response is read back by position. Empty sections are left out. Nothing
//! in a response carries an identifier to correlate with the request; the
//! position recorded here is the only link.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::anki::{
    add_note, change_deck, create_deck, delete_notes, multi, parse_envelope, store_media_file,
    update_note, Request,
};
use crate::error::{Error, Result};
use crate::scan::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    CreateDecks,
    AddNotes,
    UpdateNotes,
    DeleteNotes,
    ChangeDecks,
    StoreMedia,
}

/// A media file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    /// The link as written in the document, recorded once uploaded.
    pub link: String,
    /// Name Anki stores the file under.
    pub file_name: String,
    /// Absolute path Anki reads the file from.
    pub path: String,
}

#[derive(Debug, Clone)]
struct Section {
    kind: SectionKind,
    /// Document index (or media index) behind each entry.
    owners: Vec<usize>,
    request: Request,
}

/// What the response said.
#[derive(Debug, Default, Clone)]
pub struct BatchOutcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub moved: usize,
    /// Links of media Anki accepted.
    pub media: Vec<String>,
    /// Per-operation errors, already logged.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Batch {
    sections: Vec<Section>,
    media: Vec<MediaUpload>,
}

impl Batch {
    /// Build the batch for a set of scanned documents.
    ///
    /// `cards` maps edited note identifiers to their card identifiers; notes
    /// missing from it are not moved.
    #[must_use]
    pub fn build(
        documents: &[Document],
        cards: &HashMap<u64, Vec<u64>>,
        media: Vec<MediaUpload>,
    ) -> Self {
        let mut batch = Self {
            sections: Vec::new(),
            media,
        };

        batch.push_per_document(SectionKind::CreateDecks, documents, |doc| {
            let mut decks: Vec<&str> = Vec::new();
            for note in &doc.notes_to_add {
                if !decks.contains(&note.deck.as_str()) {
                    decks.push(&note.deck);
                }
            }
            (!decks.is_empty()).then(|| multi(decks.into_iter().map(create_deck).collect()))
        });

        batch.push_per_document(SectionKind::AddNotes, documents, |doc| {
            (!doc.notes_to_add.is_empty()).then(|| {
                multi(
                    doc.notes_to_add
                        .iter()
                        .map(|note| add_note(&note.to_anki_note()))
                        .collect(),
                )
            })
        });

        batch.push_per_document(SectionKind::UpdateNotes, documents, |doc| {
            let updates: Vec<Request> = doc
                .notes_to_edit
                .iter()
                .filter_map(|note| Some(update_note(note.identifier?, &note.fields, &note.tags)))
                .collect();
            (!updates.is_empty()).then(|| multi(updates))
        });

        batch.push_per_document(SectionKind::DeleteNotes, documents, |doc| {
            (!doc.notes_to_delete.is_empty()).then(|| delete_notes(&doc.notes_to_delete))
        });

        batch.push_per_document(SectionKind::ChangeDecks, documents, |doc| {
            let moves: Vec<Request> = doc
                .notes_to_edit
                .iter()
                .filter_map(|note| {
                    let card_ids = cards.get(&note.identifier?)?;
                    (!card_ids.is_empty()).then(|| change_deck(card_ids, &note.deck))
                })
                .collect();
            (!moves.is_empty()).then(|| multi(moves))
        });

        if !batch.media.is_empty() {
            let request = multi(
                batch
                    .media
                    .iter()
                    .map(|m| store_media_file(&m.file_name, &m.path))
                    .collect(),
            );
            batch.sections.push(Section {
                kind: SectionKind::StoreMedia,
                owners: (0..batch.media.len()).collect(),
                request,
            });
        }

        batch
    }

    fn push_per_document<F>(&mut self, kind: SectionKind, documents: &[Document], build: F)
    where
        F: Fn(&Document) -> Option<Request>,
    {
        let mut owners = Vec::new();
        let mut requests = Vec::new();
        for (i, doc) in documents.iter().enumerate() {
            if let Some(request) = build(doc) {
                owners.push(i);
                requests.push(request);
            }
        }
        if !requests.is_empty() {
            self.sections.push(Section {
                kind,
                owners,
                request: multi(requests),
            });
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Section kinds in request order.
    #[must_use]
    pub fn kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(|s| s.kind).collect()
    }

    /// The single request sent to Anki.
    #[must_use]
    pub fn request(&self) -> Request {
        multi(self.sections.iter().map(|s| s.request.clone()).collect())
    }

    /// Read the response back into the documents.
    ///
    /// `response` is the validated result of [`Batch::request`]: one
    /// envelope per section. New notes get the identifiers Anki assigned;
    /// a note whose `addNote` failed keeps none.
    pub fn apply(&self, response: &Value, documents: &mut [Document]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let envelopes = items(response);
        if envelopes.len() != self.sections.len() {
            warn!(
                expected = self.sections.len(),
                got = envelopes.len(),
                "Response section count does not match the request"
            );
        }

        for (section, envelope) in self.sections.iter().zip(envelopes) {
            let Some(result) = op_result(envelope, section.kind, &mut outcome) else {
                continue;
            };

            for (&owner, entry) in section.owners.iter().zip(items(&result)) {
                match section.kind {
                    SectionKind::StoreMedia => {
                        if op_result(entry, section.kind, &mut outcome).is_some() {
                            if let Some(upload) = self.media.get(owner) {
                                outcome.media.push(upload.link.clone());
                            }
                        }
                    }
                    SectionKind::DeleteNotes => {
                        if op_result(entry, section.kind, &mut outcome).is_some() {
                            outcome.deleted += documents
                                .get(owner)
                                .map_or(0, |doc| doc.notes_to_delete.len());
                        }
                    }
                    SectionKind::AddNotes => {
                        let Some(results) = op_result(entry, section.kind, &mut outcome) else {
                            continue;
                        };
                        let Some(doc) = documents.get_mut(owner) else {
                            continue;
                        };
                        for (note, op) in doc.notes_to_add.iter_mut().zip(items(&results)) {
                            match op_result(op, section.kind, &mut outcome).and_then(|v| v.as_u64()) {
                                Some(id) => {
                                    note.identifier = Some(id);
                                    outcome.created += 1;
                                }
                                None => debug!(note_type = %note.note_type, "Note got no identifier"),
                            }
                        }
                    }
                    SectionKind::CreateDecks | SectionKind::UpdateNotes | SectionKind::ChangeDecks => {
                        let Some(results) = op_result(entry, section.kind, &mut outcome) else {
                            continue;
                        };
                        let succeeded = items(&results)
                            .iter()
                            .filter(|op| op_result(op, section.kind, &mut outcome).is_some())
                            .count();
                        match section.kind {
                            SectionKind::UpdateNotes => outcome.updated += succeeded,
                            SectionKind::ChangeDecks => outcome.moved += succeeded,
                            _ => {}
                        }
                    }
                }
            }
        }

        outcome
    }
}

fn items(value: &Value) -> &[Value] {
    value.as_array().map_or(&[], Vec::as_slice)
}

/// Read an envelope, falling back to its raw `result` on a shape violation.
fn read_envelope(envelope: &Value) -> Result<Value> {
    match parse_envelope(envelope) {
        Err(Error::Protocol(message)) => {
            warn!(%message, "Malformed response envelope, reading result anyway");
            envelope
                .get("result")
                .cloned()
                .ok_or(Error::Protocol(message))
        }
        other => other,
    }
}

/// Result of one operation, or `None` after logging its error.
fn op_result(envelope: &Value, kind: SectionKind, outcome: &mut BatchOutcome) -> Option<Value> {
    match read_envelope(envelope) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(section = ?kind, error = %e, "Anki operation failed");
            outcome.errors.push(e.to_string());
            None
        }
    }
}
