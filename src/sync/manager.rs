//! Synchronization manager.
//!
//! A run has two round-trips after the permission check: discovery (note
//! types, known identifiers, card ids) and one batched request that applies
//! every change. Documents are only rewritten after the batch answered, and
//! hashes are only recorded for documents whose notes and media all made it.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use crate::anki::{check_permission, fetch_card_ids, fetch_note_ids, fetch_note_types, CardStore};
use crate::config::State;
use crate::error::Result;
use crate::format::{is_external, media_file_name};
use crate::scan::{compile_patterns, Document, ScanContext, SyntaxPatterns};
use crate::sync::batch::{Batch, MediaUpload};
use crate::sync::hash::{content_hash, has_changed};
use crate::sync::types::SyncReport;
use crate::vault::{IgnoreGlobs, LinkResolver, Vault};

/// Drives one sync run against a card store.
pub struct SyncManager<'a, S: CardStore> {
    store: &'a S,
    vault: &'a Vault,
    state: &'a mut State,
}

impl<'a, S: CardStore> SyncManager<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, vault: &'a Vault, state: &'a mut State) -> Self {
        Self {
            store,
            vault,
            state,
        }
    }

    /// Refresh note types and field names from Anki.
    ///
    /// # Errors
    ///
    /// Returns an error if Anki can't be reached.
    pub async fn refresh_note_types(&mut self) -> Result<usize> {
        let note_types = fetch_note_types(self.store).await?;
        let count = note_types.len();
        self.state.apply_note_types(note_types);
        info!(count, "Refreshed note types");
        Ok(count)
    }

    /// Synchronize every document under `scope`.
    ///
    /// With `dry_run`, the run stops after scanning: nothing is sent,
    /// written or recorded. The caller persists the state afterwards.
    ///
    /// # Errors
    ///
    /// Fails before touching any document if Anki is unreachable or refuses
    /// permission, or if the syntax tokens or ignore globs are invalid.
    /// Fails after the batch was sent if a document can't be written.
    pub async fn run(&mut self, scope: &Path, dry_run: bool) -> Result<SyncReport> {
        let mut report = SyncReport {
            dry_run,
            ..SyncReport::default()
        };

        check_permission(self.store).await?;
        if self.state.fields_by_note_type.is_empty() {
            self.refresh_note_types().await?;
        }
        let known_ids = fetch_note_ids(self.store).await?;

        let syntax = SyntaxPatterns::new(&self.state.syntax_tokens)?;
        let mut documents = self.discover(scope, &syntax, &known_ids, &mut report)?;

        let uploads = self.media_uploads(&documents);
        for doc in &documents {
            report.pending.to_add += doc.notes_to_add.len();
            report.pending.to_edit += doc.notes_to_edit.len();
            report.pending.to_delete += doc.notes_to_delete.len();
            report.notes_orphaned += doc.orphaned.len();
            report.notes_rejected += doc.rejected;
            report.failures.extend(doc.failures.iter().cloned());
        }
        report.pending.media = uploads.len();

        if dry_run {
            info!(pending = report.pending.total(), "Dry run, nothing sent");
            return Ok(report);
        }

        let edited: Vec<u64> = documents
            .iter()
            .flat_map(|doc| doc.notes_to_edit.iter().filter_map(|n| n.identifier))
            .collect();
        let cards = match fetch_card_ids(self.store, &edited).await {
            Ok(cards) => cards,
            Err(e) => {
                warn!(error = %e, "Could not look up cards, skipping deck moves");
                HashMap::new()
            }
        };

        let mut failed_media: HashSet<String> = uploads.iter().map(|u| u.link.clone()).collect();
        let batch = Batch::build(&documents, &cards, uploads);
        if !batch.is_empty() {
            let response = self.store.invoke(&batch.request()).await?;
            let outcome = batch.apply(&response, &mut documents);
            failed_media.retain(|link| !outcome.media.contains(link));
            report.notes_created = outcome.created;
            report.notes_updated = outcome.updated;
            report.notes_deleted = outcome.deleted;
            report.notes_moved = outcome.moved;
            report.media_uploaded = outcome.media.len();
            report.remote_errors = outcome.errors;
            for link in outcome.media {
                if !self.state.added_media_list.contains(&link) {
                    self.state.added_media_list.push(link);
                }
            }
        }

        let id_comments = self.state.defaults.id_comments;
        for doc in &mut documents {
            doc.finalize(&syntax, id_comments);
            if doc.is_modified() {
                self.vault.write(doc.path(), doc.text())?;
                report.documents_rewritten += 1;
            }

            let media_pending = doc.media().iter().any(|link| failed_media.contains(link));
            if doc.failures.is_empty() && doc.unassigned() == 0 && !media_pending {
                self.state
                    .file_hash_map
                    .insert(doc.path().to_string(), doc.content_hash());
            } else {
                warn!(path = %doc.path(), "Document will be rescanned next run");
                self.state.file_hash_map.remove(doc.path());
                report.documents_retried += 1;
            }
        }

        self.state.last_sync = Some(Utc::now().to_rfc3339());
        info!(
            scanned = report.documents_scanned,
            created = report.notes_created,
            updated = report.notes_updated,
            deleted = report.notes_deleted,
            "Sync complete"
        );
        Ok(report)
    }

    /// List, filter and scan the documents under `scope`.
    fn discover(
        &self,
        scope: &Path,
        syntax: &SyntaxPatterns,
        known_ids: &HashSet<u64>,
        report: &mut SyncReport,
    ) -> Result<Vec<Document>> {
        let globs = IgnoreGlobs::new(&self.state.ignore_globs)?;
        let patterns = compile_patterns(&self.state);
        let ctx = ScanContext {
            state: &self.state,
            syntax,
            patterns: &patterns,
            known_ids,
            vault_name: self.vault.name(),
            links: self.vault,
        };

        let mut documents = Vec::new();
        for path in self.vault.list_documents(scope)? {
            if globs.is_ignored(&path) {
                report.documents_ignored += 1;
                continue;
            }

            let text = self.vault.read(&path)?;
            let hash = content_hash(&text);
            if !has_changed(&hash, self.state.file_hash_map.get(&path).map(String::as_str)) {
                report.documents_skipped += 1;
                continue;
            }

            let mut doc = Document::new(path, text);
            doc.scan(&ctx);
            report.documents_scanned += 1;
            documents.push(doc);
        }

        Ok(documents)
    }

    /// Media referenced by the documents that still has to be uploaded.
    fn media_uploads(&self, documents: &[Document]) -> Vec<MediaUpload> {
        let mut seen = HashSet::new();
        let mut uploads = Vec::new();

        for doc in documents {
            for link in doc.media() {
                if is_external(link)
                    || self.state.added_media_list.contains(link)
                    || !seen.insert(link.clone())
                {
                    continue;
                }
                let Some(relative) = self.vault.resolve_link(link, doc.path()) else {
                    warn!(link = %link, path = %doc.path(), "Media file not found in vault");
                    continue;
                };
                uploads.push(MediaUpload {
                    link: link.clone(),
                    file_name: media_file_name(link).to_string(),
                    path: self.vault.absolute_path(&relative).to_string_lossy().into_owned(),
                });
            }
        }

        uploads
    }
}
