//! Report types for a sync run.

use serde::Serialize;

use crate::scan::NoteFailure;

/// Operations found by the scan, before anything is sent.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PendingOps {
    /// New notes without an identifier.
    pub to_add: usize,
    /// Notes whose identifier Anki knows.
    pub to_edit: usize,
    /// Identifiers on delete lines.
    pub to_delete: usize,
    /// Media files not uploaded yet.
    pub media: usize,
}

impl PendingOps {
    #[must_use]
    pub fn total(&self) -> usize {
        self.to_add + self.to_edit + self.to_delete + self.media
    }
}

/// Outcome of one sync run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    /// Nothing was sent, written or saved.
    pub dry_run: bool,
    /// Documents parsed this run.
    pub documents_scanned: usize,
    /// Documents whose hash matched the cache.
    pub documents_skipped: usize,
    /// Documents matching an ignore glob.
    pub documents_ignored: usize,
    /// Documents whose text changed and was written back.
    pub documents_rewritten: usize,
    /// Documents whose hash was not recorded and will be rescanned.
    pub documents_retried: usize,
    pub pending: PendingOps,
    /// Notes that received an identifier.
    pub notes_created: usize,
    pub notes_updated: usize,
    pub notes_deleted: usize,
    /// Notes moved to their current deck.
    pub notes_moved: usize,
    /// Identifiers Anki doesn't know about.
    pub notes_orphaned: usize,
    /// Cloze notes without cloze deletions.
    pub notes_rejected: usize,
    pub media_uploaded: usize,
    /// Notes that couldn't be parsed.
    pub failures: Vec<NoteFailure>,
    /// Per-operation errors reported by Anki.
    pub remote_errors: Vec<String>,
}

impl SyncReport {
    /// Total number of notes changed in Anki.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.notes_created + self.notes_updated + self.notes_deleted
    }

    /// Returns true if the run found nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents_scanned == 0 || (self.pending.total() == 0 && self.failures.is_empty())
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty() || !self.remote_errors.is_empty()
    }
}
