//! Synchronization with Anki.
//!
//! - **Hashing**: SHA256 of a document's text, compared against the state
//!   file to skip unchanged documents
//! - **Batching**: every create, update, delete, deck move and media upload
//!   of a run goes out in one `multi` request
//! - **Manager**: permission check, discovery, scan, batch, write-back
//!
//! # Example
//!
//! ```ignore
//! use mdanki::anki::AnkiClient;
//! use mdanki::sync::SyncManager;
//!
//! let client = AnkiClient::new("http://127.0.0.1:8765")?;
//! let mut manager = SyncManager::new(&client, &vault, &mut state);
//! let report = manager.run(Path::new("notes"), false).await?;
//! ```

mod batch;
mod file;
mod hash;
mod manager;
mod types;

pub use batch::{Batch, BatchOutcome, MediaUpload, SectionKind};
pub use file::atomic_write;
pub use hash::{content_hash, has_changed};
pub use manager::SyncManager;
pub use types::{PendingOps, SyncReport};
