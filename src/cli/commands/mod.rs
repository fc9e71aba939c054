//! Command implementations.

pub mod completions;
pub mod delete_ids;
pub mod init;
pub mod models;
pub mod status;
pub mod sync;
pub mod version;

use crate::anki::AnkiClient;
use crate::config::{resolve_anki_url, resolve_state_path, resolve_vault_root};
use crate::error::{Error, Result};
use crate::vault::Vault;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

/// Where the vault, the state file and Anki are.
#[derive(Debug, Clone, Copy, Default)]
pub struct Locations<'a> {
    pub vault: Option<&'a Path>,
    pub state: Option<&'a Path>,
    pub anki_url: Option<&'a str>,
}

impl Locations<'_> {
    /// Open the vault and resolve the state file inside it.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if the vault root doesn't exist.
    pub fn open_vault(&self) -> Result<(Vault, PathBuf)> {
        let root = resolve_vault_root(self.vault)?;
        let vault = Vault::open(root)?;
        let state_path = resolve_state_path(self.state, vault.root());
        Ok((vault, state_path))
    }

    /// HTTP client for AnkiConnect.
    ///
    /// # Errors
    ///
    /// Returns an error if the client can't be built.
    pub fn client(&self) -> Result<AnkiClient> {
        AnkiClient::new(resolve_anki_url(self.anki_url))
    }
}

/// Single-threaded runtime for the AnkiConnect calls of one command.
pub(crate) fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}
