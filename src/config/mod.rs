//! Configuration management.
//!
//! This module resolves the vault root and the state file location, and
//! loads/saves the persisted [`State`].
//!
//! # Layout
//!
//! - **Vault**: the directory of markdown documents (`--vault`, `MDANKI_VAULT`, or CWD)
//! - **State**: `<vault>/.mdanki/state.json` unless overridden by `--state` / `MDANKI_STATE`
//!
//! The state file holds both settings and sync bookkeeping, so a vault can be
//! moved between machines and keep its hash cache.

mod settings;

pub use settings::{
    Defaults, NoteTypeSettings, State, SyntaxTokens, DEFAULT_IGNORED_FILE_GLOBS,
};

use crate::error::{Error, Result};
use crate::sync::atomic_write;

use std::fs;
use std::path::{Path, PathBuf};

/// Directory inside the vault that holds mdanki's own files.
pub const STATE_DIR: &str = ".mdanki";

/// Default AnkiConnect endpoint.
pub const DEFAULT_ANKI_URL: &str = "http://127.0.0.1:8765";

/// Resolve the vault root directory.
///
/// Priority:
/// 1. Explicit path (`--vault` / `MDANKI_VAULT`, both handled by clap)
/// 2. Current working directory
///
/// # Errors
///
/// Returns an error if the directory does not exist or the CWD is unreadable.
pub fn resolve_vault_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|e| Error::Other(format!("Failed to get current directory: {e}")))?,
    };

    if !root.is_dir() {
        return Err(Error::PathNotFound { path: root });
    }

    Ok(root)
}

/// Resolve the state file path.
///
/// Priority:
/// 1. Explicit path (`--state` / `MDANKI_STATE`)
/// 2. `<vault>/.mdanki/state.json`
#[must_use]
pub fn resolve_state_path(explicit: Option<&Path>, vault_root: &Path) -> PathBuf {
    explicit.map_or_else(
        || vault_root.join(STATE_DIR).join("state.json"),
        Path::to_path_buf,
    )
}

/// Resolve the AnkiConnect URL.
#[must_use]
pub fn resolve_anki_url(explicit: Option<&str>) -> String {
    explicit
        .filter(|url| !url.trim().is_empty())
        .map_or_else(|| DEFAULT_ANKI_URL.to_string(), ToString::to_string)
}

/// Load the state file.
///
/// # Errors
///
/// Returns `NotInitialized` if the file is missing, or a config error if it
/// cannot be read or parsed.
pub fn load_state(path: &Path) -> Result<State> {
    if !path.exists() {
        return Err(Error::NotInitialized {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read state file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse state file: {e}")))
}

/// Save the state file atomically.
///
/// # Errors
///
/// Returns an error if the state cannot be serialized or written.
pub fn save_state(path: &Path, state: &State) -> Result<()> {
    let content = serde_json::to_string_pretty(state)
        .map_err(|e| Error::Config(format!("Failed to serialize state: {e}")))?;

    atomic_write(path, &content)
        .map_err(|e| Error::Config(format!("Failed to write state file: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_state_path_defaults_into_vault() {
        let path = resolve_state_path(None, Path::new("/notes"));
        assert_eq!(path, PathBuf::from("/notes/.mdanki/state.json"));
    }

    #[test]
    fn test_resolve_state_path_with_explicit() {
        let explicit = PathBuf::from("/custom/state.json");
        assert_eq!(resolve_state_path(Some(&explicit), Path::new("/notes")), explicit);
    }

    #[test]
    fn test_resolve_anki_url() {
        assert_eq!(resolve_anki_url(None), DEFAULT_ANKI_URL);
        assert_eq!(resolve_anki_url(Some("  ")), DEFAULT_ANKI_URL);
        assert_eq!(resolve_anki_url(Some("http://anki:8765")), "http://anki:8765");
    }

    #[test]
    fn test_resolve_vault_root_missing_dir() {
        let result = resolve_vault_root(Some(Path::new("/definitely/not/here")));
        assert!(matches!(result, Err(Error::PathNotFound { .. })));
    }

    #[test]
    fn test_load_missing_state_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        let result = load_state(&dir.path().join("state.json"));
        assert!(matches!(result, Err(Error::NotInitialized { .. })));
    }

    #[test]
    fn test_save_then_load_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(STATE_DIR).join("state.json");

        let mut state = State::default();
        state
            .file_hash_map
            .insert("a.md".to_string(), "abc".to_string());
        save_state(&path, &state).unwrap();

        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_load_corrupt_state_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_state(&path), Err(Error::Config(_))));
    }
}
