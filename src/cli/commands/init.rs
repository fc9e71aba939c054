//! Initialize a vault.
//!
//! Writes `<vault>/.mdanki/state.json` with default settings. If Anki is
//! running, note types and their fields are fetched right away; otherwise
//! the state is written without them and `mdanki sync` fetches them later.

use super::{Locations, runtime};
use crate::anki::{check_permission, fetch_note_types};
use crate::config::{State, save_state};
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

#[derive(Serialize)]
struct InitOutput {
    vault: PathBuf,
    state: PathBuf,
    /// `None` when Anki couldn't be reached.
    note_types: Option<usize>,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if a state file exists and `force` is not
/// set, or an error if the state file can't be written.
pub fn execute(locations: &Locations<'_>, force: bool, json: bool) -> Result<()> {
    let (vault, state_path) = locations.open_vault()?;

    if state_path.exists() && !force {
        return Err(Error::AlreadyInitialized { path: state_path });
    }

    let mut state = State::default();
    let client = locations.client()?;
    let fetched = runtime()?.block_on(async {
        check_permission(&client).await?;
        fetch_note_types(&client).await
    });
    let note_types = match fetched {
        Ok(note_types) => {
            let count = note_types.len();
            state.apply_note_types(note_types);
            Some(count)
        }
        Err(e) => {
            warn!(error = %e, "Could not fetch note types, run `mdanki models` once Anki is up");
            None
        }
    };

    save_state(&state_path, &state)?;

    if json {
        let output = InitOutput {
            vault: vault.root().to_path_buf(),
            state: state_path,
            note_types,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized mdanki in {}", vault.root().display());
        println!("  State: {}", state_path.display());
        match note_types {
            Some(count) => println!("  Note types: {count}"),
            None => println!("  Note types: not fetched (Anki unreachable)"),
        }
    }

    Ok(())
}
