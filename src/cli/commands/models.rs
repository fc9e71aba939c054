//! Refresh note types from Anki.

use super::{Locations, runtime};
use crate::anki::check_permission;
use crate::config::{load_state, save_state};
use crate::error::Result;
use crate::sync::SyncManager;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct ModelsOutput<'a> {
    count: usize,
    fields_by_note_type: &'a BTreeMap<String, Vec<String>>,
}

/// Execute the models command.
///
/// # Errors
///
/// Returns an error if the state is missing, Anki can't be reached, or the
/// state can't be saved.
pub fn execute(locations: &Locations<'_>, json: bool) -> Result<()> {
    let (vault, state_path) = locations.open_vault()?;
    let mut state = load_state(&state_path)?;
    let client = locations.client()?;

    let count = runtime()?.block_on(async {
        check_permission(&client).await?;
        SyncManager::new(&client, &vault, &mut state)
            .refresh_note_types()
            .await
    })?;
    save_state(&state_path, &state)?;

    if json {
        let output = ModelsOutput {
            count,
            fields_by_note_type: &state.fields_by_note_type,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{} note types", count.to_string().bold());
    for (note_type, fields) in &state.fields_by_note_type {
        println!("  {}: {}", note_type.cyan(), fields.join(", "));
    }
    Ok(())
}
