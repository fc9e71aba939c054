//! Status command implementation.

use super::Locations;
use crate::config::load_state;
use crate::error::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct StatusOutput {
    vault: PathBuf,
    state: PathBuf,
    note_types: Vec<NoteTypeInfo>,
    documents_cached: usize,
    media_uploaded: usize,
    ignore_globs: Vec<String>,
    last_sync: Option<String>,
}

#[derive(Serialize)]
struct NoteTypeInfo {
    name: String,
    fields: usize,
    /// Set when the note type has a custom pattern.
    pattern: bool,
}

/// Execute the status command.
///
/// # Errors
///
/// Returns an error if the state is missing or unreadable.
pub fn execute(locations: &Locations<'_>, json: bool) -> Result<()> {
    let (vault, state_path) = locations.open_vault()?;
    let state = load_state(&state_path)?;

    let note_types: Vec<NoteTypeInfo> = state
        .fields_by_note_type
        .iter()
        .map(|(name, fields)| NoteTypeInfo {
            name: name.clone(),
            fields: fields.len(),
            pattern: !state.note_type(name).custom_regexp.trim().is_empty(),
        })
        .collect();

    let output = StatusOutput {
        vault: vault.root().to_path_buf(),
        state: state_path,
        note_types,
        documents_cached: state.file_hash_map.len(),
        media_uploaded: state.added_media_list.len(),
        ignore_globs: state.ignore_globs.clone(),
        last_sync: state.last_sync.clone(),
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{} {}", "Vault:".bold(), output.vault.display());
    println!("{} {}", "State:".bold(), output.state.display());
    println!(
        "{} {}",
        "Last sync:".bold(),
        output.last_sync.as_deref().unwrap_or("never")
    );
    println!();
    println!("Note types: {}", output.note_types.len());
    for info in &output.note_types {
        let marker = if info.pattern { " (pattern)" } else { "" };
        println!("  {} [{} fields]{marker}", info.name.cyan(), info.fields);
    }
    println!();
    println!("Documents cached: {}", output.documents_cached);
    println!("Media uploaded:   {}", output.media_uploaded);
    if !output.ignore_globs.is_empty() {
        println!("Ignored:          {}", output.ignore_globs.join(", "));
    }

    Ok(())
}
