//! Sync command implementation.
//!
//! Scans the given file or folder (default: the configured scan directory,
//! or the whole vault), sends one batch to Anki, writes identifiers back into
//! the documents and saves the state. With `--dry-run` the state is left
//! untouched.

use super::{Locations, runtime};
use crate::config::{load_state, save_state};
use crate::error::Result;
use crate::sync::{SyncManager, SyncReport};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Execute the sync command.
///
/// # Errors
///
/// Returns an error if the state is missing, Anki can't be reached, the
/// path is not in the vault, or a document or the state can't be written.
pub fn execute(
    locations: &Locations<'_>,
    path: Option<&PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let (vault, state_path) = locations.open_vault()?;
    let mut state = load_state(&state_path)?;
    let client = locations.client()?;

    let scope = match path {
        Some(path) => path.clone(),
        None if !state.defaults.scan_directory.is_empty() => {
            PathBuf::from(&state.defaults.scan_directory)
        }
        None => vault.root().to_path_buf(),
    };

    let report = runtime()?.block_on(async {
        SyncManager::new(&client, &vault, &mut state)
            .run(&scope, dry_run)
            .await
    })?;

    if !dry_run {
        save_state(&state_path, &state)?;
    }

    if json {
        let output = serde_json::json!({
            "success": true,
            "scope": scope.display().to_string(),
            "report": report,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print_report(&report, &scope);
    }

    Ok(())
}

fn print_report(report: &SyncReport, scope: &Path) {
    if report.dry_run {
        println!("{} {}", "Dry run for:".yellow().bold(), scope.display());
    } else {
        println!("{} {}", "Synced:".green().bold(), scope.display());
    }
    println!();
    println!(
        "  Documents: {} scanned, {} unchanged, {} ignored",
        report.documents_scanned, report.documents_skipped, report.documents_ignored
    );

    if report.dry_run {
        let pending = &report.pending;
        println!(
            "  Pending:   {} to add, {} to update, {} to delete, {} media",
            pending.to_add, pending.to_edit, pending.to_delete, pending.media
        );
    } else {
        println!(
            "  Notes:     {} created, {} updated, {} deleted",
            report.notes_created, report.notes_updated, report.notes_deleted
        );
        if report.media_uploaded > 0 {
            println!("  Media:     {} uploaded", report.media_uploaded);
        }
        if report.documents_rewritten > 0 {
            println!("  Rewritten: {} documents", report.documents_rewritten);
        }
    }

    if report.notes_orphaned > 0 {
        println!(
            "  {} {} identifiers not found in Anki",
            "Warning:".yellow(),
            report.notes_orphaned
        );
    }
    if report.notes_rejected > 0 {
        println!(
            "  {} {} cloze notes without cloze deletions skipped",
            "Warning:".yellow(),
            report.notes_rejected
        );
    }

    if report.has_errors() {
        println!();
        for failure in &report.failures {
            println!("  {} {}: {}", "Failed:".red(), failure.path, failure.message);
        }
        for error in &report.remote_errors {
            println!("  {} {error}", "Anki:".red());
        }
        if report.documents_retried > 0 {
            println!(
                "  {} documents will be rescanned on the next sync",
                report.documents_retried
            );
        }
    }
}
