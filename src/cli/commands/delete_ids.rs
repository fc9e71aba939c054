//! Remove identifier markers from a document.
//!
//! The document's cached hash no longer matches afterwards, so the next sync
//! scans it and creates its notes again as new ones.

use super::Locations;
use crate::error::{Error, Result};
use crate::scan::{count_markers, strip_markers};
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
struct DeleteIdsOutput<'a> {
    path: &'a str,
    removed: usize,
}

/// Execute the delete-ids command.
///
/// # Errors
///
/// Returns an error if `file` is not a markdown file in the vault or can't
/// be rewritten.
pub fn execute(locations: &Locations<'_>, file: &Path, json: bool) -> Result<()> {
    let (vault, _) = locations.open_vault()?;

    let documents = vault.list_documents(file)?;
    let [path] = documents.as_slice() else {
        return Err(Error::InvalidArgument(format!(
            "Expected a single markdown file: {}",
            file.display()
        )));
    };

    let text = vault.read(path)?;
    let removed = count_markers(&text);
    if removed > 0 {
        vault.write(path, &strip_markers(&text))?;
        info!(path = %path, removed, "Removed identifiers");
    }

    if json {
        let output = DeleteIdsOutput { path, removed };
        println!("{}", serde_json::to_string(&output)?);
    } else if removed == 0 {
        println!("No identifiers in {path}");
    } else {
        println!("Removed {removed} identifiers from {path}");
    }

    Ok(())
}
