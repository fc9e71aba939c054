//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// mdanki - Sync flashcards written in markdown notes with Anki
#[derive(Parser, Debug)]
#[command(name = "mdanki", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault root (default: current directory)
    #[arg(long, global = true, env = "MDANKI_VAULT")]
    pub vault: Option<PathBuf>,

    /// State file (default: <vault>/.mdanki/state.json)
    #[arg(long, global = true, env = "MDANKI_STATE")]
    pub state: Option<PathBuf>,

    /// AnkiConnect endpoint (default: http://127.0.0.1:8765)
    #[arg(long, global = true, env = "MDANKI_ANKI_URL")]
    pub anki_url: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the state file with default settings and fetch note types
    Init {
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Synchronize a file or folder with Anki
    Sync {
        /// File or folder inside the vault (default: scan directory or vault root)
        path: Option<PathBuf>,

        /// Scan and report without changing Anki, documents or state
        #[arg(long)]
        dry_run: bool,
    },

    /// Refresh note types and field names from Anki
    Models,

    /// Show note types, cached documents, media and last sync
    Status,

    /// Remove identifier markers from a document
    DeleteIds {
        /// Markdown file inside the vault
        file: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
