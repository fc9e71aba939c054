//! Error types for mdanki.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=state, 4=validation, 6=anki, etc.)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mdanki operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // State (exit 2)
    NotInitialized,
    AlreadyInitialized,

    // Validation (exit 4)
    UnknownNoteType,
    InvalidPattern,
    InvalidArgument,
    PathNotFound,

    // Anki (exit 6)
    AnkiUnreachable,
    PermissionDenied,
    AnkiError,
    ProtocolError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::UnknownNoteType => "UNKNOWN_NOTE_TYPE",
            Self::InvalidPattern => "INVALID_PATTERN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::PathNotFound => "PATH_NOT_FOUND",
            Self::AnkiUnreachable => "ANKI_UNREACHABLE",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::AnkiError => "ANKI_ERROR",
            Self::ProtocolError => "PROTOCOL_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized => 2,
            Self::UnknownNoteType
            | Self::InvalidPattern
            | Self::InvalidArgument
            | Self::PathNotFound => 4,
            Self::AnkiUnreachable
            | Self::PermissionDenied
            | Self::AnkiError
            | Self::ProtocolError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether running the same command again may succeed without
    /// changing any input (Anki was closed, permission prompt dismissed).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::AnkiUnreachable | Self::PermissionDenied)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in mdanki operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: no state file at {path}")]
    NotInitialized { path: PathBuf },

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Did not recognise note type {note_type} in file {path}")]
    UnknownNoteType { note_type: String, path: String },

    #[error("Invalid pattern for note type {note_type}: {message}")]
    InvalidPattern { note_type: String, message: String },

    #[error("Path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("Couldn't connect to Anki: {0}")]
    AnkiUnreachable(String),

    #[error("Anki refused the connection (permission not granted)")]
    PermissionDenied,

    #[error("Anki returned an error: {0}")]
    Anki(String),

    #[error("Unexpected AnkiConnect response: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::UnknownNoteType { .. } => ErrorCode::UnknownNoteType,
            Self::InvalidPattern { .. } | Self::Regex(_) => ErrorCode::InvalidPattern,
            Self::PathNotFound { .. } => ErrorCode::PathNotFound,
            Self::AnkiUnreachable(_) | Self::Http(_) => ErrorCode::AnkiUnreachable,
            Self::PermissionDenied => ErrorCode::PermissionDenied,
            Self::Anki(_) => ErrorCode::AnkiError,
            Self::Protocol(_) => ErrorCode::ProtocolError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized { .. } => {
                Some("Run `mdanki init` inside your vault to create default settings".to_string())
            }

            Self::AlreadyInitialized { path } => Some(format!(
                "State already exists at {}. Use `--force` to reset it.",
                path.display()
            )),

            Self::UnknownNoteType { note_type, .. } => Some(format!(
                "'{note_type}' is not a known note type. Run `mdanki models` after \
                 creating it in Anki, or fix the spelling in the note."
            )),

            Self::InvalidPattern { .. } | Self::Regex(_) => Some(
                "Custom patterns use Rust regex syntax: look-around and backreferences \
                 are not supported."
                    .to_string(),
            ),

            Self::AnkiUnreachable(_) | Self::Http(_) => Some(
                "Make sure Anki is running with the AnkiConnect add-on installed, \
                 or point --anki-url at it."
                    .to_string(),
            ),

            Self::PermissionDenied => {
                Some("Accept the permission prompt shown by AnkiConnect and retry.".to_string())
            }

            Self::PathNotFound { .. } => {
                Some("Paths are resolved relative to the vault root (--vault).".to_string())
            }

            Self::Anki(_)
            | Self::Protocol(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
