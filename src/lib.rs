//! mdanki - Sync flashcards written in markdown notes with Anki
//!
//! This crate provides the core functionality for the `mdanki` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - State file location and persisted settings
//! - [`vault`] - Markdown documents on disk, ignore globs, link resolution
//! - [`scan`] - Finding notes in a document and rewriting identifiers
//! - [`note`] - Note records and the block, inline and pattern parsers
//! - [`format`] - Markdown to Anki HTML, cloze conversion, media detection
//! - [`anki`] - AnkiConnect requests and the HTTP client
//! - [`sync`] - Hash cache, batching and the sync manager
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod anki;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod note;
pub mod scan;
pub mod sync;
pub mod vault;

pub use error::{Error, Result};
