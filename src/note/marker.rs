//! Identifier markers.
//!
//! A marker records the Anki note id next to the note it belongs to:
//!
//! ```text
//! <!--ID:1714000000123-->
//! %%ID:1714000000123%%
//! <!--ID:1714000000123 [[Rust/Ownership]] #borrowing-->
//! ```
//!
//! The optional wiki link overrides the deck, the optional tags are added
//! to the note.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Body of a marker with its capture groups, without leading newlines.
pub const MARKER_PATTERN: &str = r"(?:<!--|%%)ID:\s?(?P<mdanki_id>\d{13})\s?(?:\[\[(?P<mdanki_link>[^|#\]]*)[^\]]*\]\]\s*)?(?P<mdanki_idtags>(?:#[^\s#]+\s*)*)(?:-->|%%)";

/// Marker search pattern, leading newlines included.
pub static ID_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\n*{MARKER_PATTERN}")).expect("Invalid id marker regex")
});

/// Marker with its optional ride-alongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMarker {
    pub id: u64,
    pub link: Option<String>,
    pub tags: Vec<String>,
}

impl IdMarker {
    /// Read a marker from captures of any pattern embedding [`MARKER_PATTERN`].
    ///
    /// Returns `None` when the marker groups didn't participate.
    #[must_use]
    pub fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let id = caps.name("mdanki_id")?.as_str().parse().ok()?;
        let link = caps
            .name("mdanki_link")
            .map(|m| m.as_str().trim().to_string())
            .filter(|l| !l.is_empty());
        let tags = caps
            .name("mdanki_idtags")
            .map(|m| {
                m.as_str()
                    .split_whitespace()
                    .map(|t| t.trim_start_matches('#').to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Some(Self { id, link, tags })
    }

    /// First marker in `text`.
    #[must_use]
    pub fn find(text: &str) -> Option<(Self, std::ops::Range<usize>)> {
        let caps = ID_MARKER.captures(text)?;
        let range = caps.get(0)?.range();
        Some((Self::from_captures(&caps)?, range))
    }
}

/// Render a marker in the configured comment style.
#[must_use]
pub fn marker_text(id: u64, id_comments: bool) -> String {
    if id_comments {
        format!("<!--ID:{id}-->")
    } else {
        format!("%%ID:{id}%%")
    }
}
