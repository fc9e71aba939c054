//! Embedded media classification.

use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "svg", "webp", "avif"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "ogg", "flac", "3gp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogv", "mov", "mkv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Pdf,
}

impl MediaKind {
    /// Classify a link target by extension. `None` means unsupported.
    #[must_use]
    pub fn from_link(link: &str) -> Option<Self> {
        let path = link.split('#').next().unwrap_or(link);
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Audio)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else if ext == "pdf" {
            Some(Self::Pdf)
        } else {
            None
        }
    }
}

/// Final path component, which is the name the media gets inside Anki.
#[must_use]
pub fn media_file_name(link: &str) -> &str {
    link.rsplit(['/', '\\']).next().unwrap_or(link)
}

/// Page requested by a `file.pdf#page=N` link, defaulting to 1.
#[must_use]
pub fn pdf_page(link: &str) -> u32 {
    link.split_once("#page=")
        .and_then(|(_, page)| {
            let digits: String = page.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .unwrap_or(1)
}

/// Whether a link points outside the vault.
#[must_use]
pub fn is_external(link: &str) -> bool {
    link.contains("://") || link.starts_with("mailto:") || link.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(MediaKind::from_link("a/b.PNG"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_link("song.mp3"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_link("clip.mp4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_link("book.pdf#page=3"), Some(MediaKind::Pdf));
        assert_eq!(MediaKind::from_link("Other note"), None);
        assert_eq!(MediaKind::from_link("diagram.excalidraw"), None);
    }

    #[test]
    fn test_file_name_and_page() {
        assert_eq!(media_file_name("attachments/img/cat.png"), "cat.png");
        assert_eq!(media_file_name("cat.png"), "cat.png");
        assert_eq!(pdf_page("book.pdf#page=12"), 12);
        assert_eq!(pdf_page("book.pdf"), 1);
    }
}
