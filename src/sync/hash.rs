//! Content hashing for change detection.
//!
//! A document whose SHA256 matches the hash recorded at the end of the
//! previous sync is skipped entirely: it is not parsed and none of its notes
//! are touched.

use sha2::{Digest, Sha256};

/// Compute the SHA256 hex digest of a document's full text.
///
/// # Example
///
/// ```
/// let hash = mdanki::sync::content_hash("START\nBasic\nFront: Q\nBack: A\nEND");
/// assert_eq!(hash.len(), 64);
/// ```
#[must_use]
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check if a document has changed since the last sync.
///
/// Returns `true` if:
/// - There is no stored hash (never synced)
/// - The current hash differs from the stored hash
///
/// Returns `false` if the hashes match (no change).
#[must_use]
pub fn has_changed(current_hash: &str, stored_hash: Option<&str>) -> bool {
    stored_hash.is_none_or(|h| h != current_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_deterministic() {
        let hash1 = content_hash("some text");
        let hash2 = content_hash("some text");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA256 produces 64 hex chars
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        assert_ne!(content_hash("Back: A"), content_hash("Back: B"));
    }

    #[test]
    fn test_has_changed_no_stored_hash() {
        assert!(has_changed("abc123", None));
    }

    #[test]
    fn test_has_changed_different_hash() {
        assert!(has_changed("abc123", Some("xyz789")));
    }

    #[test]
    fn test_has_changed_same_hash() {
        assert!(!has_changed("abc123", Some("abc123")));
    }
}
