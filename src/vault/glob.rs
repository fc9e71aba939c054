//! Ignore globs.
//!
//! Patterns are matched against vault-relative paths. A path is ignored when
//! it matches any plain pattern and none of the `!` patterns.

use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

#[derive(Debug, Clone)]
pub struct IgnoreGlobs {
    include: GlobSet,
    exclude: GlobSet,
}

impl Default for IgnoreGlobs {
    fn default() -> Self {
        Self {
            include: GlobSet::empty(),
            exclude: GlobSet::empty(),
        }
    }
}

impl IgnoreGlobs {
    /// Compile glob patterns.
    ///
    /// # Errors
    ///
    /// Returns a config error naming the first pattern that doesn't compile.
    pub fn new<S: AsRef<str>>(globs: &[S]) -> Result<Self> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();

        for glob in globs {
            let glob = glob.as_ref().trim();
            if glob.is_empty() {
                continue;
            }
            let (set, body) = match glob.strip_prefix('!') {
                Some(rest) => (&mut exclude, rest),
                None => (&mut include, glob),
            };
            // `*` stays inside one path segment, `**` crosses them.
            let compiled = GlobBuilder::new(body)
                .literal_separator(true)
                .build()
                .map_err(|e| Error::Config(format!("Invalid ignore glob '{glob}': {e}")))?;
            set.add(compiled);
        }

        let build = |builder: GlobSetBuilder| {
            builder
                .build()
                .map_err(|e| Error::Config(format!("Invalid ignore globs: {e}")))
        };
        Ok(Self {
            include: build(include)?,
            exclude: build(exclude)?,
        })
    }

    #[must_use]
    pub fn is_ignored(&self, path: &str) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_excalidraw_glob() {
        let globs = IgnoreGlobs::new(&["**/*.excalidraw.md"]).unwrap();
        assert!(globs.is_ignored("drawing.excalidraw.md"));
        assert!(globs.is_ignored("a/b/drawing.excalidraw.md"));
        assert!(!globs.is_ignored("a/b/notes.md"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let globs = IgnoreGlobs::new(&["Templates/*"]).unwrap();
        assert!(globs.is_ignored("Templates/daily.md"));
        assert!(!globs.is_ignored("Templates/sub/daily.md"));
    }

    #[test]
    fn test_negation_and_braces() {
        let globs = IgnoreGlobs::new(&["Archive/**", "!Archive/keep.md", "*.{tmp,bak}.md"]).unwrap();
        assert!(globs.is_ignored("Archive/old.md"));
        assert!(!globs.is_ignored("Archive/keep.md"));
        assert!(globs.is_ignored("x.bak.md"));
        assert!(!globs.is_ignored("x.md"));
    }

    #[test]
    fn test_character_classes() {
        let globs = IgnoreGlobs::new(&["drafts/[abc]*.md", "!drafts/[!x]keep.md"]).unwrap();
        assert!(globs.is_ignored("drafts/alpha.md"));
        assert!(globs.is_ignored("drafts/citrus.md"));
        assert!(!globs.is_ignored("drafts/delta.md"));
        assert!(!globs.is_ignored("drafts/akeep.md"));
        assert!(!globs.is_ignored("drafts/a/nested.md"));
    }

    #[test]
    fn test_negation_only_never_ignores() {
        let globs = IgnoreGlobs::new(&["!notes/**"]).unwrap();
        assert!(!globs.is_ignored("notes/a.md"));
        assert!(!IgnoreGlobs::default().is_ignored("a.md"));
    }

    #[test]
    fn test_invalid_glob_is_a_config_error() {
        let err = IgnoreGlobs::new(&["notes/[unclosed"]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("[unclosed")));
    }
}
