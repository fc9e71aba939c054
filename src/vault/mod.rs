//! The vault: a directory tree of markdown documents.
//!
//! Documents are addressed by vault-relative paths with `/` separators,
//! which is also how they are keyed in the hash cache.

mod glob;

pub use glob::IgnoreGlobs;

use crate::error::{Error, Result};
use crate::sync::atomic_write;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;
use walkdir::WalkDir;

/// Resolves wiki links to vault-relative paths.
pub trait LinkResolver {
    /// Best match for `link` as seen from the document at `source`.
    fn resolve_link(&self, link: &str, source: &str) -> Option<String>;
}

#[derive(Debug)]
pub struct Vault {
    root: PathBuf,
    name: String,
    files: OnceLock<Vec<String>>,
}

impl Vault {
    /// Open the vault rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if `root` is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::PathNotFound { path: root });
        }
        let root = root.canonicalize()?;
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            root,
            name,
            files: OnceLock::new(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name used in `obsidian://` deep links.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn absolute_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Vault-relative form of `path`, which may be absolute or relative to the root.
    #[must_use]
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let absolute = absolute.canonicalize().unwrap_or(absolute);
        let relative = absolute.strip_prefix(&self.root).ok()?;
        Some(to_slash(relative))
    }

    /// Markdown documents under `scope` (a file or folder), sorted by path.
    ///
    /// Hidden folders such as `.obsidian` and `.mdanki` are skipped.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if `scope` doesn't exist inside the vault, or
    /// `InvalidArgument` for a file that isn't markdown.
    pub fn list_documents(&self, scope: &Path) -> Result<Vec<String>> {
        let absolute = if scope.is_absolute() {
            scope.to_path_buf()
        } else {
            self.root.join(scope)
        };
        if !absolute.exists() {
            return Err(Error::PathNotFound { path: absolute });
        }
        let Some(relative) = self.relative_path(&absolute) else {
            return Err(Error::PathNotFound { path: absolute });
        };

        if absolute.is_file() {
            if !is_markdown(&absolute) {
                return Err(Error::InvalidArgument(format!(
                    "Can only sync markdown files: {relative}"
                )));
            }
            return Ok(vec![relative]);
        }

        let mut documents: Vec<String> = walk(&absolute)
            .filter(|p| is_markdown(p))
            .filter_map(|p| self.relative_path(&p))
            .collect();
        documents.sort();
        debug!(scope = %relative, count = documents.len(), "Listed documents");
        Ok(documents)
    }

    /// Every file in the vault, any extension.
    fn all_files(&self) -> &[String] {
        self.files.get_or_init(|| {
            let mut files: Vec<String> = walk(&self.root)
                .filter_map(|p| p.strip_prefix(&self.root).ok().map(to_slash))
                .collect();
            files.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
            files
        })
    }

    /// Read a document.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file can't be read.
    pub fn read(&self, relative: &str) -> Result<String> {
        Ok(fs::read_to_string(self.absolute_path(relative))?)
    }

    /// Replace a document's content.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file can't be written.
    pub fn write(&self, relative: &str, content: &str) -> Result<()> {
        atomic_write(&self.absolute_path(relative), content)
    }
}

impl LinkResolver for Vault {
    fn resolve_link(&self, link: &str, source: &str) -> Option<String> {
        let link = link.split('#').next().unwrap_or(link).trim();
        if link.is_empty() {
            return None;
        }
        let link = link.trim_start_matches('/');
        let with_ext = if Path::new(link).extension().is_some() {
            link.to_string()
        } else {
            format!("{link}.md")
        };
        let files = self.all_files();

        // Exact vault path, then relative to the linking document.
        if let Some(found) = files.iter().find(|f| **f == with_ext) {
            return Some(found.clone());
        }
        if let Some((folder, _)) = source.rsplit_once('/') {
            let relative = format!("{folder}/{with_ext}");
            if let Some(found) = files.iter().find(|f| **f == relative) {
                return Some(found.clone());
            }
        }

        // Shortest path ending in the link.
        let suffix = format!("/{with_ext}");
        files.iter().find(|f| f.ends_with(&suffix)).cloned()
    }
}

fn walk(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'))
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vault_with(files: &[(&str, &str)]) -> (TempDir, Vault) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let vault = Vault::open(dir.path()).unwrap();
        (dir, vault)
    }

    #[test]
    fn test_list_documents_skips_hidden_and_non_markdown() {
        let (_dir, vault) = vault_with(&[
            ("a.md", ""),
            ("sub/b.md", ""),
            ("sub/img.png", ""),
            (".obsidian/workspace.md", ""),
        ]);
        let docs = vault.list_documents(Path::new("")).unwrap();
        assert_eq!(docs, vec!["a.md", "sub/b.md"]);

        let docs = vault.list_documents(Path::new("sub")).unwrap();
        assert_eq!(docs, vec!["sub/b.md"]);
    }

    #[test]
    fn test_list_single_file_and_errors() {
        let (_dir, vault) = vault_with(&[("a.md", ""), ("img.png", "")]);
        assert_eq!(vault.list_documents(Path::new("a.md")).unwrap(), vec!["a.md"]);
        assert!(matches!(
            vault.list_documents(Path::new("img.png")),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            vault.list_documents(Path::new("nope")),
            Err(Error::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_link() {
        let (_dir, vault) = vault_with(&[
            ("Rust/Ownership.md", ""),
            ("Deep/Nested/Ownership.md", ""),
            ("assets/cat.png", ""),
            ("notes/local.md", ""),
        ]);
        assert_eq!(
            vault.resolve_link("Ownership", "x.md").as_deref(),
            Some("Rust/Ownership.md")
        );
        assert_eq!(
            vault.resolve_link("Deep/Nested/Ownership#Heading", "x.md").as_deref(),
            Some("Deep/Nested/Ownership.md")
        );
        assert_eq!(
            vault.resolve_link("cat.png", "x.md").as_deref(),
            Some("assets/cat.png")
        );
        assert_eq!(
            vault.resolve_link("local", "notes/here.md").as_deref(),
            Some("notes/local.md")
        );
        assert_eq!(vault.resolve_link("missing", "x.md"), None);
    }

    #[test]
    fn test_read_write_round_trip() {
        let (_dir, vault) = vault_with(&[("a.md", "old")]);
        vault.write("a.md", "new").unwrap();
        assert_eq!(vault.read("a.md").unwrap(), "new");
        assert!(!vault.name().is_empty());
    }
}
