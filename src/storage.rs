//! On-disk attachment and snapshot store.
//!
//! Layout: `{root}/{source_id}/{safe_title}.pdf` for attachments and
//! `{root}/{source_id}/{safe_title}.html` for article snapshots. Existing files
//! are never replaced; a clashing name gets a `-{n}` suffix.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

const SAFE_TITLE_LEN: usize = 60;
const SOURCE_URL_PREFIX: &str = "<!-- source-url: ";
const SOURCE_URL_SUFFIX: &str = " -->";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not a snapshot file: {0}")]
    NotSnapshot(PathBuf),
}

/// Filename stem for a title: characters outside `[A-Za-z0-9_-]` become `_`,
/// truncated to 60 characters.
pub fn safe_title(title: &str) -> String {
    let safe: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(SAFE_TITLE_LEN)
        .collect();
    if safe.is_empty() {
        "untitled".to_string()
    } else {
        safe
    }
}

/// A page snapshot read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSnapshot {
    pub path: PathBuf,
    pub source_id: String,
    pub url: String,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to the root. The n-th (zero-based) attachment of a record
    /// after the first gets a `_{n+1}` suffix.
    pub fn attachment_relpath(source_id: &str, title: &str, index: usize, extension: &str) -> PathBuf {
        let stem = safe_title(title);
        let name = if index == 0 {
            format!("{}.{}", stem, extension)
        } else {
            format!("{}_{}.{}", stem, index + 1, extension)
        };
        Path::new(source_id).join(name)
    }

    /// `relpath`, or the first `{stem}-{n}.{ext}` variant not yet on disk.
    fn free_relpath(&self, relpath: &Path) -> PathBuf {
        if !self.root.join(relpath).exists() {
            return relpath.to_path_buf();
        }
        let stem = relpath
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = relpath
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (2..)
            .map(|n| relpath.with_file_name(format!("{}-{}{}", stem, n, ext)))
            .find(|candidate| !self.root.join(candidate).exists())
            .unwrap_or_else(|| relpath.to_path_buf())
    }

    /// Write without replacing an existing file; returns the relative path used.
    fn write(&self, relpath: &Path, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let relpath = self.free_relpath(relpath);
        let path = self.root.join(&relpath);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(relpath)
    }

    /// Store an attachment and return its path relative to the root.
    pub fn write_attachment(
        &self,
        source_id: &str,
        title: &str,
        index: usize,
        bytes: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let relpath = Self::attachment_relpath(source_id, title, index, "pdf");
        self.write(&relpath, bytes)
    }

    /// Store the rendered article HTML, tagged with the URL it came from.
    pub fn write_snapshot(
        &self,
        source_id: &str,
        title: &str,
        url: &str,
        html: &str,
    ) -> Result<PathBuf, StorageError> {
        let relpath = Self::attachment_relpath(source_id, title, 0, "html");
        let tagged = format!("{}{}{}\n{}", SOURCE_URL_PREFIX, url, SOURCE_URL_SUFFIX, html);
        let written = self.write(&relpath, tagged.as_bytes())?;
        Ok(self.root.join(written))
    }

    /// Read a snapshot written by [`write_snapshot`](Self::write_snapshot).
    /// The source id is the name of the containing directory.
    pub fn read_snapshot(path: &Path) -> Result<SavedSnapshot, StorageError> {
        let raw = std::fs::read_to_string(path)?;
        let (first, rest) = raw.split_once('\n').unwrap_or((raw.as_str(), ""));
        let url = first
            .strip_prefix(SOURCE_URL_PREFIX)
            .and_then(|s| s.strip_suffix(SOURCE_URL_SUFFIX))
            .ok_or_else(|| StorageError::NotSnapshot(path.to_path_buf()))?;
        let source_id = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StorageError::NotSnapshot(path.to_path_buf()))?;
        Ok(SavedSnapshot {
            path: path.to_path_buf(),
            source_id,
            url: url.to_string(),
            html: rest.to_string(),
        })
    }

    /// Snapshot files under `dir` (one level of source directories), sorted.
    pub fn list_snapshots(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                for inner in std::fs::read_dir(&path)? {
                    let inner = inner?.path();
                    if inner.extension().is_some_and(|e| e == "html") {
                        found.push(inner);
                    }
                }
            } else if path.extension().is_some_and(|e| e == "html") {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_title() {
        assert_eq!(
            safe_title("Acme's Phase 2: Alzheimer's results!"),
            "Acme_s_Phase_2__Alzheimer_s_results_"
        );
        assert_eq!(safe_title(&"x".repeat(100)).len(), 60);
        assert_eq!(safe_title("   "), "untitled");
        assert_eq!(safe_title("über-news_1"), "_ber-news_1");
    }

    #[test]
    fn test_attachment_relpath_suffixes() {
        assert_eq!(
            AttachmentStore::attachment_relpath("acme", "A B", 0, "pdf"),
            Path::new("acme").join("A_B.pdf")
        );
        assert_eq!(
            AttachmentStore::attachment_relpath("acme", "A B", 1, "pdf"),
            Path::new("acme").join("A_B_2.pdf")
        );
    }

    #[test]
    fn test_attachment_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path());
        let rel = store.write_attachment("acme", "Deck", 0, b"%PDF-1.4").unwrap();
        assert_eq!(std::fs::read(dir.path().join(&rel)).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path());
        let path = store
            .write_snapshot("acme", "Trial news", "https://acme.test/n/1", "<html><h1>T</h1></html>")
            .unwrap();

        let listed = AttachmentStore::list_snapshots(dir.path()).unwrap();
        assert_eq!(listed, vec![path.clone()]);

        let snap = AttachmentStore::read_snapshot(&path).unwrap();
        assert_eq!(snap.source_id, "acme");
        assert_eq!(snap.url, "https://acme.test/n/1");
        assert_eq!(snap.html, "<html><h1>T</h1></html>");
    }

    #[test]
    fn test_shared_title_prefix_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path());
        let prefix = "Acme announces topline results from its phase 2 study in early";
        let first = format!("{} Alzheimer's disease", prefix);
        let second = format!("{} onset dementia", prefix);
        assert_eq!(safe_title(&first), safe_title(&second));

        let a = store.write_snapshot("acme", &first, "https://acme.test/1", "<p>1</p>").unwrap();
        let b = store.write_snapshot("acme", &second, "https://acme.test/2", "<p>2</p>").unwrap();
        assert_ne!(a, b);
        assert_eq!(AttachmentStore::read_snapshot(&a).unwrap().url, "https://acme.test/1");
        assert_eq!(AttachmentStore::read_snapshot(&b).unwrap().url, "https://acme.test/2");

        let pdf_a = store.write_attachment("acme", &first, 0, b"one").unwrap();
        let pdf_b = store.write_attachment("acme", &second, 0, b"two").unwrap();
        assert_eq!(pdf_b, Path::new("acme").join(format!("{}-2.pdf", safe_title(&second))));
        assert_eq!(std::fs::read(dir.path().join(pdf_a)).unwrap(), b"one");
        assert_eq!(std::fs::read(dir.path().join(pdf_b)).unwrap(), b"two");
    }

    #[test]
    fn test_untagged_html_is_not_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<html></html>").unwrap();
        assert!(matches!(
            AttachmentStore::read_snapshot(&path),
            Err(StorageError::NotSnapshot(_))
        ));
    }
}
