//! Glob-based file selection.
//!
//! A [`FileSet`] is the ordered result of expanding glob patterns against a
//! base directory. Order across patterns is exactly the order the patterns
//! were given in, so a set can drive a concatenation where load order
//! matters (a vendor bundle). Within a single pattern, matches come out in the
//! lexicographic order the `glob` crate walks directories in.

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use glob::{Pattern, glob};

use crate::error::ResolutionError;

/// A single resolved file, remembering the base it was matched under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEntry {
    /// Directory the pattern was resolved against.
    pub base: Utf8PathBuf,
    /// Full path of the file, `base` included.
    pub path: Utf8PathBuf,
}

impl FileEntry {
    /// Path of the file relative to its base.
    pub fn relative(&self) -> &Utf8Path {
        self.path.strip_prefix(&self.base).unwrap_or(&self.path)
    }
}

/// An ordered, read-only list of files resolved from glob patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: Vec<FileEntry>,
}

impl FileSet {
    /// Expand every pattern in `patterns` relative to `base`, in order.
    ///
    /// A pattern matching nothing contributes nothing. Directories are never
    /// part of the result, and a file matched by more than one pattern is kept
    /// at its first position only.
    pub fn resolve<I, P>(base: impl AsRef<Utf8Path>, patterns: I) -> Result<Self, ResolutionError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let base = base.as_ref();

        match base.metadata() {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ResolutionError::NotADirectory(base.to_owned())),
            Err(_) => return Err(ResolutionError::MissingBase(base.to_owned())),
        }

        let prefix = Pattern::escape(base.as_str());
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let full = format!("{}/{}", prefix, pattern.trim_start_matches('/'));

            let paths = glob(&full).map_err(|source| ResolutionError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;

            let before = entries.len();
            for path in paths {
                let path = Utf8PathBuf::try_from(path?)?;

                if !path.is_file() || !seen.insert(path.clone()) {
                    continue;
                }

                entries.push(FileEntry {
                    base: base.to_owned(),
                    path,
                });
            }

            if entries.len() == before {
                tracing::debug!(%base, pattern, "pattern matched no files");
            }
        }

        Ok(Self { entries })
    }

    /// Append `other` after the entries of `self`.
    pub fn chain(mut self, other: FileSet) -> Self {
        for entry in other.entries {
            if !self.entries.contains(&entry) {
                self.entries.push(entry);
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
