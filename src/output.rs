//! Destination paths and the writer that lands build output on disk.
//!
//! Path computation is kept separate from the filesystem: [`destination`] and
//! [`rebase`] are pure and can be tested without touching the disk.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::core::Hash32;
use crate::error::WriteError;
use crate::fileset::FileEntry;

/// A file to be written: full destination path and its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub path: Utf8PathBuf,
    pub data: Vec<u8>,
}

impl Output {
    pub fn new(path: impl Into<Utf8PathBuf>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }
}

/// A file that landed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub path: Utf8PathBuf,
    pub hash: Hash32,
}

/// Join a logical root with a relative suffix.
///
/// Leading slashes on the suffix are ignored, so `destination("static", "/js")`
/// is `static/js` rather than the filesystem root.
pub fn destination(root: impl AsRef<Utf8Path>, suffix: &str) -> Utf8PathBuf {
    let suffix = suffix.trim_start_matches('/');

    if suffix.is_empty() {
        root.as_ref().to_path_buf()
    } else {
        root.as_ref().join(suffix)
    }
}

/// Move a resolved file under another root, keeping its subpath.
///
/// - `web/html` + `layouts/base.html` into `templates` -> `templates/layouts/base.html`
pub fn rebase(entry: &FileEntry, root: impl AsRef<Utf8Path>) -> Utf8PathBuf {
    root.as_ref().join(entry.relative())
}

/// Write a single output atomically.
///
/// The content goes into a temporary file next to the destination which is
/// then renamed over it. If anything fails the temporary file is dropped and
/// whatever was at `path` before stays as it was.
pub fn write(output: &Output) -> Result<Written, WriteError> {
    let path = &output.path;
    let failed = |source: io::Error| WriteError::Write {
        path: path.clone(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };

    fs::create_dir_all(dir).map_err(failed)?;

    let mut file = tempfile::Builder::new()
        .prefix(".assetline-")
        .tempfile_in(dir)
        .map_err(failed)?;

    file.write_all(&output.data).map_err(failed)?;
    file.as_file().sync_all().map_err(failed)?;
    file.persist(path).map_err(|err| failed(err.error))?;

    let hash = Hash32::hash(&output.data);
    tracing::debug!(%path, %hash, "wrote file");

    Ok(Written {
        path: path.clone(),
        hash,
    })
}

/// Write a batch of outputs in parallel.
///
/// Outputs sharing a destination are serialized by keeping only the last one
/// in batch order, which is what sequential writes would leave behind.
pub fn write_all(outputs: Vec<Output>) -> Result<Vec<Written>, WriteError> {
    let mut last: HashMap<Utf8PathBuf, usize> = HashMap::new();
    for (i, output) in outputs.iter().enumerate() {
        last.insert(output.path.clone(), i);
    }

    let outputs: Vec<_> = outputs
        .into_iter()
        .enumerate()
        .filter(|(i, output)| last.get(&output.path) == Some(i))
        .map(|(_, output)| output)
        .collect();

    outputs.into_par_iter().map(|output| write(&output)).collect()
}

/// Remove every root recursively. Roots that don't exist are skipped.
pub fn clean<I, P>(roots: I) -> Result<(), WriteError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Utf8Path>,
{
    for root in roots {
        let root = root.as_ref();

        let result = match fs::symlink_metadata(root) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(root),
            Ok(_) => fs::remove_file(root),
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => Err(err),
        };

        result.map_err(|source| WriteError::Remove {
            path: root.to_owned(),
            source,
        })?;

        tracing::debug!(%root, "removed");
    }

    Ok(())
}

/// Fingerprint every file under `root`, keyed by path relative to `root`.
///
/// A missing root yields an empty map.
pub fn digest_tree(root: impl AsRef<Utf8Path>) -> io::Result<BTreeMap<Utf8PathBuf, Hash32>> {
    let root = root.as_ref();
    let mut acc = BTreeMap::new();

    if root.is_dir() {
        digest_rec(root, root, &mut acc)?;
    }

    Ok(acc)
}

fn digest_rec(
    root: &Utf8Path,
    dir: &Utf8Path,
    acc: &mut BTreeMap<Utf8PathBuf, Hash32>,
) -> io::Result<()> {
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            digest_rec(root, path, acc)?;
        } else {
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            acc.insert(relative, Hash32::hash_file(path)?);
        }
    }

    Ok(())
}
