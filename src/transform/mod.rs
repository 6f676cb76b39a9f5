//! Stages that turn resolved files into outputs.
//!
//! * [`copy`]: byte-identical passthrough into another root.
//! * [`js`]: concatenate scripts in order and minify them into one bundle.
//! * [`css`]: concatenate stylesheets in order and minify them into one bundle.
//!
//! Sources are read in parallel, but always collected back in [`FileSet`]
//! order before anything is concatenated.

pub mod copy;
pub mod css;
pub mod js;

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::{StageError, TransformError};
use crate::fileset::{FileEntry, FileSet};
use crate::output::Output;

pub use copy::copy;
pub use css::bundle_css;
pub use js::{JsOptions, bundle_js, scripts};

/// A named artifact produced by concatenating a file set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    pub content: Vec<u8>,
}

impl Bundle {
    /// Place the bundle inside `dir` under its own name.
    pub fn into_output(self, dir: impl AsRef<Utf8Path>) -> Output {
        Output {
            path: dir.as_ref().join(&self.name),
            data: self.content,
        }
    }
}

/// Raw bytes of every file in the set, in set order.
pub(crate) fn read_all(files: &FileSet) -> Result<Vec<(&FileEntry, Vec<u8>)>, StageError> {
    files
        .entries()
        .par_iter()
        .map(|entry| {
            fs::read(&entry.path)
                .map(|data| (entry, data))
                .map_err(|source| StageError::Read {
                    path: entry.path.clone(),
                    source,
                })
        })
        .collect()
}

/// A source file decoded as text.
pub(crate) struct Source<'a> {
    pub path: &'a Utf8Path,
    pub text: String,
}

pub(crate) fn read_text<'a>(
    bundle: &str,
    files: &'a FileSet,
) -> Result<Vec<Source<'a>>, StageError> {
    read_all(files)?
        .into_iter()
        .map(|(entry, data)| match String::from_utf8(data) {
            Ok(text) => Ok(Source {
                path: &entry.path,
                text,
            }),
            Err(_) => Err(TransformError::Encoding {
                bundle: bundle.to_string(),
                file: entry.path.clone(),
            }
            .into()),
        })
        .collect()
}

/// Join sources in order with `separator`, never reordering.
pub(crate) fn concat(sources: &[Source<'_>], separator: &str) -> String {
    let len = sources.iter().map(|s| s.text.len() + separator.len()).sum();
    let mut acc = String::with_capacity(len);

    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            acc.push_str(separator);
        }
        acc.push_str(&source.text);
    }

    acc
}

/// Run `check` over each source alone to find the one a bundle failed on.
pub(crate) fn locate_fault<F>(
    bundle: &str,
    sources: &[Source<'_>],
    reason: String,
    check: F,
) -> TransformError
where
    F: Fn(&str) -> Result<(), String>,
{
    for source in sources {
        if let Err(reason) = check(&source.text) {
            return TransformError::Source {
                bundle: bundle.to_string(),
                file: Utf8PathBuf::from(source.path),
                reason,
            };
        }
    }

    TransformError::Bundle {
        bundle: bundle.to_string(),
        reason,
    }
}
