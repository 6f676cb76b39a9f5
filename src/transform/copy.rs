use camino::Utf8Path;

use crate::error::StageError;
use crate::fileset::FileSet;
use crate::output::{Output, rebase};
use crate::transform::read_all;

/// Map every file onto `root`, keeping its path relative to its base.
///
/// Content is passed through untouched.
pub fn copy(files: &FileSet, root: impl AsRef<Utf8Path>) -> Result<Vec<Output>, StageError> {
    let root = root.as_ref();

    Ok(read_all(files)?
        .into_iter()
        .map(|(entry, data)| Output {
            path: rebase(entry, root),
            data,
        })
        .collect())
}
