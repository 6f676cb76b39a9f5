use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while expanding glob patterns into a [`FileSet`](crate::fileset::FileSet).
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Base directory '{0}' does not exist.")]
    MissingBase(Utf8PathBuf),

    #[error("Base path '{0}' is not a directory.")]
    NotADirectory(Utf8PathBuf),

    #[error("Couldn't compile glob pattern '{pattern}'.\n{source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),
}

/// Errors raised by the minifying stages on malformed input.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Bundle '{bundle}': syntax error in '{file}'.\n{reason}")]
    Source {
        bundle: String,
        file: Utf8PathBuf,
        reason: String,
    },

    #[error("Bundle '{bundle}': syntax error in the concatenated sources.\n{reason}")]
    Bundle { bundle: String, reason: String },

    #[error("Bundle '{bundle}': source '{file}' is not valid UTF-8.")]
    Encoding { bundle: String, file: Utf8PathBuf },
}

/// Errors raised by the destination writer.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Couldn't write '{path}'.\n{source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't remove '{path}'.\n{source}")]
    Remove {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a task body can fail with.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Couldn't read '{path}'.\n{source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task panicked: {0}")]
    Panic(String),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Task '{0}' is not defined.")]
    UnknownTask(String),

    #[error("Task '{task}' depends on undefined task '{prerequisite}'.")]
    UnknownPrerequisite { task: String, prerequisite: String },

    #[error("Task '{0}' is defined more than once.")]
    DuplicateTask(String),

    #[error("Cycle detected in task graph at task '{0}'.")]
    Cycle(String),

    #[error("No task was requested and the graph has no default task.")]
    NoDefault,

    #[error("Couldn't start the worker pool.\n{0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("Task '{name}' failed:\n{source}")]
    Task {
        name: String,
        #[source]
        source: StageError,
    },
}

impl BuildError {
    /// Name of the task whose body failed, if the error came from one.
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            BuildError::Task { name, .. } => Some(name),
            _ => None,
        }
    }
}
