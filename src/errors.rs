use crate::edit::EditError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop a patch run.
///
/// A missing anchor is not one of these; it is reported as a step outcome.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: EditError,
    },

    #[error("edit failed on {path}: {source}")]
    Edit {
        path: PathBuf,
        #[source]
        source: EditError,
    },
}
