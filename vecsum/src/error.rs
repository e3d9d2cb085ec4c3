use std::path::PathBuf;

use vecsum_common::buf::AllocError;

use crate::chunk::AlignmentError;

/// Fatal errors. Any of these ends the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
    #[error("could not open {path:?} on the storage backend: {source}")]
    BackendConnect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("partial read: got {got} bytes, expected {expected}")]
    PartialRead { expected: usize, got: usize },
    #[error("failed to set up a {size} byte buffer: {source}")]
    Allocation {
        size: usize,
        #[source]
        source: AllocError,
    },
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(op: &'static str) -> impl FnOnce(std::io::Error) -> Error {
        move |source| Error::Io { op, source }
    }
}
