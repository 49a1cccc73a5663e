use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::datecode::ConventionError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of the lister and the concatenating reader.
///
/// The I/O variants keep the `io::Error` that caused them, so callers can still
/// tell "not found" apart from "permission denied".
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not list directory {}", path.display())]
    DirectoryList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not open {}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not read {}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unusable file name convention for {}", path.display())]
    InvalidConvention {
        path: PathBuf,
        #[source]
        source: ConventionError,
    },
}

impl Error {
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Error::DirectoryList { source, .. }
            | Error::FileOpen { source, .. }
            | Error::FileRead { source, .. } => source.kind(),
            Error::InvalidConvention { .. } => io::ErrorKind::InvalidInput,
        }
    }

    /// The directory or file the failure refers to.
    pub fn path(&self) -> &Path {
        match self {
            Error::DirectoryList { path, .. }
            | Error::FileOpen { path, .. }
            | Error::FileRead { path, .. }
            | Error::InvalidConvention { path, .. } => path,
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        io::Error::new(e.kind(), e)
    }
}
