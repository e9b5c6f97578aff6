use std::convert::TryInto;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::io::{Error as IoError, ErrorKind};

use rusqlite::Error as WrappedError;

use super::DatabaseError;

/// An error occurring during the creation of a file in the virtual file system.
#[derive(Debug, PartialEq)]
pub enum CreationError {
    /// A file already exists under this path.
    FileExists,
    /// The host source file for a push could not be opened.
    FileNotFound,
    /// The data source could not supply the promised bytes (callback abort,
    /// or a host-file read that returned fewer bytes than expected). The
    /// original implementation is inconsistent here — some call sites
    /// propagate the raw abort signal, others translate it — this crate
    /// standardizes on `ReadingError` for every `Create` source shape.
    ReadingError,
    /// The data source raised a host I/O error unrelated to exhaustion.
    SourceError(ErrorKind),
    /// A general database error from the backend.
    DatabaseError(DatabaseError),
}

impl super::Error for CreationError {}

impl From<WrappedError> for CreationError {
    fn from(error: WrappedError) -> Self {
        CreationError::DatabaseError(error.try_into().expect(DatabaseError::LOGIC_ERROR_MESSAGE))
    }
}

impl From<IoError> for CreationError {
    fn from(error: IoError) -> Self {
        CreationError::SourceError(error.kind())
    }
}

impl Display for CreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("Error during file creation: ")?;
        match self {
            CreationError::FileExists => write!(f, "a file already exists under this path"),
            CreationError::FileNotFound => write!(f, "the host source file could not be opened"),
            CreationError::ReadingError => {
                write!(f, "the data source did not supply the promised bytes")
            }
            CreationError::SourceError(error) => {
                write!(f, "the data source failed ('{:?}')", error)
            }
            CreationError::DatabaseError(error) => {
                write!(f, "the underlying database failed ('{}')", error)
            }
        }
    }
}
