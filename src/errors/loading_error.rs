use std::convert::TryInto;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

use rusqlite::Error as WrappedError;

use super::DatabaseError;

/// An error occurring while opening/loading a single file from the virtual
/// file system by path or handle.
#[derive(Debug, PartialEq)]
pub enum LoadingError {
    /// No file exists under the requested path/handle.
    FileNotFound,
    /// A general database error from the backend.
    DatabaseError(DatabaseError),
}

impl super::Error for LoadingError {}

impl From<WrappedError> for LoadingError {
    fn from(error: WrappedError) -> Self {
        LoadingError::DatabaseError(error.try_into().expect(DatabaseError::LOGIC_ERROR_MESSAGE))
    }
}

impl Display for LoadingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("Error during file loading: ")?;
        match self {
            LoadingError::FileNotFound => write!(f, "the requested file does not exist"),
            LoadingError::DatabaseError(error) => {
                write!(f, "the underlying database failed ('{}')", error)
            }
        }
    }
}
