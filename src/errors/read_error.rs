use std::convert::TryInto;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::io::{Error as IoError, ErrorKind};

use rusqlite::Error as WrappedError;

use crate::range_reader::RangeReaderError;

use super::DatabaseError;

/// An error occurring during reading a file from the virtual file system.
#[derive(Debug, PartialEq)]
pub enum ReadError {
    /// The requested range lies (partially) past the end of the file.
    OutOfBounds,
    /// The requested offset/length exceed what the backend can address.
    FileSystemLimits,
    /// The sink (callback or in-memory buffer) raised an error.
    SinkError(ErrorKind),
    /// A host file for a read-into-file-path destination could not be created.
    FileCreationFailed,
    /// A host file write appeared to fail after the chunk callback itself reported success.
    WritingError,
    /// A general database error from the backend.
    DatabaseError(DatabaseError),
}

impl super::Error for ReadError {}

impl From<WrappedError> for ReadError {
    fn from(error: WrappedError) -> Self {
        ReadError::DatabaseError(error.try_into().expect(DatabaseError::LOGIC_ERROR_MESSAGE))
    }
}

impl From<IoError> for ReadError {
    fn from(error: IoError) -> Self {
        ReadError::SinkError(error.kind())
    }
}

impl From<RangeReaderError> for ReadError {
    fn from(error: RangeReaderError) -> Self {
        match error {
            RangeReaderError::OutOfBounds => ReadError::OutOfBounds,
            RangeReaderError::Database(error) => error.into(),
        }
    }
}

impl Display for ReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("Error during file reading: ")?;
        match self {
            ReadError::OutOfBounds => write!(f, "the specified indices are out of bounds"),
            ReadError::FileSystemLimits => write!(
                f,
                "the underlying database does not allow files of such size"
            ),
            ReadError::SinkError(error) => write!(f, "the data destination failed ('{:?}')", error),
            ReadError::FileCreationFailed => {
                write!(f, "the destination host file could not be created")
            }
            ReadError::WritingError => write!(f, "writing to the destination host file failed"),
            ReadError::DatabaseError(error) => {
                write!(f, "the underlying database failed ('{}')", error)
            }
        }
    }
}
