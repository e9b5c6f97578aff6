use std::convert::TryInto;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

use rusqlite::Error as WrappedError;

use super::DatabaseError;

/// An error occurring while opening or creating the virtual file system
/// itself (schema discovery/creation), as opposed to a single file.
#[derive(Debug, PartialEq)]
pub enum FileSystemError {
    /// No schema exists in the database and the caller asked not to create one.
    NoFileSystem,
    /// One of the base SQL statements failed to prepare. Should not occur in the wild.
    InvalidBaseCommand(String, WrappedError),
    /// The highest meta table found has a version newer than `CURRENT_VERSION`.
    InvalidDatabaseVersion(u32),
    /// A general database error from the backend.
    DatabaseError(DatabaseError),
}

impl super::Error for FileSystemError {}

impl From<WrappedError> for FileSystemError {
    fn from(error: WrappedError) -> Self {
        FileSystemError::DatabaseError(error.try_into().expect(DatabaseError::LOGIC_ERROR_MESSAGE))
    }
}

impl Display for FileSystemError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("Error opening the virtual file system: ")?;
        match self {
            FileSystemError::NoFileSystem => {
                write!(f, "no virtual file system exists and none should be created")
            }
            FileSystemError::InvalidBaseCommand(sql, _) => {
                write!(f, "preparing the base SQL command '{}' failed", sql)
            }
            FileSystemError::InvalidDatabaseVersion(version) => write!(
                f,
                "the on-disk schema version '{}' is not supported by this library version",
                version
            ),
            FileSystemError::DatabaseError(error) => {
                write!(f, "the underlying database failed ('{}')", error)
            }
        }
    }
}
