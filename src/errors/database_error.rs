use std::convert::TryFrom;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

use rusqlite::Error as WrappedError;
use rusqlite::ErrorCode as SQLiteError;

/// An error raised and described by the relational backend (SQLite).
#[derive(PartialEq, Eq)]
pub struct DatabaseError {
    error: SQLiteError,
    message: Option<String>,
}

impl DatabaseError {
    /// Message returned if the backend does not specify an error.
    pub const MISSING_MESSAGE: &'static str = "<unknown backend error>";
    /// Panic message returned if this library does not handle a logic error correctly.
    pub const LOGIC_ERROR_MESSAGE: &'static str = "Logic error during database access";

    /// Whether this failure is a uniqueness/foreign-key constraint
    /// violation — used by `Create` to recognize a duplicate `path` insert.
    pub fn is_constraint_violation(&self) -> bool {
        self.error == SQLiteError::ConstraintViolation
    }
}

impl Debug for DatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.message {
            Some(message) => write!(f, "'{}' ({:?})", message, self.error),
            None => write!(f, "'{}' ({:?})", DatabaseError::MISSING_MESSAGE, self.error),
        }
    }
}

impl Display for DatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.message {
            Some(message) => f.write_str(message),
            None => f.write_str(DatabaseError::MISSING_MESSAGE),
        }
    }
}

impl super::Error for DatabaseError {}

impl TryFrom<WrappedError> for DatabaseError {
    type Error = ();

    fn try_from(value: WrappedError) -> Result<Self, Self::Error> {
        match value {
            WrappedError::SqliteFailure(error, message) => Ok(Self {
                error: error.code,
                message,
            }),
            _ => Err(()),
        }
    }
}
