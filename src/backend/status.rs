//! Recognizing the one backend status the virtual file system treats
//! specially: a unique-constraint violation on the meta table's `path`
//! column, which `Create` reinterprets as `FileExists`.

use rusqlite::{Error as SqlError, ErrorCode};

/// Whether `error` is a `SQLITE_CONSTRAINT` failure, as opposed to any other
/// backend error.
pub fn is_constraint_violation(error: &SqlError) -> bool {
    matches!(
        error,
        SqlError::SqliteFailure(inner, _) if inner.code == ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_detects_constraint_violation() {
        let connection = Connection::open_in_memory().expect("in-memory database");
        connection
            .execute_batch("CREATE TABLE widgets (name TEXT UNIQUE NOT NULL)")
            .expect("create table");
        connection
            .execute("INSERT INTO widgets (name) VALUES (?)", ["bolt"])
            .expect("first insert");

        let error = connection
            .execute("INSERT INTO widgets (name) VALUES (?)", ["bolt"])
            .unwrap_err();
        assert!(is_constraint_violation(&error));
    }

    #[test]
    fn test_other_errors_are_not_constraint_violations() {
        let connection = Connection::open_in_memory().expect("in-memory database");
        let error = connection.execute("SELECT * FROM nonexistent", []).unwrap_err();
        assert!(!is_constraint_violation(&error));
    }
}
