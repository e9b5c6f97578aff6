//! Connection-level operations layered on top of `rusqlite::Connection` via
//! an extension trait, so the rest of the crate stays generic over
//! `D: BorrowMut<Connection>` the way the file system already is.

use rusqlite::limits::Limit;
use rusqlite::{CachedStatement, Connection, Result as SqlResult};

/// Operations the virtual file system needs from the raw SQLite connection,
/// beyond what `rusqlite` already exposes directly.
pub trait DatabaseExt {
    /// The largest value `SQLITE_LIMIT_LENGTH` currently allows for a
    /// string or BLOB in this connection.
    fn max_blob_length(&self) -> i32;

    /// Lowers or raises `SQLITE_LIMIT_LENGTH`; returns the previous value.
    fn set_max_blob_length(&self, length: i32) -> i32;

    /// The row id of the most recent successful `INSERT`.
    fn last_inserted_row_id(&self) -> i64;

    /// Prepares (and caches) `INSERT INTO <table> (<columns...>) VALUES
    /// (:col...)`, ready for named-parameter binding.
    fn prepare_insert(&self, table: &str, columns: &[&str]) -> SqlResult<CachedStatement<'_>>;
}

impl DatabaseExt for Connection {
    fn max_blob_length(&self) -> i32 {
        self.limit(Limit::SQLITE_LIMIT_LENGTH)
    }

    fn set_max_blob_length(&self, length: i32) -> i32 {
        self.set_limit(Limit::SQLITE_LIMIT_LENGTH, length)
    }

    fn last_inserted_row_id(&self) -> i64 {
        self.last_insert_rowid()
    }

    fn prepare_insert(&self, table: &str, columns: &[&str]) -> SqlResult<CachedStatement<'_>> {
        let placeholders: Vec<String> = columns.iter().map(|column| format!(":{}", column)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        self.prepare_cached(&sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_blob_length_round_trip() {
        let connection = Connection::open_in_memory().expect("in-memory database");
        let previous = connection.max_blob_length();
        assert_eq!(connection.set_max_blob_length(4096), previous);
        assert_eq!(connection.max_blob_length(), 4096);
    }

    #[test]
    fn test_prepare_insert_builds_named_placeholders() {
        let connection = Connection::open_in_memory().expect("in-memory database");
        connection
            .execute_batch("CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT, size INTEGER)")
            .expect("create table");

        let mut statement = connection
            .prepare_insert("widgets", &["name", "size"])
            .expect("prepare insert");
        statement
            .execute(&[(":name", &"bolt" as &dyn rusqlite::ToSql), (":size", &3)])
            .expect("insert row");
        assert_eq!(connection.last_inserted_row_id(), 1);
    }
}
