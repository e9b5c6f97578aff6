//! Versioned meta/data table-name registry and SQL template expansion.

use regex::Regex;
use rusqlite::Connection as Database;
use rusqlite::Error as DbError;

const META_TABLE_PREFIX: &str = "Matryoshka_Meta_";
const DATA_TABLE: &str = "Matryoshka_Data";

/// Names the pair of tables backing one schema version: `Matryoshka_Meta_<v>`
/// and the (version-independent) `Matryoshka_Data`.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq)]
pub struct MetaTable(u32);

/// What the catalog lookup found.
#[derive(Debug, PartialEq)]
pub enum Availability {
    /// At least one meta table exists; carries the newest (highest version).
    Available(MetaTable),
    /// No `Matryoshka_Meta_%` table exists.
    Missing,
    /// The catalog query itself failed.
    Error(DbError),
}

impl MetaTable {
    /// Builds a handle naming a specific schema version directly.
    pub const fn new(version: u32) -> Self {
        MetaTable(version)
    }

    /// Recovers the version from a catalog table name, if it matches the
    /// `Matryoshka_Meta_<digits>` pattern.
    pub fn parse(name: &str) -> Option<Self> {
        extractor().extract(name).map(MetaTable)
    }

    /// Enumerates all `Matryoshka_Meta_%` tables, sorted descending by
    /// version (per §9 design note (c), only the top element's ordering is
    /// load-bearing; this still sorts the whole vector for a stable, testable
    /// `Load`).
    pub fn load(database: &Database) -> Availability {
        let mut statement = match database
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name LIKE ?")
        {
            Ok(statement) => statement,
            Err(error) => return Availability::Error(error),
        };

        let pattern = format!("{}%", META_TABLE_PREFIX);
        let rows = match statement.query_map([pattern], |row| row.get::<_, String>(0)) {
            Ok(rows) => rows,
            Err(error) => return Availability::Error(error),
        };

        let mut versions: Vec<MetaTable> = rows
            .filter_map(|row| row.ok())
            .filter_map(|name| MetaTable::parse(&name))
            .collect();
        versions.sort_by(|a, b| b.cmp(a));

        match versions.into_iter().next() {
            Some(newest) => Availability::Available(newest),
            None => Availability::Missing,
        }
    }

    /// The schema version number.
    pub fn version(&self) -> u32 {
        self.0
    }

    /// The resolved meta-table name, e.g. `Matryoshka_Meta_0`.
    pub fn meta_table_name(&self) -> String {
        format!("{}{}", META_TABLE_PREFIX, self.0)
    }

    /// The (version-independent) data-table name.
    pub fn data_table_name(&self) -> &'static str {
        DATA_TABLE
    }

    /// Expands `{meta}` and `{data}` placeholders (left-to-right,
    /// multi-occurrence) in a SQL template. An unmatched literal `{meta`/
    /// `{data` prefix that never closes is left untouched.
    pub fn format(&self, template: &str) -> String {
        let meta = self.meta_table_name();
        let data = self.data_table_name();

        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(replacement) = tail
                .strip_prefix("{meta}")
                .map(|after| (meta.as_str(), after))
                .or_else(|| tail.strip_prefix("{data}").map(|after| (data, after)))
            {
                out.push_str(replacement.0);
                rest = replacement.1;
            } else {
                // Unclosed/unknown placeholder: keep the brace literally and
                // continue scanning right after it.
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

fn extractor() -> Regex {
    Regex::new(&format!("^{}([0-9]+)$", META_TABLE_PREFIX)).expect("static regex is valid")
}

trait Extract {
    fn extract(&self, value: &str) -> Option<u32>;
}

impl Extract for Regex {
    fn extract(&self, value: &str) -> Option<u32> {
        self.captures(value)
            .and_then(|captures| captures.get(1))
            .and_then(|digits| digits.as_str().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_parse_round_trip() {
        for version in [0u32, 1, 42] {
            let table = MetaTable::new(version);
            assert_eq!(table.meta_table_name(), format!("Matryoshka_Meta_{}", version));
            assert_eq!(MetaTable::parse(&table.meta_table_name()), Some(table));
        }
    }

    #[test]
    fn test_ordering() {
        assert!(MetaTable::new(42) > MetaTable::new(1));
    }

    #[test]
    fn test_format_expansion() {
        let table = MetaTable::new(0);
        assert_eq!(
            table.format("{meta} {data} {meta}{data}"),
            "Matryoshka_Meta_0 Matryoshka_Data Matryoshka_Meta_0Matryoshka_Data"
        );
        assert_eq!(table.format("abc"), "abc");
    }

    #[test]
    fn test_format_tolerates_unclosed_brace() {
        let table = MetaTable::new(0);
        assert_eq!(table.format("{meta"), "{meta");
        assert_eq!(table.format("{datarium}"), "{datarium}");
    }

    #[test]
    fn test_missing_filesystem() {
        let database = Database::open_in_memory().expect("in-memory database");
        assert_eq!(MetaTable::load(&database), Availability::Missing);
    }

    #[test]
    fn test_existing_filesystem_picks_newest() {
        let database = Database::open_in_memory().expect("in-memory database");
        database
            .execute(
                &format!("CREATE TABLE {} (example TEXT)", MetaTable::new(0).meta_table_name()),
                [],
            )
            .expect("create table");
        assert_eq!(
            MetaTable::load(&database),
            Availability::Available(MetaTable::new(0))
        );

        database
            .execute(
                &format!("CREATE TABLE {} (example TEXT)", MetaTable::new(42).meta_table_name()),
                [],
            )
            .expect("create table");
        assert_eq!(
            MetaTable::load(&database),
            Availability::Available(MetaTable::new(42))
        );
    }
}
