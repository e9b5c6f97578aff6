//! The virtual file system: open/create the schema, then `Create`, `Read`,
//! `Open`, `Size`, `Find` and `Delete` individual files.

use std::borrow::BorrowMut;
use std::convert::TryFrom;
use std::fs::{File as HostFile, OpenOptions};
use std::io::{Read as IoRead, Write as IoWrite};
use std::path::Path as StdPath;

use log::{debug, trace, warn};
use rusqlite::{Connection as Database, OptionalExtension, ToSql};

use crate::backend::{is_constraint_violation, DataBlobSource, DatabaseExt};
use crate::blob::OwnedBlob;
use crate::cache::Cache;
use crate::errors::{CreationError, DatabaseError, FileSystemError, LoadingError, ReadError};
use crate::handle::{File as FileKind, FileHandle, Kind};
use crate::meta_table::{Availability, MetaTable};
use crate::path::Path;
use crate::range_reader::{CallbackReader, ContinuousReader};

/// The schema version this build of the crate writes and expects to read.
const CURRENT_VERSION: u32 = 0;

/// SQLite's own overhead per BLOB value; chunk sizes stay this far below
/// `SQLITE_LIMIT_LENGTH`.
const MAX_BLOB_MARGIN: i64 = 64;

fn to_database_error(error: rusqlite::Error) -> DatabaseError {
    DatabaseError::try_from(error).expect(DatabaseError::LOGIC_ERROR_MESSAGE)
}

/// The meta/data-table SQL this file system runs, expanded once at `load`
/// time against the resolved [`MetaTable`] and kept ready for
/// `prepare_cached` to pick back up on every call.
#[derive(Debug)]
struct Queries {
    handle_by_path: String,
    chunks_in_range: String,
    glob_paths: String,
    file_size: String,
    delete_data: String,
    delete_meta: String,
    meta_table: String,
    data_table: &'static str,
}

impl Queries {
    fn new(meta: &MetaTable) -> Self {
        Queries {
            handle_by_path: meta.format("SELECT id FROM {meta} WHERE path = :path AND type = :type"),
            chunks_in_range: meta.format(
                "SELECT chunk_id, chunk_num, {meta}.chunk_size FROM {data} \
                 INNER JOIN {meta} ON {meta}.id = {data}.file_id \
                 WHERE file_id = :handle AND chunk_num BETWEEN \
                 CAST((:index / {meta}.chunk_size) AS INT) AND CAST(((:index + :size - 1) / {meta}.chunk_size) AS INT) \
                 ORDER BY chunk_num ASC",
            ),
            glob_paths: meta.format("SELECT path FROM {meta} WHERE path GLOB :glob AND type = :type"),
            file_size: meta.format("SELECT COALESCE(SUM(LENGTH(data)), -1) FROM {data} WHERE file_id = :handle"),
            delete_data: meta.format("DELETE FROM {data} WHERE file_id = :handle"),
            delete_meta: meta.format("DELETE FROM {meta} WHERE id = :handle"),
            meta_table: meta.meta_table_name(),
            data_table: meta.data_table_name(),
        }
    }

    fn precompiled(&self) -> [&str; 6] {
        [
            &self.handle_by_path,
            &self.chunks_in_range,
            &self.glob_paths,
            &self.file_size,
            &self.delete_data,
            &self.delete_meta,
        ]
    }
}

/// Inserts data rows for one file inside an already open transaction.
struct ChunkInserter<'a> {
    transaction: &'a rusqlite::Transaction<'a>,
    data_table: &'a str,
    file_id: i64,
}

impl<'a> ChunkInserter<'a> {
    fn insert(&self, chunk_num: u32, data: &[u8]) -> rusqlite::Result<()> {
        let mut statement = self.transaction.prepare_insert(self.data_table, &["file_id", "chunk_num", "data"])?;
        statement.execute(&[
            (":file_id", &self.file_id as &dyn ToSql),
            (":chunk_num", &chunk_num),
            (":data", &data),
        ])?;
        Ok(())
    }
}

fn write_owned_blob(inserter: &ChunkInserter, chunk_size: usize, data: &OwnedBlob) -> Result<(), CreationError> {
    if chunk_size == data.len() {
        // Covers the empty-file case too (0 == 0): a single zero-length data
        // row, matching the original's `Create(Chunk&&)`, so `SUM(LENGTH)`
        // over the data rows yields 0 rather than NULL.
        inserter.insert(0, data.as_slice())?;
        return Ok(());
    }

    let mut offset = 0usize;
    let mut chunk_num = 0u32;
    while offset < data.len() {
        let len = chunk_size.min(data.len() - offset);
        inserter.insert(chunk_num, data.part(len, offset).as_slice())?;
        offset += len;
        chunk_num += 1;
    }
    Ok(())
}

/// Re-chunks whatever block size `source` naturally produces into rows of
/// exactly `chunk_size`, via [`Cache`]. An empty blob from `source` before
/// `file_size` bytes have been written means the source ran dry early.
fn write_from_source<F>(
    inserter: &ChunkInserter,
    chunk_size: usize,
    file_size: usize,
    mut source: F,
) -> Result<(), CreationError>
where
    F: FnMut(usize) -> OwnedBlob,
{
    if file_size == 0 {
        return Ok(());
    }

    let mut cache = Cache::new();
    let mut bytes_written = 0usize;
    let mut chunk_num = 0u32;

    while bytes_written < file_size {
        let required = chunk_size.min(file_size - bytes_written);
        let chunk = source(required);
        if chunk.is_empty() {
            warn!("create aborted: data source did not supply the promised bytes");
            return Err(CreationError::ReadingError);
        }

        if chunk.len() == required && cache.is_empty() {
            inserter.insert(chunk_num, chunk.as_slice())?;
        } else {
            cache.push(chunk);
            if cache.size() < required {
                continue;
            }
            let popped = cache.pop(required);
            inserter.insert(chunk_num, popped.as_slice())?;
        }

        chunk_num += 1;
        bytes_written += required;
    }

    Ok(())
}

/// A virtual file system rooted at a SQLite database.
///
/// Generic over `D: BorrowMut<Connection>` so callers may hand over either
/// an owned connection or a borrowed one, matching how the teacher's own
/// file system stayed generic over its database parameter.
#[derive(Debug)]
pub struct FileSystem<D> {
    database: D,
    meta: MetaTable,
    queries: Queries,
}

impl<D> FileSystem<D>
where
    D: BorrowMut<Database>,
{
    /// Opens the virtual file system in `database`. If none exists yet and
    /// `create_file_system` is set, creates the current schema version;
    /// otherwise fails with [`FileSystemError::NoFileSystem`].
    pub fn load(mut database: D, create_file_system: bool) -> Result<Self, FileSystemError> {
        let meta = match MetaTable::load(database.borrow()) {
            Availability::Available(meta) if meta.version() == CURRENT_VERSION => meta,
            Availability::Available(meta) => return Err(FileSystemError::InvalidDatabaseVersion(meta.version())),
            Availability::Missing if create_file_system => {
                let meta = MetaTable::new(CURRENT_VERSION);
                let transaction = database.borrow_mut().transaction()?;
                transaction.execute_batch(&meta.format(
                    "CREATE TABLE {meta} (\
                         id INTEGER PRIMARY KEY, \
                         path TEXT UNIQUE NOT NULL, \
                         type INTEGER NOT NULL, \
                         chunk_size INTEGER NOT NULL\
                     ); \
                     CREATE TABLE IF NOT EXISTS {data} (\
                         chunk_id INTEGER PRIMARY KEY, \
                         file_id INTEGER NOT NULL, \
                         chunk_num INTEGER NOT NULL, \
                         data BLOB NOT NULL, \
                         CONSTRAINT unique_chunk UNIQUE (file_id, chunk_num), \
                         FOREIGN KEY (file_id) REFERENCES {meta} (id) ON DELETE CASCADE ON UPDATE CASCADE\
                     );",
                ))?;
                transaction.commit()?;
                debug!("created virtual file system schema at version {}", CURRENT_VERSION);
                meta
            }
            Availability::Missing => return Err(FileSystemError::NoFileSystem),
            Availability::Error(error) => return Err(error.into()),
        };

        let version = meta.version();
        let queries = Queries::new(&meta);
        for sql in queries.precompiled() {
            database
                .borrow()
                .prepare_cached(sql)
                .map_err(|error| FileSystemError::InvalidBaseCommand(sql.to_string(), error))?;
        }

        debug!("virtual file system ready at schema version {}", version);
        Ok(FileSystem { database, meta, queries })
    }

    /// The effective per-chunk byte size for a `Create` of a file of
    /// `file_size` bytes, given the caller's `proposed_chunk_size`.
    ///
    /// A non-positive or over-large proposal falls back to `file_size`
    /// itself (one chunk covers the whole file); the result is always
    /// capped `MAX_BLOB_MARGIN` bytes below the backend's own BLOB size
    /// limit, so row overhead never pushes an insert over that limit.
    fn effective_chunk_size(&self, file_size: usize, proposed_chunk_size: i64) -> usize {
        let chunk_size = if proposed_chunk_size <= 0 || proposed_chunk_size as usize > file_size {
            file_size
        } else {
            proposed_chunk_size as usize
        };

        let max_blob_length = i64::from(self.database.borrow().max_blob_length());
        let cap = (max_blob_length - MAX_BLOB_MARGIN).max(0) as usize;
        chunk_size.min(cap)
    }

    fn create_internal<W>(
        &mut self,
        path: &str,
        file_size: usize,
        proposed_chunk_size: i64,
        writer: W,
    ) -> Result<FileHandle, CreationError>
    where
        W: FnOnce(&ChunkInserter, usize) -> Result<(), CreationError>,
    {
        let canonical = Path::parse(path).absolute(None);
        let chunk_size = self.effective_chunk_size(file_size, proposed_chunk_size);
        trace!("creating '{}' ({} bytes, chunk size {})", canonical, file_size, chunk_size);

        let meta_table = self.queries.meta_table.clone();
        let data_table = self.queries.data_table;
        let transaction = self.database.borrow_mut().transaction()?;

        let file_id = {
            let mut statement = transaction.prepare_insert(&meta_table, &["path", "type", "chunk_size"])?;
            let result = statement.execute(&[
                (":path", &canonical as &dyn ToSql),
                (":type", &FileKind::TYPE_ID),
                (":chunk_size", &(chunk_size as i64)),
            ]);
            match result {
                Ok(_) => transaction.last_insert_rowid(),
                Err(error) if is_constraint_violation(&error) => return Err(CreationError::FileExists),
                Err(error) => return Err(error.into()),
            }
        };

        let inserter = ChunkInserter {
            transaction: &transaction,
            data_table,
            file_id,
        };
        writer(&inserter, chunk_size)?;

        transaction.commit()?;
        debug!("created '{}' as handle {}", canonical, file_id);
        Ok(FileHandle::new(file_id))
    }

    /// Creates a file from an already in-memory blob.
    pub fn create<T: AsRef<str>>(
        &mut self,
        path: T,
        data: OwnedBlob,
        proposed_chunk_size: i64,
    ) -> Result<FileHandle, CreationError> {
        let file_size = data.len();
        self.create_internal(path.as_ref(), file_size, proposed_chunk_size, |inserter, chunk_size| {
            write_owned_blob(inserter, chunk_size, &data)
        })
    }

    /// Creates a file by pulling bytes from a producer. `source` is invoked
    /// with the number of bytes currently required; an empty blob before
    /// `file_size` bytes have been produced aborts the creation with
    /// [`CreationError::ReadingError`].
    pub fn create_from_source<T, F>(
        &mut self,
        path: T,
        file_size: usize,
        proposed_chunk_size: i64,
        mut source: F,
    ) -> Result<FileHandle, CreationError>
    where
        T: AsRef<str>,
        F: FnMut(usize) -> OwnedBlob,
    {
        self.create_internal(path.as_ref(), file_size, proposed_chunk_size, move |inserter, chunk_size| {
            write_from_source(inserter, chunk_size, file_size, &mut source)
        })
    }

    /// Creates a file by streaming an existing host file into the store.
    pub fn create_from_host_file<T: AsRef<str>, P: AsRef<StdPath>>(
        &mut self,
        path: T,
        host_path: P,
        proposed_chunk_size: i64,
    ) -> Result<FileHandle, CreationError> {
        let mut file = HostFile::open(host_path.as_ref()).map_err(|_| CreationError::FileNotFound)?;
        let file_size = file.metadata().map_err(|_| CreationError::FileNotFound)?.len() as usize;

        self.create_internal(path.as_ref(), file_size, proposed_chunk_size, move |inserter, chunk_size| {
            write_from_source(inserter, chunk_size, file_size, |required| {
                let mut buffer = vec![0u8; required];
                match file.read_exact(&mut buffer) {
                    Ok(()) => OwnedBlob::from_vec(buffer),
                    Err(_) => OwnedBlob::empty(),
                }
            })
        })
    }

    /// Resolves `path` to a file handle.
    pub fn open<T: AsRef<str>>(&self, path: T) -> Result<FileHandle, LoadingError> {
        let canonical = Path::parse(path.as_ref()).absolute(None);
        let mut statement = self.database.borrow().prepare_cached(&self.queries.handle_by_path)?;
        let id: Option<i64> = statement
            .query_row(&[(":path", &canonical as &dyn ToSql), (":type", &FileKind::TYPE_ID)], |row| row.get(0))
            .optional()?;
        id.map(FileHandle::new).ok_or(LoadingError::FileNotFound)
    }

    /// The total byte length of `handle`, or `None` if it no longer exists.
    pub fn size(&self, handle: FileHandle) -> Result<Option<usize>, DatabaseError> {
        let mut statement = self
            .database
            .borrow()
            .prepare_cached(&self.queries.file_size)
            .map_err(to_database_error)?;
        statement
            .query_row(&[(":handle", &handle.id() as &dyn ToSql)], |row| {
                let raw: i64 = row.get(0)?;
                Ok(if raw >= 0 { Some(raw as usize) } else { None })
            })
            .map_err(to_database_error)
    }

    /// Lists files whose canonical path matches `glob` (SQL `GLOB` syntax,
    /// e.g. `folder/*`). `None` matches every file.
    pub fn find<T: AsRef<str>>(&self, glob: Option<T>) -> Result<Vec<Path>, DatabaseError> {
        let owned;
        let pattern: &str = match &glob {
            Some(value) => value.as_ref(),
            None => {
                owned = "*".to_string();
                &owned
            }
        };

        let mut statement = self
            .database
            .borrow()
            .prepare_cached(&self.queries.glob_paths)
            .map_err(to_database_error)?;
        let rows = statement
            .query_map(&[(":glob", &pattern as &dyn ToSql), (":type", &FileKind::TYPE_ID)], |row| {
                row.get::<_, String>(0)
            })
            .map_err(to_database_error)?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(Path::parse(row.map_err(to_database_error)?));
        }
        Ok(paths)
    }

    /// Deletes `handle`'s data and meta rows. Returns whether a row was
    /// actually removed (a repeated delete of the same handle returns
    /// `false`, not an error).
    pub fn delete(&mut self, handle: FileHandle) -> Result<bool, DatabaseError> {
        let transaction = self.database.borrow_mut().transaction().map_err(to_database_error)?;
        {
            let mut delete_data = transaction
                .prepare_cached(&self.queries.delete_data)
                .map_err(to_database_error)?;
            delete_data
                .execute(&[(":handle", &handle.id() as &dyn ToSql)])
                .map_err(to_database_error)?;
        }
        let affected = {
            let mut delete_meta = transaction
                .prepare_cached(&self.queries.delete_meta)
                .map_err(to_database_error)?;
            delete_meta
                .execute(&[(":handle", &handle.id() as &dyn ToSql)])
                .map_err(to_database_error)?
        };
        transaction.commit().map_err(to_database_error)?;
        debug!("deleted handle {} ({} meta row(s) removed)", handle.id(), affected);
        Ok(affected == 1)
    }

    fn chunk_ids_for_range(&self, handle: FileHandle, start: i64, length: i64) -> Result<(Vec<i64>, usize), ReadError> {
        let mut statement = self.database.borrow().prepare_cached(&self.queries.chunks_in_range)?;
        let mut rows = statement.query(&[
            (":handle", &handle.id() as &dyn ToSql),
            (":index", &start),
            (":size", &length),
        ])?;

        let mut chunk_ids = Vec::new();
        let mut first_chunk: Option<(i64, i64)> = None;
        while let Some(row) = rows.next()? {
            let chunk_id: i64 = row.get(0)?;
            if first_chunk.is_none() {
                let chunk_num: i64 = row.get(1)?;
                let chunk_size: i64 = row.get(2)?;
                first_chunk = Some((chunk_num, chunk_size));
            }
            chunk_ids.push(chunk_id);
        }

        let start_offset = match first_chunk {
            Some((chunk_num, chunk_size)) => {
                usize::try_from(start - chunk_num * chunk_size).map_err(|_| ReadError::OutOfBounds)?
            }
            None => 0,
        };
        Ok((chunk_ids, start_offset))
    }

    /// Reads `length` bytes starting at `start` into a freshly allocated buffer.
    pub fn read(&self, handle: FileHandle, start: usize, length: usize) -> Result<OwnedBlob, ReadError> {
        if length == 0 {
            return Ok(OwnedBlob::empty());
        }
        let start_i = i64::try_from(start).map_err(|_| ReadError::FileSystemLimits)?;
        let length_i = i64::try_from(length).map_err(|_| ReadError::FileSystemLimits)?;

        let (chunk_ids, start_offset) = self.chunk_ids_for_range(handle, start_i, length_i)?;
        let connection = self.database.borrow();
        let source = DataBlobSource::new(connection, self.queries.data_table);
        Ok(ContinuousReader::read(&source, &chunk_ids, start_offset, length)?)
    }

    /// Reads `length` bytes starting at `start`, pushing each chunk to
    /// `callback` as soon as it is assembled. `callback` may return `false`
    /// to abort the traversal early — that is a control signal, not an error.
    pub fn read_with_callback<F: FnMut(OwnedBlob) -> bool>(
        &self,
        handle: FileHandle,
        start: usize,
        length: usize,
        mut callback: F,
    ) -> Result<(), ReadError> {
        if length == 0 {
            return Ok(());
        }
        let start_i = i64::try_from(start).map_err(|_| ReadError::FileSystemLimits)?;
        let length_i = i64::try_from(length).map_err(|_| ReadError::FileSystemLimits)?;

        let (chunk_ids, start_offset) = self.chunk_ids_for_range(handle, start_i, length_i)?;
        let connection = self.database.borrow();
        let source = DataBlobSource::new(connection, self.queries.data_table);
        Ok(CallbackReader::read(&source, &chunk_ids, start_offset, length, &mut callback)?)
    }

    /// Reads `length` bytes starting at `start` into a host file, truncating
    /// it first unless `append` is set.
    pub fn read_to_host_file<P: AsRef<StdPath>>(
        &self,
        handle: FileHandle,
        host_path: P,
        start: usize,
        length: usize,
        append: bool,
    ) -> Result<(), ReadError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(!append)
            .append(append)
            .open(host_path)
            .map_err(|_| ReadError::FileCreationFailed)?;

        if length == 0 {
            return Ok(());
        }

        let mut write_failed = false;
        self.read_with_callback(handle, start, length, |chunk| match file.write_all(chunk.as_slice()) {
            Ok(()) => true,
            Err(_) => {
                write_failed = true;
                false
            }
        })?;

        if write_failed {
            Err(ReadError::WritingError)
        } else {
            Ok(())
        }
    }
}
