//! Wires SQLite's incremental blob I/O API into [`crate::range_reader`].

use rusqlite::{blob::Blob, Connection, DatabaseName};

use crate::range_reader::{ChunkBlob, ChunkSource};

impl<'conn> ChunkBlob for Blob<'conn> {
    fn size(&self) -> usize {
        Blob::size(self) as usize
    }

    fn read_into(&mut self, dest: &mut [u8], offset: usize) -> rusqlite::Result<()> {
        self.read_at_exact(dest, offset)
    }
}

/// Opens chunk blobs from `Matryoshka_Data.data`, one `chunk_id` at a time.
pub struct DataBlobSource<'conn> {
    connection: &'conn Connection,
    data_table: &'conn str,
}

impl<'conn> DataBlobSource<'conn> {
    /// Builds a source reading blobs from `data_table`'s `data` column.
    pub fn new(connection: &'conn Connection, data_table: &'conn str) -> Self {
        DataBlobSource { connection, data_table }
    }
}

impl<'conn> ChunkSource for DataBlobSource<'conn> {
    fn open(&self, chunk_id: i64) -> rusqlite::Result<Box<dyn ChunkBlob + '_>> {
        let blob = self
            .connection
            .blob_open(DatabaseName::Main, self.data_table, "data", chunk_id, true)?;
        Ok(Box::new(blob))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_whole_and_partial_chunk() {
        let connection = Connection::open_in_memory().expect("in-memory database");
        connection
            .execute_batch("CREATE TABLE Matryoshka_Data (chunk_id INTEGER PRIMARY KEY, data BLOB NOT NULL)")
            .expect("create table");
        connection
            .execute(
                "INSERT INTO Matryoshka_Data (data) VALUES (?)",
                [vec![1u8, 2, 3, 4, 5]],
            )
            .expect("insert chunk");

        let source = DataBlobSource::new(&connection, "Matryoshka_Data");
        let mut blob = source.open(1).expect("open blob");
        assert_eq!(blob.size(), 5);

        let mut buffer = [0u8; 3];
        blob.read_into(&mut buffer, 1).expect("read");
        assert_eq!(buffer, [2, 3, 4]);
    }
}
