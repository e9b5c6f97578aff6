//! Ordered, chunk-by-chunk traversal of a file's blobs for a byte range.
//!
//! Both read shapes — filling one contiguous buffer and streaming chunks
//! through a callback — share the same stepping algorithm: only what happens
//! to each visited chunk differs.

use crate::blob::OwnedBlob;

/// A single already-located chunk a range read can pull bytes from.
pub trait ChunkBlob {
    /// Size of the chunk in bytes.
    fn size(&self) -> usize;

    /// Reads `dest.len()` bytes starting at `offset` into `dest`.
    fn read_into(&mut self, dest: &mut [u8], offset: usize) -> rusqlite::Result<()>;
}

/// Opens chunks by their row id, in whatever order the caller requests.
pub trait ChunkSource {
    /// Opens the chunk with the given `chunk_id`.
    fn open(&self, chunk_id: i64) -> rusqlite::Result<Box<dyn ChunkBlob + '_>>;
}

/// Failure modes shared by both read shapes.
#[derive(Debug)]
pub enum RangeReaderError {
    /// The requested range lies (partially) past the end of the file, or no
    /// chunks were supplied at all.
    OutOfBounds,
    /// Opening or reading a chunk failed at the backend.
    Database(rusqlite::Error),
}

impl From<rusqlite::Error> for RangeReaderError {
    fn from(error: rusqlite::Error) -> Self {
        RangeReaderError::Database(error)
    }
}

enum ControlFlow {
    Continue,
    Abort,
}

trait HandleBlob {
    fn handle(
        &mut self,
        blob: &mut dyn ChunkBlob,
        blob_offset: usize,
        bytes_read: usize,
        num_bytes: usize,
    ) -> Result<ControlFlow, RangeReaderError>;
}

/// Walks `chunk_ids` in order, handing each visited chunk to `handler` until
/// `length` bytes have been read, the handler aborts, or bounds are violated.
///
/// `start_offset` is the byte offset into the *first* chunk only; every
/// subsequent chunk is read from its own beginning.
fn drive<H: HandleBlob>(
    source: &dyn ChunkSource,
    chunk_ids: &[i64],
    start_offset: usize,
    length: usize,
    handler: &mut H,
) -> Result<(), RangeReaderError> {
    if chunk_ids.is_empty() || length == 0 {
        return Err(RangeReaderError::OutOfBounds);
    }

    let mut bytes_read = 0usize;
    for (index, &chunk_id) in chunk_ids.iter().enumerate() {
        if bytes_read == length {
            break;
        }

        let mut blob = source.open(chunk_id)?;
        let blob_offset = if index == 0 { start_offset } else { 0 };
        let blob_size = blob.size();

        if blob_offset > blob_size {
            return Err(RangeReaderError::OutOfBounds);
        }

        let available = blob_size - blob_offset;
        let num_bytes = available.min(length - bytes_read);
        if index == 0 && num_bytes == 0 {
            return Err(RangeReaderError::OutOfBounds);
        }

        match handler.handle(blob.as_mut(), blob_offset, bytes_read, num_bytes)? {
            ControlFlow::Continue => {}
            ControlFlow::Abort => return Ok(()),
        }
        bytes_read += num_bytes;
    }

    if bytes_read == length {
        Ok(())
    } else {
        Err(RangeReaderError::OutOfBounds)
    }
}

/// Fills one exact-length buffer from a contiguous byte range.
pub struct ContinuousReader {
    data: OwnedBlob,
}

impl ContinuousReader {
    /// Reads exactly `length` bytes starting at `start_offset` into a freshly
    /// allocated buffer.
    pub fn read(
        source: &dyn ChunkSource,
        chunk_ids: &[i64],
        start_offset: usize,
        length: usize,
    ) -> Result<OwnedBlob, RangeReaderError> {
        let mut reader = ContinuousReader {
            data: OwnedBlob::filled(length, 0),
        };
        drive(source, chunk_ids, start_offset, length, &mut reader)?;
        Ok(reader.data)
    }
}

impl HandleBlob for ContinuousReader {
    fn handle(
        &mut self,
        blob: &mut dyn ChunkBlob,
        blob_offset: usize,
        bytes_read: usize,
        num_bytes: usize,
    ) -> Result<ControlFlow, RangeReaderError> {
        let dest = &mut self.data.as_mut_slice()[bytes_read..bytes_read + num_bytes];
        blob.read_into(dest, blob_offset)?;
        Ok(ControlFlow::Continue)
    }
}

/// Streams chunks through a callback, which may abort the traversal early by
/// returning `false`. Aborting is a control signal, not an error.
pub struct CallbackReader<'a> {
    callback: &'a mut dyn FnMut(OwnedBlob) -> bool,
}

impl<'a> CallbackReader<'a> {
    /// Reads `length` bytes starting at `start_offset`, pushing each
    /// individual chunk to `callback` as soon as it is assembled.
    pub fn read(
        source: &dyn ChunkSource,
        chunk_ids: &[i64],
        start_offset: usize,
        length: usize,
        callback: &'a mut dyn FnMut(OwnedBlob) -> bool,
    ) -> Result<(), RangeReaderError> {
        let mut reader = CallbackReader { callback };
        drive(source, chunk_ids, start_offset, length, &mut reader)
    }
}

impl<'a> HandleBlob for CallbackReader<'a> {
    fn handle(
        &mut self,
        blob: &mut dyn ChunkBlob,
        blob_offset: usize,
        _bytes_read: usize,
        num_bytes: usize,
    ) -> Result<ControlFlow, RangeReaderError> {
        let mut chunk = OwnedBlob::filled(num_bytes, 0);
        blob.read_into(chunk.as_mut_slice(), blob_offset)?;
        if (self.callback)(chunk) {
            Ok(ControlFlow::Continue)
        } else {
            Ok(ControlFlow::Abort)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MemoryBlob(Vec<u8>);

    impl ChunkBlob for MemoryBlob {
        fn size(&self) -> usize {
            self.0.len()
        }

        fn read_into(&mut self, dest: &mut [u8], offset: usize) -> rusqlite::Result<()> {
            dest.copy_from_slice(&self.0[offset..offset + dest.len()]);
            Ok(())
        }
    }

    struct MemorySource(Vec<Vec<u8>>);

    impl ChunkSource for MemorySource {
        fn open(&self, chunk_id: i64) -> rusqlite::Result<Box<dyn ChunkBlob + '_>> {
            Ok(Box::new(MemoryBlob(self.0[chunk_id as usize].clone())))
        }
    }

    fn source() -> MemorySource {
        MemorySource(vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9, 10, 11]])
    }

    #[test]
    fn test_contiguous_single_chunk() {
        let source = source();
        let data = ContinuousReader::read(&source, &[0], 1, 2).expect("read");
        assert_eq!(data.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_contiguous_spans_multiple_chunks() {
        let source = source();
        let data = ContinuousReader::read(&source, &[0, 1, 2], 2, 8).expect("read");
        assert_eq!(data.as_slice(), &[2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_out_of_bounds_when_first_chunk_too_short() {
        let source = source();
        let error = ContinuousReader::read(&source, &[0], 4, 1).unwrap_err();
        assert!(matches!(error, RangeReaderError::OutOfBounds));
    }

    #[test]
    fn test_out_of_bounds_when_chunks_run_out() {
        let source = source();
        let error = ContinuousReader::read(&source, &[0, 1], 0, 20).unwrap_err();
        assert!(matches!(error, RangeReaderError::OutOfBounds));
    }

    #[test]
    fn test_out_of_bounds_with_no_chunks() {
        let source = source();
        let error = ContinuousReader::read(&source, &[], 0, 1).unwrap_err();
        assert!(matches!(error, RangeReaderError::OutOfBounds));
    }

    #[test]
    fn test_callback_receives_chunk_boundaries() {
        let source = source();
        let mut seen = Vec::new();
        let mut callback = |chunk: OwnedBlob| {
            seen.push(chunk.as_slice().to_vec());
            true
        };
        CallbackReader::read(&source, &[0, 1, 2], 2, 8, &mut callback).expect("read");
        assert_eq!(seen, vec![vec![2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
    }

    #[test]
    fn test_callback_abort_stops_early_without_error() {
        let source = source();
        let mut calls = 0;
        let mut callback = |_chunk: OwnedBlob| {
            calls += 1;
            false
        };
        CallbackReader::read(&source, &[0, 1, 2], 0, 12, &mut callback).expect("abort is not an error");
        assert_eq!(calls, 1);
    }
}
