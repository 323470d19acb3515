//! Append-only index log
//!
//! The index log records insertion order: one fixed-width entry per created
//! record, holding the record identifier as zero-padded decimal text.
//!
//! ```text
//! 00000000000000001 00000000000000002 00000000000000003 ...
//! |<-- index_size -->|
//! ```
//!
//! (Entries are stored back to back with no separator.)
//!
//! # Invariants
//!
//! - Append-only: no rotation, no compaction, no rewrite
//! - File length is always an exact multiple of the entry width
//! - Reading backward in entry-width strides yields identifiers in reverse
//!   insertion order
//!
//! A torn trailing entry left by a crash mid-append is truncated at open.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::errors::{ChannelError, ChannelResult};
use crate::observability::{log_event_with_fields, Event};

/// Default index entry width in bytes.
pub const DEFAULT_INDEX_SIZE: usize = 17;

/// Encode an identifier into a fixed-width entry.
pub fn encode_entry(id: u64, width: usize) -> ChannelResult<Vec<u8>> {
    let entry = format!("{:0width$}", id, width = width);
    if entry.len() != width {
        return Err(ChannelError::identifier_overflow(id, width));
    }
    Ok(entry.into_bytes())
}

/// Decode a fixed-width entry read at `offset` (absolute byte offset).
pub fn decode_entry(bytes: &[u8], offset: u64) -> ChannelResult<u64> {
    std::str::from_utf8(bytes)
        .ok()
        .filter(|text| !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|text| text.parse::<u64>().ok())
        .ok_or_else(|| {
            ChannelError::corruption_at_offset(offset, "Index entry is not a decimal identifier")
        })
}

/// Writer side of a channel's index log.
#[derive(Debug)]
pub struct IndexLog {
    path: PathBuf,
    width: usize,
    file: File,
    len: u64,
}

impl IndexLog {
    /// Open the index log at `path`, creating an empty one if absent.
    ///
    /// Idempotent: opening an existing log never modifies complete entries.
    pub fn open(path: &Path, width: usize) -> ChannelResult<Self> {
        if width == 0 {
            return Err(ChannelError::invalid_input("Index entry width must be > 0"));
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                ChannelError::write_failed(
                    format!("Failed to open index log: {}", path.display()),
                    e,
                )
            })?;

        let mut len = file
            .metadata()
            .map_err(|e| ChannelError::read_failed("Failed to read index log metadata", e))?
            .len();

        let torn = len % width as u64;
        if torn != 0 {
            len -= torn;
            file.set_len(len).map_err(|e| {
                ChannelError::write_failed("Failed to truncate torn index entry", e)
            })?;
            log_event_with_fields(
                Event::IndexTailTruncated,
                &[
                    ("path", &path.display().to_string()),
                    ("truncated_bytes", &torn.to_string()),
                ],
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            width,
            file,
            len,
        })
    }

    /// Returns the index log path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the fixed entry width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Length of the log in bytes.
    pub fn len_bytes(&self) -> u64 {
        self.len
    }

    /// Number of entries in the log.
    pub fn entry_count(&self) -> u64 {
        self.len / self.width as u64
    }

    /// Whether the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append one identifier with a single unbuffered write.
    pub fn append(&mut self, id: u64) -> ChannelResult<()> {
        let entry = encode_entry(id, self.width)?;
        self.file.write_all(&entry).map_err(|e| {
            ChannelError::write_failed(format!("Failed to append identifier {} to index", id), e)
        })?;
        self.len += entry.len() as u64;
        Ok(())
    }

    /// Open a positional reader over the current contents of the log.
    pub fn reader(&self) -> ChannelResult<IndexReader> {
        IndexReader::open(&self.path, self.width, self.len)
    }

    /// Raw bytes of the entry that starts `offset_from_end` bytes before the end.
    pub fn read_backward(&self, offset_from_end: u64) -> ChannelResult<Vec<u8>> {
        self.reader()?.read_backward(offset_from_end)
    }

    /// The most recently appended identifier, if any.
    pub fn last_identifier(&self) -> ChannelResult<Option<u64>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.reader()?
            .identifier_at_back(self.width as u64)
            .map(Some)
    }
}

/// Positional reader over a snapshot of the index log length.
#[derive(Debug)]
pub struct IndexReader {
    file: File,
    width: usize,
    len: u64,
}

impl IndexReader {
    fn open(path: &Path, width: usize, len: u64) -> ChannelResult<Self> {
        let file = File::open(path).map_err(|e| {
            ChannelError::read_failed(format!("Failed to open index log: {}", path.display()), e)
        })?;
        Ok(Self { file, width, len })
    }

    /// Length of the log in bytes when the reader was opened.
    pub fn len_bytes(&self) -> u64 {
        self.len
    }

    /// Fixed entry width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Read the `width`-byte entry that starts `offset_from_end` bytes before the end.
    ///
    /// `offset_from_end` must be a positive multiple of the width and no
    /// larger than the log.
    pub fn read_backward(&mut self, offset_from_end: u64) -> ChannelResult<Vec<u8>> {
        let width = self.width as u64;
        if offset_from_end == 0 || offset_from_end > self.len || offset_from_end % width != 0 {
            return Err(ChannelError::invalid_input(format!(
                "Backward offset {} is outside an index log of {} bytes",
                offset_from_end, self.len
            )));
        }

        let position = self.len - offset_from_end;
        self.file
            .seek(SeekFrom::Start(position))
            .map_err(|e| ChannelError::read_failed("Failed to seek index log", e))?;

        let mut entry = vec![0u8; self.width];
        self.file.read_exact(&mut entry).map_err(|e| {
            ChannelError::read_failed(format!("Failed to read index entry at {}", position), e)
        })?;
        Ok(entry)
    }

    /// Read and decode the identifier `offset_from_end` bytes before the end.
    pub fn identifier_at_back(&mut self, offset_from_end: u64) -> ChannelResult<u64> {
        let entry = self.read_backward(offset_from_end)?;
        decode_entry(&entry, self.len - offset_from_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_encode_entry_zero_padded() {
        assert_eq!(encode_entry(42, 17).unwrap(), b"00000000000000042".to_vec());
    }

    #[test]
    fn test_encode_entry_overflow() {
        let err = encode_entry(123_456, 4).unwrap_err();
        assert_eq!(err.code().code(), "MRKV_IDENTIFIER_OVERFLOW");
    }

    #[test]
    fn test_decode_entry_rejects_garbage() {
        assert_eq!(decode_entry(b"0007", 0).unwrap(), 7);
        assert!(decode_entry(b"00x7", 0).is_err());
        assert!(decode_entry(b"  7", 0).is_err());
    }

    #[test]
    fn test_open_creates_empty_log() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.mrkv");
        let log = IndexLog::open(&path, 17).unwrap();
        assert!(path.is_file());
        assert!(log.is_empty());
        assert_eq!(log.last_identifier().unwrap(), None);
    }

    #[test]
    fn test_append_and_read_backward() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.mrkv");
        let mut log = IndexLog::open(&path, 4).unwrap();
        for id in 1..=3 {
            log.append(id).unwrap();
        }

        assert_eq!(log.len_bytes(), 12);
        assert_eq!(log.entry_count(), 3);
        assert_eq!(fs::read(&path).unwrap(), b"000100020003".to_vec());

        let mut reader = log.reader().unwrap();
        assert_eq!(reader.identifier_at_back(4).unwrap(), 3);
        assert_eq!(reader.identifier_at_back(8).unwrap(), 2);
        assert_eq!(reader.identifier_at_back(12).unwrap(), 1);
        assert_eq!(log.read_backward(12).unwrap(), b"0001".to_vec());
    }

    #[test]
    fn test_read_backward_out_of_range() {
        let temp = TempDir::new().unwrap();
        let mut log = IndexLog::open(&temp.path().join("chat.mrkv"), 4).unwrap();
        log.append(1).unwrap();

        let mut reader = log.reader().unwrap();
        assert!(reader.read_backward(0).is_err());
        assert!(reader.read_backward(8).is_err());
        assert!(reader.read_backward(3).is_err());
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.mrkv");
        {
            let mut log = IndexLog::open(&path, 4).unwrap();
            log.append(1).unwrap();
            log.append(2).unwrap();
        }
        let log = IndexLog::open(&path, 4).unwrap();
        assert_eq!(log.entry_count(), 2);
        assert_eq!(log.last_identifier().unwrap(), Some(2));
    }

    #[test]
    fn test_torn_tail_truncated_on_open() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.mrkv");
        fs::write(&path, b"0001000200").unwrap();

        let mut log = IndexLog::open(&path, 4).unwrap();
        assert_eq!(log.len_bytes(), 8);
        assert_eq!(fs::read(&path).unwrap().len(), 8);

        log.append(3).unwrap();
        assert_eq!(log.last_identifier().unwrap(), Some(3));
    }

    #[test]
    fn test_append_rejects_oversized_identifier() {
        let temp = TempDir::new().unwrap();
        let mut log = IndexLog::open(&temp.path().join("chat.mrkv"), 2).unwrap();
        assert!(log.append(100).is_err());
        assert!(log.is_empty());
    }
}
