//! Persisted monotonic identifier allocation
//!
//! `{channel}.seq` holds the next identifier and the index entry width the
//! channel was created with, as decimal text: `"{next} {width}"`. A counter
//! file holding only `"{next}"` is accepted and rewritten with the width.
//!
//! Allocation persists the advanced counter (write temporary file, rename
//! over the counter file) before the identifier is handed out, so a crash may
//! skip an identifier but never hands the same one out twice.
//!
//! At open the counter is recovered as
//! `max(counter file, last index entry + 1, 1)`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::errors::{ChannelError, ChannelResult};

/// First identifier of a fresh channel.
pub const FIRST_IDENTIFIER: u64 = 1;

/// Counter file contents as found on disk, before index recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StoredCounter {
    next: u64,
    width: Option<usize>,
}

/// Monotonic identifier counter for one channel.
#[derive(Debug)]
pub struct IdentifierSequence {
    path: PathBuf,
    next: u64,
    width: usize,
    stored: Option<StoredCounter>,
}

impl IdentifierSequence {
    /// Open (or create) the counter at `path`.
    ///
    /// `last_indexed` is the newest identifier found in the index log; the
    /// counter never resumes at or below it.
    pub fn open(path: &Path, width: usize, last_indexed: Option<u64>) -> ChannelResult<Self> {
        Self::load(path, width)?.recover(last_indexed)
    }

    /// Read the counter file without writing anything.
    ///
    /// Fails with a configuration error if the file records a different
    /// index entry width: the index log must not be opened in that case.
    pub fn load(path: &Path, width: usize) -> ChannelResult<Self> {
        let stored = Self::read_stored(path)?;

        if let Some(recorded) = stored.and_then(|s| s.width) {
            if recorded != width {
                return Err(ChannelError::config_error(format!(
                    "Index entry width is {} but {} was written with {}",
                    width,
                    path.display(),
                    recorded
                )));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            next: stored.map_or(FIRST_IDENTIFIER, |s| s.next),
            width,
            stored,
        })
    }

    /// Advance past `last_indexed` and persist the counter if it changed.
    pub fn recover(mut self, last_indexed: Option<u64>) -> ChannelResult<Self> {
        let from_index = match last_indexed {
            Some(id) => id
                .checked_add(1)
                .ok_or_else(|| ChannelError::counter_exhausted(id))?,
            None => FIRST_IDENTIFIER,
        };
        self.next = self.next.max(from_index);

        let current = StoredCounter {
            next: self.next,
            width: Some(self.width),
        };
        if self.stored != Some(current) {
            self.persist(self.next)?;
            self.stored = Some(current);
        }
        Ok(self)
    }

    fn read_stored(path: &Path) -> ChannelResult<Option<StoredCounter>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ChannelError::read_failed(
                    format!("Failed to read identifier counter: {}", path.display()),
                    e,
                ))
            }
        };

        let corrupt = || {
            ChannelError::data_corruption(format!(
                "Identifier counter is not `next [width]` in decimal: {}",
                path.display()
            ))
        };

        let mut fields = text.split_whitespace();
        let next = fields
            .next()
            .and_then(|f| f.parse::<u64>().ok())
            .ok_or_else(corrupt)?;
        let width = match fields.next() {
            Some(f) => Some(f.parse::<usize>().map_err(|_| corrupt())?),
            None => None,
        };
        if fields.next().is_some() {
            return Err(corrupt());
        }

        Ok(Some(StoredCounter { next, width }))
    }

    /// Index entry width recorded alongside the counter.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The identifier the next allocation will return.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Allocate the next identifier, persisting the advanced counter first.
    pub fn allocate(&mut self) -> ChannelResult<u64> {
        let id = self.next;
        let advanced = id
            .checked_add(1)
            .ok_or_else(|| ChannelError::counter_exhausted(id))?;
        self.persist(advanced)?;
        self.next = advanced;
        Ok(id)
    }

    fn persist(&self, value: u64) -> ChannelResult<()> {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, format!("{} {}", value, self.width)).map_err(|e| {
            ChannelError::write_failed(
                format!("Failed to write identifier counter: {}", staging.display()),
                e,
            )
        })?;
        fs::rename(&staging, &self.path).map_err(|e| {
            ChannelError::write_failed(
                format!("Failed to install identifier counter: {}", self.path.display()),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_sequence_starts_at_one() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.seq");
        let mut seq = IdentifierSequence::open(&path, 17, None).unwrap();
        assert_eq!(seq.allocate().unwrap(), 1);
        assert_eq!(seq.allocate().unwrap(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "3 17");
    }

    #[test]
    fn test_counter_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.seq");
        {
            let mut seq = IdentifierSequence::open(&path, 17, None).unwrap();
            seq.allocate().unwrap();
            seq.allocate().unwrap();
        }
        let mut seq = IdentifierSequence::open(&path, 17, Some(2)).unwrap();
        assert_eq!(seq.allocate().unwrap(), 3);
    }

    #[test]
    fn test_index_ahead_of_counter_wins() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.seq");
        fs::write(&path, "4").unwrap();
        let seq = IdentifierSequence::open(&path, 17, Some(10)).unwrap();
        assert_eq!(seq.peek(), 11);
        assert_eq!(fs::read_to_string(&path).unwrap(), "11 17");
    }

    #[test]
    fn test_burned_identifiers_are_not_reused() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.seq");
        fs::write(&path, "8").unwrap();
        let seq = IdentifierSequence::open(&path, 17, Some(5)).unwrap();
        assert_eq!(seq.peek(), 8);
    }

    #[test]
    fn test_corrupt_counter_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.seq");
        fs::write(&path, "not-a-number").unwrap();
        let err = IdentifierSequence::open(&path, 17, None).unwrap_err();
        assert_eq!(err.code().code(), "MRKV_DATA_CORRUPTION");
    }

    #[test]
    fn test_bare_counter_gains_width() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.seq");
        fs::write(&path, "8").unwrap();
        let seq = IdentifierSequence::open(&path, 17, Some(5)).unwrap();
        assert_eq!(seq.peek(), 8);
        assert_eq!(fs::read_to_string(&path).unwrap(), "8 17");
    }

    #[test]
    fn test_width_mismatch_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.seq");
        fs::write(&path, "4 17").unwrap();

        let err = IdentifierSequence::load(&path, 10).unwrap_err();
        assert_eq!(err.code().code(), "MRKV_CONFIG_ERROR");
        assert_eq!(fs::read_to_string(&path).unwrap(), "4 17");
    }

    #[test]
    fn test_trailing_garbage_is_corruption() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.seq");
        fs::write(&path, "4 17 9").unwrap();
        let err = IdentifierSequence::open(&path, 17, None).unwrap_err();
        assert_eq!(err.code().code(), "MRKV_DATA_CORRUPTION");
    }
}
