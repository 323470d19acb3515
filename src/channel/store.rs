//! File-per-record storage
//!
//! Every record lives in its own file, `{channel}.{id}.mrkv`, inside the
//! channel directory. Paths are derived deterministically from the channel
//! name and identifier, so file existence is a valid cheap pre-check.
//!
//! Writes overwrite in place with no staging file and no fsync.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::codec::RecordCodec;
use super::envelope::Envelope;
use super::errors::{ChannelError, ChannelResult};

/// File extension shared by record files and the index log.
pub const FILE_EXTENSION: &str = "mrkv";

/// Record storage rooted at one channel directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    channel: String,
    directory: PathBuf,
}

impl RecordStore {
    /// Create a store for `channel` rooted at `directory`.
    pub fn new(channel: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            channel: channel.into(),
            directory: directory.into(),
        }
    }

    /// Returns the channel directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Canonical path of the record file for `id`.
    pub fn record_path(&self, id: u64) -> PathBuf {
        self.directory
            .join(format!("{}.{}.{}", self.channel, id, FILE_EXTENSION))
    }

    /// Whether a record file exists for `id`.
    pub fn exists(&self, id: u64) -> bool {
        self.record_path(id).is_file()
    }

    /// Encode and write `envelope`, overwriting any existing file.
    pub fn put(&self, envelope: &Envelope) -> ChannelResult<()> {
        let path = self.record_path(envelope.id);
        let encoded = RecordCodec::encode(envelope)?;
        fs::write(&path, encoded).map_err(|e| {
            ChannelError::write_failed(format!("Failed to write record: {}", path.display()), e)
        })
    }

    /// Read and decode the record for `id`, or `None` if no file exists.
    pub fn get(&self, id: u64) -> ChannelResult<Option<Envelope>> {
        let path = self.record_path(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ChannelError::read_failed(
                    format!("Failed to read record: {}", path.display()),
                    e,
                ))
            }
        };

        let envelope = RecordCodec::decode(&bytes)
            .map_err(|e| ChannelError::corruption_for_record(id, e.message().to_string()))?;

        if envelope.id != id {
            return Err(ChannelError::corruption_for_record(
                id,
                format!("Record file holds identifier {}", envelope.id),
            ));
        }

        Ok(Some(envelope))
    }

    /// Delete every file in the channel directory, then the directory itself.
    ///
    /// Returns the number of files removed.
    pub fn remove_all(&self) -> ChannelResult<usize> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(ChannelError::io_error(
                    format!("Failed to list channel directory: {}", self.directory.display()),
                    e,
                ))
            }
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| {
                ChannelError::io_error("Failed to read channel directory entry", e)
            })?;
            let path = entry.path();
            fs::remove_file(&path).map_err(|e| {
                ChannelError::write_failed(format!("Failed to remove: {}", path.display()), e)
            })?;
            removed += 1;
        }

        fs::remove_dir(&self.directory).map_err(|e| {
            ChannelError::write_failed(
                format!("Failed to remove channel directory: {}", self.directory.display()),
                e,
            )
        })?;

        Ok(removed)
    }
}
