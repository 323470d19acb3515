//! Channel: one named, independently rooted collection of records
//!
//! A channel owns its directory under the storage root:
//!
//! ```text
//! {root}/{name}/
//!   {name}.mrkv        index log
//!   {name}.seq         identifier counter and index entry width
//!   {name}.{id}.mrkv   one file per record
//! ```
//!
//! Every operation takes the channel's own lock, so identifier allocation,
//! record writes, index appends and cache refreshes never interleave within
//! one channel. Channels never share a lock.
//!
//! Absent and soft-deleted records are ordinary `Ok(None)` results; only
//! storage, input and lifecycle failures are errors.

use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use super::cache::RecordCache;
use super::envelope::Envelope;
use super::errors::{ChannelError, ChannelResult};
use super::index_log::{encode_entry, IndexLog, DEFAULT_INDEX_SIZE};
use super::recent::{clamp_count, scan_recent, DEFAULT_MAXIMUM_RECENT};
use super::sequence::IdentifierSequence;
use super::store::{RecordStore, FILE_EXTENSION};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// Per-channel tunables shared by every channel of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Upper bound on records returned by one recent call
    pub maximum_recent: usize,
    /// Fixed index entry width in bytes
    pub index_size: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            maximum_recent: DEFAULT_MAXIMUM_RECENT,
            index_size: DEFAULT_INDEX_SIZE,
        }
    }
}

/// Lower-case and validate a channel name.
///
/// Rejects names that would escape the channel directory or break the
/// `{channel}.{id}` file naming.
pub fn normalize_name(name: &str) -> ChannelResult<String> {
    let normalized = name.to_lowercase();

    if normalized.is_empty() {
        return Err(ChannelError::invalid_input("Channel name must not be empty"));
    }
    if normalized.contains(['/', '\\']) {
        return Err(ChannelError::invalid_input(format!(
            "Channel name must not contain path separators: {:?}",
            name
        )));
    }
    if normalized.chars().all(|c| c == '.') {
        return Err(ChannelError::invalid_input(format!(
            "Channel name must not be a relative path segment: {:?}",
            name
        )));
    }
    if normalized.chars().any(char::is_whitespace) {
        return Err(ChannelError::invalid_input(format!(
            "Channel name must not contain whitespace: {:?}",
            name
        )));
    }

    Ok(normalized)
}

/// Point-in-time counters of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    /// Index entries, one per record ever created (deleted ones included)
    pub entries: u64,
    /// The identifier the next create will receive
    pub next_id: u64,
}

/// Open files of a live channel. `None` in [`Channel`] once flushed.
#[derive(Debug)]
struct ChannelState {
    store: RecordStore,
    index: IndexLog,
    sequence: IdentifierSequence,
}

/// Handle to one open channel.
#[derive(Debug)]
pub struct Channel {
    name: String,
    directory: PathBuf,
    settings: ChannelSettings,
    cache: Arc<RecordCache>,
    metrics: Arc<MetricsRegistry>,
    state: Mutex<Option<ChannelState>>,
}

impl Channel {
    /// Open (or create on first use) the channel `name` under `root`.
    ///
    /// Idempotent across repeated opens. Fails with a configuration error if
    /// `root` is missing or not a directory.
    pub fn open(
        name: &str,
        root: &Path,
        settings: ChannelSettings,
        cache: Arc<RecordCache>,
        metrics: Arc<MetricsRegistry>,
    ) -> ChannelResult<Self> {
        let name = normalize_name(name)?;

        let metadata = fs::metadata(root).map_err(|e| {
            ChannelError::config_error(format!("Storage root is not accessible: {}", root.display()))
                .with_details(e.to_string())
        })?;
        if !metadata.is_dir() {
            return Err(ChannelError::config_error(format!(
                "Storage root is not a directory: {}",
                root.display()
            )));
        }

        let directory = root.join(&name);
        fs::create_dir_all(&directory).map_err(|e| {
            ChannelError::write_failed(
                format!("Failed to create channel directory: {}", directory.display()),
                e,
            )
        })?;

        // Width check precedes the index open, which truncates torn tails
        let sequence =
            IdentifierSequence::load(&directory.join(format!("{}.seq", name)), settings.index_size)?;
        let index = IndexLog::open(
            &directory.join(format!("{}.{}", name, FILE_EXTENSION)),
            settings.index_size,
        )?;
        let sequence = sequence.recover(index.last_identifier()?)?;
        let store = RecordStore::new(name.clone(), directory.clone());

        metrics.increment_channels_opened();
        log_event_with_fields(
            Event::ChannelOpened,
            &[
                ("channel", &name),
                ("entries", &index.entry_count().to_string()),
                ("next_id", &sequence.peek().to_string()),
            ],
        );

        Ok(Self {
            name,
            directory,
            settings,
            cache,
            metrics,
            state: Mutex::new(Some(ChannelState {
                store,
                index,
                sequence,
            })),
        })
    }

    /// Normalized channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel directory under the storage root.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn settings(&self) -> ChannelSettings {
        self.settings
    }

    /// Whether the handle has been flushed.
    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// The identifier the next create will receive.
    pub fn next_identifier(&self) -> ChannelResult<u64> {
        self.with_state(|state| Ok(state.sequence.peek()))
    }

    /// Index entry count and next identifier, read under the channel lock.
    pub fn stats(&self) -> ChannelResult<ChannelStats> {
        self.with_state(|state| {
            Ok(ChannelStats {
                entries: state.index.entry_count(),
                next_id: state.sequence.peek(),
            })
        })
    }

    /// Create a record holding `payload`.
    ///
    /// The record file is written before the identifier is appended to the
    /// index, so a failure in between leaves an unindexed record rather than
    /// an index entry pointing at nothing.
    pub fn create(&self, payload: Value) -> ChannelResult<Envelope> {
        self.with_state(|state| {
            // Reject identifiers wider than an index entry before touching disk
            encode_entry(state.sequence.peek(), state.index.width())?;

            let id = state.sequence.allocate()?;
            let envelope = Envelope::new(id, payload);
            state.store.put(&envelope)?;
            state.index.append(id)?;
            self.cache.set(&self.name, id, envelope.clone());

            self.metrics.increment_records_created();
            self.log_record(Event::RecordCreated, id);
            Ok(envelope)
        })
    }

    /// Fetch a record. Soft-deleted records are returned only when `force`.
    pub fn retrieve(&self, id: u64, force: bool) -> ChannelResult<Option<Envelope>> {
        self.with_state(|state| self.load(&state.store, id, force))
    }

    /// Merge `payload` into a visible record's data.
    ///
    /// Returns `None` (and writes nothing) if the record is absent or deleted.
    pub fn update(&self, id: u64, payload: Value) -> ChannelResult<Option<Envelope>> {
        self.with_state(|state| {
            let Some(mut envelope) = self.load(&state.store, id, false)? else {
                return Ok(None);
            };
            envelope.apply_update(payload);
            self.persist(state, &envelope)?;

            self.metrics.increment_records_updated();
            self.log_record(Event::RecordUpdated, id);
            Ok(Some(envelope))
        })
    }

    /// Soft-delete a record. A missing record is a no-op returning `None`.
    pub fn delete(&self, id: u64) -> ChannelResult<Option<Envelope>> {
        self.with_state(|state| {
            let Some(mut envelope) = self.load(&state.store, id, true)? else {
                return Ok(None);
            };
            envelope.mark_deleted();
            self.persist(state, &envelope)?;

            self.metrics.increment_records_deleted();
            self.log_record(Event::RecordDeleted, id);
            Ok(Some(envelope))
        })
    }

    /// Clear the soft-delete flag and set `was_restored`.
    ///
    /// Restoring a record that was never deleted still sets `was_restored`.
    pub fn restore(&self, id: u64) -> ChannelResult<Option<Envelope>> {
        self.with_state(|state| {
            let Some(mut envelope) = self.load(&state.store, id, true)? else {
                return Ok(None);
            };
            envelope.mark_restored();
            self.persist(state, &envelope)?;

            self.metrics.increment_records_restored();
            self.log_record(Event::RecordRestored, id);
            Ok(Some(envelope))
        })
    }

    /// Up to `count` most recent visible records, identifier descending.
    ///
    /// `count <= 0` is treated as 1; larger counts are capped at
    /// `maximum_recent`.
    pub fn recent(&self, count: i64) -> ChannelResult<Vec<Envelope>> {
        let count = clamp_count(count, self.settings.maximum_recent);

        self.with_state(|state| {
            let mut reader = state.index.reader()?;
            let store = &state.store;
            let scan = scan_recent(&mut reader, count, |id| self.load(store, id, false))?;

            self.metrics.record_recent_scan(scan.entries_scanned);
            log_event_with_fields(
                Event::RecentScanned,
                &[
                    ("channel", &self.name),
                    ("requested", &count.to_string()),
                    ("returned", &scan.records.len().to_string()),
                    ("scanned", &scan.entries_scanned.to_string()),
                ],
            );
            Ok(scan.records)
        })
    }

    /// [`Channel::recent`] with a textual count as received from a request.
    ///
    /// Empty input means 1. Non-numeric input fails with no partial result.
    pub fn recent_from_input(&self, input: &str) -> ChannelResult<Vec<Envelope>> {
        let input = input.trim();
        if input.is_empty() {
            return self.recent(1);
        }

        let count = input.parse::<i64>().map_err(|_| {
            ChannelError::invalid_input(format!("Recent count is not a number: {:?}", input))
        })?;
        self.recent(count)
    }

    /// Delete every record file, the index, the counter and the directory.
    ///
    /// Irrecoverable. The handle is closed afterwards; reopening the name
    /// yields a fresh, empty channel. Returns the number of files removed.
    pub fn flush(&self) -> ChannelResult<usize> {
        let mut guard = self.lock();
        let state = guard
            .as_ref()
            .ok_or_else(|| ChannelError::channel_closed(&self.name))?;

        let removed = state.store.remove_all()?;
        *guard = None;
        drop(guard);

        let evicted = self.cache.invalidate_channel(&self.name);
        self.metrics.increment_channels_flushed();
        log_event_with_fields(
            Event::ChannelFlushed,
            &[
                ("channel", &self.name),
                ("files_removed", &removed.to_string()),
                ("cache_evicted", &evicted.to_string()),
            ],
        );
        Ok(removed)
    }

    /// Physical removal of deleted records.
    ///
    /// Not supported: the fixed-width index has no tombstone marker, so
    /// reclaiming deleted records would break the backward scan. Always
    /// fails with an unsupported error.
    pub fn purge(&self) -> ChannelResult<Infallible> {
        Err(ChannelError::unsupported(
            "Purge is not supported by the fixed-width index format",
        )
        .with_details(format!("channel: {}", self.name)))
    }

    fn lock(&self) -> MutexGuard<'_, Option<ChannelState>> {
        // Poisoning ignored
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut ChannelState) -> ChannelResult<T>,
    ) -> ChannelResult<T> {
        let mut guard = self.lock();
        let state = guard
            .as_mut()
            .ok_or_else(|| ChannelError::channel_closed(&self.name))?;
        f(state)
    }

    /// Cache first, then the record file; visibility applies to both.
    fn load(&self, store: &RecordStore, id: u64, force: bool) -> ChannelResult<Option<Envelope>> {
        let envelope = match self.cache.get(&self.name, id) {
            Some(envelope) => Some(envelope),
            None => {
                let found = store.get(id)?;
                if let Some(envelope) = &found {
                    self.cache.set(&self.name, id, envelope.clone());
                }
                found
            }
        };

        Ok(envelope.filter(|envelope| force || envelope.is_visible()))
    }

    fn persist(&self, state: &ChannelState, envelope: &Envelope) -> ChannelResult<()> {
        state.store.put(envelope)?;
        self.cache.set(&self.name, envelope.id, envelope.clone());
        Ok(())
    }

    fn log_record(&self, event: Event, id: u64) {
        log_event_with_fields(event, &[("channel", &self.name), ("id", &id.to_string())]);
    }
}
