//! Channel storage subsystem
//!
//! A channel is a named collection of records stored one file per record,
//! with insertion order kept in a separate append-only index log.
//!
//! Components, leaves first:
//!
//! - [`RecordCodec`]: framed, checksummed encoding of one [`Envelope`]
//! - [`RecordStore`]: `{channel}.{id}.mrkv` files, no ordering knowledge
//! - [`IndexLog`]: fixed-width identifier entries, read backward
//! - [`IdentifierSequence`]: persisted monotonic identifier counter
//! - [`RecordCache`]: shared, bounded cache of decoded envelopes
//! - [`Channel`]: lifecycle operations over all of the above
//!
//! # Invariants
//!
//! - An identifier is assigned once and never reused, even across restarts
//! - The index log length is always a multiple of the entry width
//! - Soft-deleted records are invisible to default reads, cached or not
//! - Recent results are always ordered by identifier descending

mod cache;
#[allow(clippy::module_inception)]
mod channel;
mod codec;
mod envelope;
mod errors;
mod index_log;
mod recent;
mod sequence;
mod store;

pub use cache::{cache_key, CacheStats, RecordCache, DEFAULT_CACHE_CAPACITY};
pub use channel::{normalize_name, Channel, ChannelSettings, ChannelStats};
pub use codec::{RecordCodec, FORMAT_VERSION, RECORD_MAGIC};
pub use envelope::Envelope;
pub use errors::{ChannelError, ChannelErrorCode, ChannelResult, Severity};
pub use index_log::{decode_entry, encode_entry, IndexLog, IndexReader, DEFAULT_INDEX_SIZE};
pub use recent::{clamp_count, scan_recent, RecentScan, DEFAULT_MAXIMUM_RECENT};
pub use sequence::{IdentifierSequence, FIRST_IDENTIFIER};
pub use store::{RecordStore, FILE_EXTENSION};
