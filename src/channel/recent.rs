//! Backward "most recent N" scan over the index log
//!
//! The scan never loads the whole index or the whole record set:
//!
//! 1. Start with a window of the last `N` entries (clamped to the log start).
//! 2. Walk the unvisited part of the window from newest to oldest, resolving
//!    each identifier; visible records are collected.
//! 3. If the window is exhausted but results are still missing, extend the
//!    window backward by exactly the shortfall (`missing * width`), clamped
//!    to the log start, and continue.
//! 4. Stop once `N` records are collected, or once the start-of-log entry has
//!    been visited.
//!
//! Offsets are measured in bytes back from the end of the log, so the
//! start-of-log entry sits at `offset == log length`. Every visited offset is
//! recorded and never resolved twice.
//!
//! Results are sorted by identifier descending before they are returned,
//! independent of the physical scan order.

use std::collections::HashSet;

use super::envelope::Envelope;
use super::errors::ChannelResult;
use super::index_log::IndexReader;

/// Default cap on the number of records one recent call returns.
pub const DEFAULT_MAXIMUM_RECENT: usize = 20;

/// Outcome of one recent scan.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentScan {
    /// Visible records, identifier descending.
    pub records: Vec<Envelope>,
    /// Index entries visited.
    pub entries_scanned: u64,
}

/// Normalize a requested count: `count <= 0` means 1, then cap at `maximum`.
pub fn clamp_count(count: i64, maximum: usize) -> usize {
    if count <= 0 {
        return 1.min(maximum);
    }
    usize::try_from(count).map_or(maximum, |count| count.min(maximum))
}

/// Collect up to `count` visible records, newest first.
///
/// `resolve` maps an identifier to its visible envelope, or `None` when the
/// record is deleted or missing.
pub fn scan_recent<F>(reader: &mut IndexReader, count: usize, mut resolve: F) -> ChannelResult<RecentScan>
where
    F: FnMut(u64) -> ChannelResult<Option<Envelope>>,
{
    let width = reader.width() as u64;
    let len = reader.len_bytes();

    let mut records = Vec::with_capacity(count);
    let mut checked: HashSet<u64> = HashSet::new();

    if count == 0 || len == 0 {
        return Ok(RecentScan {
            records,
            entries_scanned: 0,
        });
    }

    let mut window = (count as u64).saturating_mul(width).min(len);
    let mut scanned_to = 0u64;

    'scan: loop {
        let mut offset = scanned_to + width;
        while offset <= window {
            if checked.insert(offset) {
                let id = reader.identifier_at_back(offset)?;
                if let Some(envelope) = resolve(id)? {
                    records.push(envelope);
                    if records.len() == count {
                        break 'scan;
                    }
                }
            }
            offset += width;
        }
        scanned_to = window;

        if checked.contains(&len) {
            break;
        }

        let missing = (count - records.len()) as u64;
        window = window.saturating_add(missing.saturating_mul(width)).min(len);
    }

    records.sort_by(|a, b| b.id.cmp(&a.id));

    Ok(RecentScan {
        records,
        entries_scanned: checked.len() as u64,
    })
}
