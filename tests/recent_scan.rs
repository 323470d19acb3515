//! Recent Scan Tests
//!
//! Backward scan over the index log:
//! - newest first, identifier descending
//! - soft-deleted records are skipped and the window widens to compensate
//! - counts are clamped to [1, maximum_recent]
//! - scans stop at the start of the log
//! - results agree with or without the cache

use merkava::channel::{Channel, ChannelErrorCode, ChannelSettings, Envelope, RecordCache};
use merkava::observability::MetricsRegistry;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn open_with(root: &Path, settings: ChannelSettings, cache: RecordCache) -> Channel {
    Channel::open(
        "feed",
        root,
        settings,
        Arc::new(cache),
        Arc::new(MetricsRegistry::new()),
    )
    .expect("Failed to open channel")
}

fn populated(root: &Path, count: u64) -> Channel {
    let channel = open_with(root, ChannelSettings::default(), RecordCache::default());
    for n in 1..=count {
        channel.create(json!({"n": n})).expect("create failed");
    }
    channel
}

fn ids(records: &[Envelope]) -> Vec<u64> {
    records.iter().map(|e| e.id).collect()
}

// =============================================================================
// Ordering and Visibility
// =============================================================================

#[test]
fn test_recent_is_newest_first() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let channel = populated(temp_dir.path(), 8);

    assert_eq!(ids(&channel.recent(3).unwrap()), vec![8, 7, 6]);
    assert_eq!(ids(&channel.recent(1).unwrap()), vec![8]);
}

#[test]
fn test_deleted_runs_widen_the_window() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let channel = populated(temp_dir.path(), 12);
    for id in [12, 11, 9, 8, 7] {
        channel.delete(id).unwrap();
    }

    assert_eq!(ids(&channel.recent(4).unwrap()), vec![10, 6, 5, 4]);
}

#[test]
fn test_restored_record_reappears() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let channel = populated(temp_dir.path(), 3);
    channel.delete(3).unwrap();
    assert_eq!(ids(&channel.recent(2).unwrap()), vec![2, 1]);

    channel.restore(3).unwrap();
    assert_eq!(ids(&channel.recent(2).unwrap()), vec![3, 2]);
}

#[test]
fn test_everything_deleted_yields_empty() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let channel = populated(temp_dir.path(), 4);
    for id in 1..=4 {
        channel.delete(id).unwrap();
    }

    assert!(channel.recent(3).unwrap().is_empty());
}

// =============================================================================
// Count Handling
// =============================================================================

#[test]
fn test_count_exceeding_log_returns_everything() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let channel = populated(temp_dir.path(), 3);

    assert_eq!(ids(&channel.recent(10).unwrap()), vec![3, 2, 1]);
}

#[test]
fn test_count_is_capped_at_maximum() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let settings = ChannelSettings {
        maximum_recent: 4,
        ..ChannelSettings::default()
    };
    let channel = open_with(temp_dir.path(), settings, RecordCache::default());
    for n in 0..10 {
        channel.create(json!(n)).unwrap();
    }

    assert_eq!(ids(&channel.recent(100).unwrap()), vec![10, 9, 8, 7]);
}

#[test]
fn test_non_positive_count_means_one() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let channel = populated(temp_dir.path(), 5);

    assert_eq!(ids(&channel.recent(0).unwrap()), vec![5]);
    assert_eq!(ids(&channel.recent(-3).unwrap()), vec![5]);
}

#[test]
fn test_textual_counts() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let channel = populated(temp_dir.path(), 5);

    assert_eq!(ids(&channel.recent_from_input("").unwrap()), vec![5]);
    assert_eq!(ids(&channel.recent_from_input(" 2 ").unwrap()), vec![5, 4]);

    let err = channel.recent_from_input("two").unwrap_err();
    assert_eq!(err.code(), ChannelErrorCode::InvalidInput);
}

// =============================================================================
// Empty and Reopened Channels
// =============================================================================

#[test]
fn test_empty_channel_yields_empty() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let channel = populated(temp_dir.path(), 0);

    assert!(channel.recent(5).unwrap().is_empty());
}

#[test]
fn test_cold_cache_matches_warm_cache() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let warm = {
        let channel = populated(temp_dir.path(), 9);
        channel.delete(8).unwrap();
        channel.delete(5).unwrap();
        ids(&channel.recent(5).unwrap())
    };

    let cold = open_with(temp_dir.path(), ChannelSettings::default(), RecordCache::disabled());
    assert_eq!(ids(&cold.recent(5).unwrap()), warm);
    assert_eq!(warm, vec![9, 7, 6, 4, 3]);
}
