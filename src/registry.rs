//! Channel registry
//!
//! Owns the storage root and hands out one shared [`Channel`] handle per
//! normalized name. Channels are opened lazily on first use.
//!
//! Flushing through the registry also forgets the handle, so the next access
//! to the same name reopens a fresh, empty channel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::channel::{normalize_name, Channel, ChannelResult, ChannelSettings, RecordCache};
use crate::observability::MetricsRegistry;

/// Shared map of open channels under one storage root.
#[derive(Debug)]
pub struct ChannelRegistry {
    root: PathBuf,
    settings: ChannelSettings,
    cache: Arc<RecordCache>,
    metrics: Arc<MetricsRegistry>,
    channels: Mutex<HashMap<String, Arc<Channel>>>,
}

impl ChannelRegistry {
    pub fn new(
        root: impl Into<PathBuf>,
        settings: ChannelSettings,
        cache: Arc<RecordCache>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            root: root.into(),
            settings,
            cache,
            metrics,
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> ChannelSettings {
        self.settings
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Shared handle for `name`, opening the channel on first use.
    pub fn channel(&self, name: &str) -> ChannelResult<Arc<Channel>> {
        let mut channels = self.lock();
        self.get_or_open(&mut channels, name)
    }

    /// Flush `name` and forget its handle. Returns the number of files removed.
    pub fn flush(&self, name: &str) -> ChannelResult<usize> {
        let mut channels = self.lock();
        let channel = self.get_or_open(&mut channels, name)?;
        let removed = channel.flush()?;
        channels.remove(channel.name());
        Ok(removed)
    }

    /// Names of the channels currently held open, sorted.
    pub fn open_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn get_or_open(
        &self,
        channels: &mut HashMap<String, Arc<Channel>>,
        name: &str,
    ) -> ChannelResult<Arc<Channel>> {
        let name = normalize_name(name)?;

        if let Some(channel) = channels.get(&name) {
            if !channel.is_closed() {
                return Ok(channel.clone());
            }
        }

        let channel = Arc::new(Channel::open(
            &name,
            &self.root,
            self.settings,
            self.cache.clone(),
            self.metrics.clone(),
        )?);
        channels.insert(name, channel.clone());
        Ok(channel)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Channel>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn registry(temp: &TempDir) -> ChannelRegistry {
        ChannelRegistry::new(
            temp.path(),
            ChannelSettings::default(),
            Arc::new(RecordCache::default()),
            Arc::new(MetricsRegistry::new()),
        )
    }

    #[test]
    fn test_same_handle_for_normalized_name() {
        let temp = TempDir::new().unwrap();
        let registry = registry(&temp);

        let a = registry.channel("Chat").unwrap();
        let b = registry.channel("chat").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.open_channels(), vec!["chat".to_string()]);
    }

    #[test]
    fn test_flush_forgets_handle() {
        let temp = TempDir::new().unwrap();
        let registry = registry(&temp);

        let old = registry.channel("chat").unwrap();
        old.create(json!(1)).unwrap();
        assert_eq!(registry.flush("CHAT").unwrap(), 3);
        assert!(registry.open_channels().is_empty());
        assert!(old.is_closed());

        let fresh = registry.channel("chat").unwrap();
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert_eq!(fresh.create(json!(1)).unwrap().id, 1);
    }

    #[test]
    fn test_closed_handle_is_replaced() {
        let temp = TempDir::new().unwrap();
        let registry = registry(&temp);

        let handle = registry.channel("chat").unwrap();
        handle.flush().unwrap();

        let reopened = registry.channel("chat").unwrap();
        assert!(!reopened.is_closed());
    }

    #[test]
    fn test_invalid_name_rejected() {
        let temp = TempDir::new().unwrap();
        let registry = registry(&temp);
        assert!(registry.channel("../escape").is_err());
        assert!(registry.open_channels().is_empty());
    }
}
