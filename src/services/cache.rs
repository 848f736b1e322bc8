//! Query result cache
//!
//! Process-wide cache shared by every mounted view. Entries are keyed by a
//! [`QueryKey`] (resource tag followed by every parameter that affects the
//! result) and carry their own staleness deadline. Entries are written only by
//! completed fetches and invalidated explicitly by mutations or scope changes;
//! every change is published on a broadcast channel so mounted observers can
//! react.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Composite cache key: a stable resource tag followed by parameters.
///
/// Keys compare segment-wise, so `policies/<org>` is a prefix of
/// `policies/<org>/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    segments: Vec<String>,
    organization_id: Option<Uuid>,
}

impl QueryKey {
    /// Key for a resource that is not tied to an organization
    pub fn new(tag: &str) -> Self {
        Self {
            segments: vec![tag.to_string()],
            organization_id: None,
        }
    }

    /// Key for an organization-scoped resource; the organization is the second segment
    pub fn scoped(tag: &str, organization_id: Uuid) -> Self {
        Self {
            segments: vec![tag.to_string(), organization_id.to_string()],
            organization_id: Some(organization_id),
        }
    }

    /// Append a parameter segment
    pub fn with(mut self, part: impl fmt::Display) -> Self {
        self.segments.push(part.to_string());
        self
    }

    /// Append an optional parameter segment (`-` when absent)
    pub fn with_opt<T: fmt::Display>(self, part: Option<T>) -> Self {
        match part {
            Some(value) => self.with(value),
            None => self.with("-"),
        }
    }

    pub fn tag(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    pub fn organization(&self) -> Option<Uuid> {
        self.organization_id
    }

    pub fn is_scoped(&self) -> bool {
        self.organization_id.is_some()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Stored result with staleness tracking
struct CacheEntry {
    data: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
    stale_after: Duration,
    invalidated: bool,
}

impl CacheEntry {
    fn new(data: Arc<dyn Any + Send + Sync>, stale_after: Duration) -> Self {
        Self {
            data,
            fetched_at: Instant::now(),
            stale_after,
            invalidated: false,
        }
    }

    fn is_stale(&self) -> bool {
        self.invalidated || self.fetched_at.elapsed() >= self.stale_after
    }
}

/// Typed view of a cache entry
#[derive(Debug)]
pub struct Cached<T> {
    pub data: Arc<T>,
    pub fetched_at: Instant,
    pub is_stale: bool,
}

/// Change notifications published by the cache
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// A completed fetch stored fresh data
    Updated(QueryKey),
    /// Entries (and mounted keys) that are no longer authoritative
    Invalidated(Vec<QueryKey>),
    /// Entries dropped from the cache
    Removed(Vec<QueryKey>),
    /// The view regained user attention
    FocusRegained,
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub stale_entries: usize,
    pub fresh_entries: usize,
    pub mounted_keys: usize,
    pub max_entries: usize,
}

pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    /// Mount count per key; plain mutex so observers can unmount on drop
    mounted: Mutex<HashMap<QueryKey, usize>>,
    events: broadcast::Sender<CacheEvent>,
    max_entries: usize,
}

impl QueryCache {
    pub fn new(max_entries: usize) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            entries: RwLock::new(HashMap::new()),
            mounted: Mutex::new(HashMap::new()),
            events,
            max_entries,
        }
    }

    /// Subscribe to cache change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: CacheEvent) {
        // No receivers is fine: nothing is mounted.
        let _ = self.events.send(event);
    }

    /// Get an entry, stale or not
    pub async fn get<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Cached<T>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        match Arc::clone(&entry.data).downcast::<T>() {
            Ok(data) => Some(Cached {
                data,
                fetched_at: entry.fetched_at,
                is_stale: entry.is_stale(),
            }),
            Err(_) => {
                warn!(key = %key, "Cached value has an unexpected type");
                None
            }
        }
    }

    /// Store a fetch result
    pub async fn set<T: Send + Sync + 'static>(
        &self,
        key: QueryKey,
        data: Arc<T>,
        stale_after: Duration,
    ) {
        {
            let mut entries = self.entries.write().await;
            if !entries.contains_key(&key) && entries.len() >= self.max_entries {
                self.evict_one_locked(&mut entries);
            }
            entries.insert(key.clone(), CacheEntry::new(data, stale_after));
        }
        debug!(key = %key, "Cache updated");
        self.publish(CacheEvent::Updated(key));
    }

    /// Store a fetch result only if some view still mounts the key.
    ///
    /// Returns whether the value was stored.
    pub async fn set_if_mounted<T: Send + Sync + 'static>(
        &self,
        key: QueryKey,
        data: Arc<T>,
        stale_after: Duration,
    ) -> bool {
        if !self.is_mounted(&key) {
            debug!(key = %key, "Discarding result for unmounted key");
            return false;
        }
        self.set(key, data, stale_after).await;
        true
    }

    /// Prefer evicting the oldest unmounted entry, then the oldest overall
    fn evict_one_locked(&self, entries: &mut HashMap<QueryKey, CacheEntry>) {
        let mounted = self.mounted.lock().unwrap_or_else(PoisonError::into_inner);
        let victim = entries
            .iter()
            .filter(|(key, _)| !mounted.contains_key(*key))
            .min_by_key(|(_, entry)| entry.fetched_at)
            .or_else(|| entries.iter().min_by_key(|(_, entry)| entry.fetched_at))
            .map(|(key, _)| key.clone());
        drop(mounted);

        if let Some(key) = victim {
            debug!(key = %key, "Evicting cache entry");
            entries.remove(&key);
        }
    }

    /// Mark every entry under `prefix` as stale
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        self.invalidate_where(|key| key.starts_with(prefix)).await
    }

    /// Mark every matching entry as stale and notify mounted observers.
    ///
    /// Returns the number of stored entries marked.
    pub async fn invalidate_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&QueryKey) -> bool,
    {
        let mut affected = Vec::new();
        {
            let mut entries = self.entries.write().await;
            for (key, entry) in entries.iter_mut() {
                if predicate(key) {
                    entry.invalidated = true;
                    affected.push(key.clone());
                }
            }
        }
        let marked = affected.len();

        for key in self.mounted_keys() {
            if predicate(&key) && !affected.contains(&key) {
                affected.push(key);
            }
        }

        if !affected.is_empty() {
            debug!(entries = marked, keys = affected.len(), "Cache invalidated");
            self.publish(CacheEvent::Invalidated(affected));
        }
        marked
    }

    pub async fn remove(&self, key: &QueryKey) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            self.publish(CacheEvent::Removed(vec![key.clone()]));
        }
        removed
    }

    /// Drop every matching entry
    pub async fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&QueryKey) -> bool,
    {
        let removed: Vec<QueryKey> = {
            let mut entries = self.entries.write().await;
            let keys: Vec<QueryKey> = entries.keys().filter(|k| predicate(k)).cloned().collect();
            for key in &keys {
                entries.remove(key);
            }
            keys
        };

        let count = removed.len();
        if count > 0 {
            debug!(entries = count, "Cache entries removed");
            self.publish(CacheEvent::Removed(removed));
        }
        count
    }

    /// Clear all entries from cache
    pub async fn clear(&self) -> usize {
        self.remove_where(|_| true).await
    }

    pub fn mount(&self, key: &QueryKey) {
        let mut mounted = self.mounted.lock().unwrap_or_else(PoisonError::into_inner);
        *mounted.entry(key.clone()).or_insert(0) += 1;
    }

    pub fn unmount(&self, key: &QueryKey) {
        let mut mounted = self.mounted.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = mounted.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                mounted.remove(key);
            }
        }
    }

    pub fn is_mounted(&self, key: &QueryKey) -> bool {
        self.mounted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn mounted_keys(&self) -> Vec<QueryKey> {
        self.mounted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Tell mounted observers that the view regained attention
    pub fn notify_focus(&self) {
        self.publish(CacheEvent::FocusRegained);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let total = entries.len();
        let stale = entries.values().filter(|e| e.is_stale()).count();

        CacheStats {
            total_entries: total,
            stale_entries: stale,
            fresh_entries: total - stale,
            mounted_keys: self.mounted_keys().len(),
            max_entries: self.max_entries,
        }
    }
}
