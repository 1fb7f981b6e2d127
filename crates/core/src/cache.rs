//! A time-to-live cache for completed answers.
//!
//! The cache has no capacity bound: entries live until they expire or the
//! cache is cleared, and expired entries are only dropped when they are
//! read. This is fine for an interactive client but needs an eviction
//! policy before being reused under sustained, high-cardinality traffic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use agentkit_model::Message;

/// Builds the cache key of a conversation.
///
/// Only the message contents take part in the key, roles do not. Two
/// conversations with the same texts under different roles share an
/// entry.
pub fn fingerprint(messages: &[Message]) -> String {
    let contents: Vec<&str> = messages.iter().map(Message::content).collect();
    // Serializing a list of strings cannot fail.
    serde_json::to_string(&contents).unwrap_or_default()
}

#[derive(Clone, Debug)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// A thread-safe map from fingerprints to answers, with expiry.
#[derive(Debug)]
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl TtlCache {
    /// Creates an empty cache whose entries live for `ttl`.
    #[inline]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the value for `key` if it has not expired yet. An expired
    /// entry is removed.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if Instant::now() < entry.expires_at {
            return Some(entry.value.clone());
        }
        trace!("cache entry expired");
        entries.remove(key);
        None
    }

    /// Stores `value` for `key`, resetting its expiry.
    pub fn set<K: Into<String>, V: Into<String>>(&self, key: K, value: V) {
        let entry = CacheEntry {
            value: value.into(),
            expires_at: Instant::now() + self.ttl,
        };
        self.lock().insert(key.into(), entry);
    }

    /// Removes the entry for `key`.
    #[inline]
    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Removes every entry.
    #[inline]
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Returns the number of stored entries, expired or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
