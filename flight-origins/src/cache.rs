//! In-memory TTL cache for ranked results
//!
//! Entries expire a fixed time after insertion; reading an entry does not
//! extend its life. When the cache is full the oldest insertion is evicted.
//! All bookkeeping sits behind one mutex that is never held across I/O.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::airport::AirportCode;
use crate::config::CacheConfig;
use crate::pipeline::RankedResult;

#[derive(Debug)]
struct CacheEntry {
    result: RankedResult,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct Entries {
    by_code: HashMap<AirportCode, CacheEntry>,
    /// Codes in insertion order, oldest first. Holds exactly the keys of `by_code`.
    order: VecDeque<AirportCode>,
}

impl Entries {
    fn remove(&mut self, code: &AirportCode) {
        if self.by_code.remove(code).is_some() {
            self.order.retain(|queued| queued != code);
        }
    }

    /// Drop expired entries from the front of the insertion queue.
    ///
    /// Insertion order is also expiry order, so this stops at the first live
    /// entry.
    fn purge_expired(&mut self, now: Instant, ttl: Duration) -> usize {
        let mut purged = 0;
        while let Some(oldest) = self.order.front() {
            let expired = self
                .by_code
                .get(oldest)
                .map_or(true, |entry| now.duration_since(entry.inserted_at) >= ttl);
            if !expired {
                break;
            }
            if let Some(code) = self.order.pop_front() {
                self.by_code.remove(&code);
                purged += 1;
            }
        }
        purged
    }
}

/// Snapshot of cache sizing for the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Live entries
    pub current_size: usize,
    /// Capacity
    pub max_size: usize,
    /// Time-to-live
    pub ttl: Duration,
}

/// Time- and size-bounded store of ranked results keyed by airport code
#[derive(Debug)]
pub struct ArrivalsCache {
    entries: Mutex<Entries>,
    ttl: Duration,
    max_size: usize,
}

impl ArrivalsCache {
    /// Create a cache holding at most `max_size` entries for `ttl` each.
    ///
    /// A `max_size` of zero stores nothing.
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            ttl,
            max_size,
        }
    }

    /// Create a cache from configuration
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_size)
    }

    /// Time-to-live applied to every entry
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Maximum number of entries
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Return the cached ranking for `code` if it has not expired.
    ///
    /// An expired entry is removed and reported as a miss.
    pub async fn lookup(&self, code: &AirportCode) -> Option<RankedResult> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.by_code.get(code)?;
        if now.duration_since(entry.inserted_at) < self.ttl {
            return Some(entry.result.clone());
        }

        entries.remove(code);
        tracing::debug!(airport = %code, "Cache entry expired");
        None
    }

    /// Store `result` for `code`, replacing any previous entry.
    ///
    /// The new entry counts as the most recent insertion. Expired entries are
    /// purged first; if the cache is still over capacity, the oldest
    /// insertions are evicted.
    pub async fn store(&self, code: AirportCode, result: RankedResult) {
        if self.max_size == 0 {
            return;
        }

        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        entries.remove(&code);
        entries.purge_expired(now, self.ttl);

        while entries.by_code.len() >= self.max_size {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.by_code.remove(&oldest);
            tracing::debug!(airport = %oldest, "Evicted oldest cache entry");
        }

        entries.order.push_back(code.clone());
        entries.by_code.insert(
            code,
            CacheEntry {
                result,
                inserted_at: now,
            },
        );
    }

    /// Number of live entries (expired ones are purged first)
    pub async fn len(&self) -> usize {
        let mut entries = self.entries.lock().await;
        entries.purge_expired(Instant::now(), self.ttl);
        entries.by_code.len()
    }

    /// True when no live entries remain
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sizing snapshot
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            current_size: self.len().await,
            max_size: self.max_size,
            ttl: self.ttl,
        }
    }

    /// Drop every entry
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        entries.by_code.clear();
        entries.order.clear();
    }
}
