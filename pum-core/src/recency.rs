//! Per `(buffer, word)` last-seen timestamps used as a ranking input.
//!
//! Writes are append-only and ordering-insensitive, so a plain read-write
//! lock is enough even though sources read the map from spawned tasks
//! while the coordinator records commits on the main loop.

use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;
use parking_lot::RwLock;

/// Key for the buffer-independent slot of a word.
const ANY_BUFFER: u64 = 0;

#[derive(Debug, Default)]
pub struct RecencyMap {
    inner: RwLock<HashMap<(u64, String), u64, ahash::RandomState>>,
}

impl RecencyMap {
    pub fn new() -> RecencyMap {
        RecencyMap::default()
    }

    /// Record that `word` was committed in `bufnr` at `now_ms`.
    pub fn touch(&self, bufnr: u64, word: &str, now_ms: u64) {
        let mut map = self.inner.write();
        map.insert((bufnr, word.to_string()), now_ms);
        map.insert((ANY_BUFFER, word.to_string()), now_ms);
    }

    /// Last time `word` was committed in `bufnr`, if ever.
    pub fn last_seen(&self, bufnr: u64, word: &str) -> Option<u64> {
        self.inner.read().get(&(bufnr, word.to_string())).copied()
    }

    /// Last time `word` was committed in any buffer.
    pub fn last_seen_anywhere(&self, word: &str) -> Option<u64> {
        self.last_seen(ANY_BUFFER, word)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Milliseconds since the unix epoch.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
