//! In-memory cache of the most recent messages.
//!
//! The cache holds a single window: the newest `capacity` messages, newest
//! first. Every successful write bumps a generation counter and drops the
//! window; a reader that loaded from storage before the bump cannot install
//! its (now stale) result.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use log::debug;

use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECS};
use crate::messages::messages_model::Message;

/// Cache sizing and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl CacheConfig {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl }
    }

    pub fn disabled() -> Self {
        Self {
            capacity: 0,
            ttl: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0 && !self.ttl.is_zero()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

struct CachedWindow {
    messages: Vec<Message>,
    loaded_at: Instant,
}

#[derive(Default)]
struct CacheState {
    generation: u64,
    window: Option<CachedWindow>,
}

pub struct MessageCache {
    config: CacheConfig,
    state: RwLock<CacheState>,
}

impl MessageCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Whether a read of `limit` messages could be served from the window.
    pub fn covers(&self, limit: usize) -> bool {
        self.config.is_enabled() && limit <= self.config.capacity
    }

    /// Returns the newest `limit` cached messages if the window is fresh.
    pub fn get(&self, limit: usize) -> Option<Vec<Message>> {
        if !self.covers(limit) {
            return None;
        }
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let window = state.window.as_ref()?;
        if window.loaded_at.elapsed() >= self.config.ttl {
            return None;
        }
        Some(window.messages.iter().take(limit).cloned().collect())
    }

    /// Generation to hand back to [`MessageCache::fill`] after loading.
    pub fn generation(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .generation
    }

    /// Installs a freshly loaded window unless a write happened meanwhile.
    pub fn fill(&self, generation: u64, messages: Vec<Message>) -> bool {
        if !self.config.is_enabled() {
            return false;
        }
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.generation != generation {
            debug!(
                "Discarding stale message window (generation {} != {})",
                generation, state.generation
            );
            return false;
        }
        let mut messages = messages;
        messages.truncate(self.config.capacity);
        state.window = Some(CachedWindow {
            messages,
            loaded_at: Instant::now(),
        });
        true
    }

    pub fn invalidate(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.generation = state.generation.wrapping_add(1);
        state.window = None;
    }
}
