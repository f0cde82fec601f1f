use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Returns the current wall-clock time as milliseconds since Unix epoch.
pub fn physical_now() -> Result<u64, CoreError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .map_err(|_| CoreError::InvalidData("system clock before epoch".into()))
}

/// Milliseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn saturating_sub(&self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration.as_millis() as u64))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Source of wall-clock milliseconds. Injected so tests can control time.
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        physical_now().unwrap_or_default()
    }
}

/// Manually driven time source shared between a clock and a test.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    now: Arc<AtomicU64>,
}

impl ManualTimeSource {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, duration: Duration) {
        self.now
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A clock that hands out strictly increasing timestamps even when the
/// underlying source stalls or steps backwards.
pub struct Clock {
    source: Arc<dyn TimeSource>,
    last_ms: u64,
}

impl Clock {
    pub fn new(source: Arc<dyn TimeSource>) -> Self {
        Self { source, last_ms: 0 }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemTimeSource))
    }

    /// Current wall time, without the monotonic guarantee.
    pub fn now(&self) -> Timestamp {
        Timestamp(self.source.now_ms())
    }

    /// Generate the next monotonically increasing timestamp.
    pub fn tick(&mut self) -> Timestamp {
        let now = self.source.now_ms();
        let next = if now > self.last_ms {
            now
        } else {
            self.last_ms + 1
        };
        self.last_ms = next;
        Timestamp(next)
    }

    /// Make sure future ticks stay ahead of a timestamp seen elsewhere
    /// (e.g. a rehydrated draft).
    pub fn observe(&mut self, seen: Timestamp) {
        self.last_ms = self.last_ms.max(seen.0);
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}
