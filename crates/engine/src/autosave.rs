use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use playbook_core::DraftId;
use tokio::runtime::Handle;

use crate::timer::DebounceTimers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    /// A debounce timer is armed.
    Pending,
    /// A remote write is in flight.
    Saving,
}

/// Per-draft auto-save lifecycle: `Idle -> Pending -> Saving -> Idle`.
///
/// The scheduler only tracks state and timers; what happens when a timer
/// fires is supplied by the caller.
pub struct AutoSaveScheduler {
    enabled: AtomicBool,
    debounce: Duration,
    timers: DebounceTimers<DraftId>,
    in_flight: Mutex<HashSet<DraftId>>,
}

impl AutoSaveScheduler {
    pub fn new(runtime: Handle, enabled: bool, debounce: Duration) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            debounce,
            timers: DebounceTimers::new(runtime),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Turning auto-save off cancels every armed timer. In-flight saves finish.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            let cancelled = self.timers.cancel_all();
            if cancelled > 0 {
                tracing::debug!(cancelled, "auto-save disabled, timers cancelled");
            }
        }
    }

    /// Arm (or re-arm) the debounce timer for `id`. Returns false when
    /// auto-save is disabled.
    pub fn schedule<F>(&self, id: DraftId, on_fire: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.is_enabled() {
            return false;
        }
        tracing::trace!(draft_id = %id, delay_ms = self.debounce.as_millis() as u64, "auto-save armed");
        self.timers.arm(id, self.debounce, on_fire);
        true
    }

    pub fn cancel(&self, id: &DraftId) -> bool {
        self.timers.cancel(id)
    }

    pub fn cancel_all(&self) -> usize {
        self.timers.cancel_all()
    }

    /// Claim the in-flight slot for `id`. False if a save is already running.
    pub fn begin_save(&self, id: &DraftId) -> bool {
        self.in_flight.lock().insert(id.clone())
    }

    pub fn finish_save(&self, id: &DraftId) {
        self.in_flight.lock().remove(id);
    }

    pub fn state(&self, id: &DraftId) -> SaveState {
        if self.in_flight.lock().contains(id) {
            SaveState::Saving
        } else if self.timers.is_armed(id) {
            SaveState::Pending
        } else {
            SaveState::Idle
        }
    }

    /// Drafts with an armed timer.
    pub fn pending(&self) -> Vec<DraftId> {
        let mut ids = self.timers.armed();
        ids.sort();
        ids
    }

    pub fn saving(&self) -> Vec<DraftId> {
        let mut ids: Vec<_> = self.in_flight.lock().iter().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playbook_core::{EntityType, Timestamp};
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn id() -> DraftId {
        DraftId::generate(EntityType::Conditioning, Timestamp::from_millis(5))
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_states() {
        let scheduler = AutoSaveScheduler::new(Handle::current(), true, Duration::from_secs(5));
        let id = id();
        assert_eq!(scheduler.state(&id), SaveState::Idle);

        assert!(scheduler.schedule(id.clone(), async {}));
        assert_eq!(scheduler.state(&id), SaveState::Pending);
        assert_eq!(scheduler.pending(), vec![id.clone()]);

        assert!(scheduler.begin_save(&id));
        assert!(!scheduler.begin_save(&id));
        assert_eq!(scheduler.state(&id), SaveState::Saving);

        scheduler.finish_save(&id);
        scheduler.cancel(&id);
        assert_eq!(scheduler.state(&id), SaveState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_scheduler_never_arms() {
        let scheduler = AutoSaveScheduler::new(Handle::current(), true, Duration::from_secs(5));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        scheduler.schedule(id(), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.set_enabled(false);
        assert!(scheduler.pending().is_empty());
        assert!(!scheduler.schedule(id(), async {}));

        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
