//! Keyed debounce timers on the tokio runtime.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

struct Slots<K> {
    next_generation: u64,
    armed: HashMap<K, (u64, AbortHandle)>,
}

/// At most one pending timer per key. Re-arming a key aborts the previous
/// timer. Once a timer fires it releases its slot before running its task,
/// so cancelling a key never interrupts work that is already under way.
pub struct DebounceTimers<K> {
    runtime: Handle,
    slots: Arc<Mutex<Slots<K>>>,
}

impl<K> DebounceTimers<K>
where
    K: Clone + Eq + Hash + Send + 'static,
{
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            slots: Arc::new(Mutex::new(Slots {
                next_generation: 0,
                armed: HashMap::new(),
            })),
        }
    }

    pub fn arm<F>(&self, key: K, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slots = self.slots.lock();
        slots.next_generation += 1;
        let generation = slots.next_generation;

        let shared = Arc::clone(&self.slots);
        let own_key = key.clone();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slots = shared.lock();
                let current = slots.armed.get(&own_key).map(|(g, _)| *g);
                if current != Some(generation) {
                    return;
                }
                slots.armed.remove(&own_key);
            }
            task.await;
        });

        if let Some((_, previous)) = slots.armed.insert(key, (generation, handle.abort_handle())) {
            previous.abort();
        }
    }

    pub fn cancel(&self, key: &K) -> bool {
        match self.slots.lock().armed.remove(key) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.slots.lock().armed.drain().collect();
        for (_, (_, handle)) in &drained {
            handle.abort();
        }
        drained.len()
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.slots.lock().armed.contains_key(key)
    }

    pub fn armed(&self) -> Vec<K> {
        self.slots.lock().armed.keys().cloned().collect()
    }
}

impl<K> Drop for DebounceTimers<K> {
    fn drop(&mut self) {
        for (_, (_, handle)) in self.slots.lock().armed.drain() {
            handle.abort();
        }
    }
}
