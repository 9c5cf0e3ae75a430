//! Keyed, cancellable in-process timers for deferred task completion.
//!
//! One timer may be pending per (goal_id, child_id) key; scheduling again for
//! the same key cancels and replaces the pending timer (last-caller-wins).
//! Timers are process-local and non-durable: a restart loses them all, so
//! callers treat this as a best-effort convenience.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;

/// Timer identity: (goal_id, child_id).
pub type TimerKey = (String, String);

struct TimerEntry {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Service object owning the timer table. Injected as a dependency rather
/// than reached through ambient global state.
#[derive(Default)]
pub struct TaskTimerService {
    timers: Mutex<HashMap<TimerKey, TimerEntry>>,
    next_generation: AtomicU64,
}

impl TaskTimerService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Schedules `callback` to run after `delay`, replacing any pending timer
    /// for the same key.
    pub fn schedule<F>(self: &Arc<Self>, key: TimerKey, delay: Duration, callback: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let service = Arc::downgrade(self);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback.await;
            // Remove our own entry, but only if it wasn't replaced while the
            // callback was running.
            if let Some(service) = service.upgrade() {
                let mut timers = service.timers.lock().unwrap();
                if timers
                    .get(&task_key)
                    .is_some_and(|entry| entry.generation == generation)
                {
                    timers.remove(&task_key);
                }
            }
        });

        let mut timers = self.timers.lock().unwrap();
        if let Some(previous) = timers.insert(key.clone(), TimerEntry { generation, handle }) {
            debug!("Replacing pending timer for {}:{}", key.0, key.1);
            previous.handle.abort();
        }
    }

    /// Cancels the pending timer for `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &TimerKey) -> bool {
        let mut timers = self.timers.lock().unwrap();
        match timers.remove(key) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.timers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn key(goal: &str, child: &str) -> TimerKey {
        (goal.to_string(), child.to_string())
    }

    #[tokio::test]
    async fn fires_callback_after_delay_and_clears_entry() {
        let timers = TaskTimerService::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        timers.schedule(key("g1", "c1"), Duration::from_millis(10), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(timers.len(), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timers.is_empty());
    }

    #[tokio::test]
    async fn rescheduling_same_key_is_last_caller_wins() {
        let timers = TaskTimerService::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = fired.clone();
            timers.schedule(key("g1", "c1"), Duration::from_millis(20), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(timers.len(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        // Only the last scheduled callback survives.
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_prevents_firing() {
        let timers = TaskTimerService::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        timers.schedule(key("g1", "c1"), Duration::from_millis(20), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timers.cancel(&key("g1", "c1")));
        assert!(!timers.cancel(&key("g1", "c1")));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(timers.is_empty());
    }

    #[tokio::test]
    async fn timers_for_different_keys_run_independently() {
        let timers = TaskTimerService::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for child in ["c1", "c2", "c3"] {
            let counter = fired.clone();
            timers.schedule(key("g1", child), Duration::from_millis(10), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(timers.len(), 3);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }
}
