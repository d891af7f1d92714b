//! Cancellable delayed work.
//!
//! Every timer is a spawned tokio task that sleeps and then runs its future.
//! The scheduler keeps one entry per pending timer, tagged with its kind and
//! the session generation it belongs to, so that leave, disconnect and a
//! newer join can cancel them. A timer removes its own entry the moment
//! it fires, before its future runs; cancelling from inside a running timer
//! therefore never aborts the timer itself.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Boxed unit future run by a timer.
pub type BoxTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Post-join publish attempt or a publish retry.
    Publish,
    /// Retry of a join that hit an in-progress transition.
    DeferredJoin,
}

#[derive(Debug)]
struct PendingTimer {
    kind: TimerKind,
    generation: u64,
    task: JoinHandle<()>,
}

type TimerMap = Mutex<HashMap<u64, PendingTimer>>;

#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: AtomicU64,
    timers: Arc<TimerMap>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`. `generation` is the session generation the
    /// timer belongs to; [`Scheduler::cancel_stale`] matches on it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, kind: TimerKind, generation: u64, delay: Duration, task: BoxTask) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timers = Arc::downgrade(&self.timers);

        // Hold the map lock across the spawn so the entry exists before the
        // task can look for it.
        let mut map = self.timers.lock();
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let fired = match timers.upgrade() {
                Some(timers) => timers.lock().remove(&id).is_some(),
                None => false,
            };
            if fired {
                tracing::trace!(timer = id, ?kind, "timer fired");
                task.await;
            }
        });
        map.insert(
            id,
            PendingTimer {
                kind,
                generation,
                task: join,
            },
        );
        drop(map);

        tracing::trace!(timer = id, ?kind, generation, ?delay, "timer scheduled");
    }

    /// Cancel every pending timer. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingTimer> = self.timers.lock().drain().map(|(_, t)| t).collect();
        let count = drained.len();
        for timer in drained {
            timer.task.abort();
        }
        if count > 0 {
            tracing::debug!(count, "cancelled pending timers");
        }
        count
    }

    /// Cancel pending timers of one kind.
    pub fn cancel_kind(&self, kind: TimerKind) -> usize {
        let cancelled: Vec<PendingTimer> = {
            let mut map = self.timers.lock();
            let ids: Vec<u64> = map
                .iter()
                .filter(|(_, t)| t.kind == kind)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter().filter_map(|id| map.remove(&id)).collect()
        };
        for timer in &cancelled {
            timer.task.abort();
        }
        cancelled.len()
    }

    /// Cancel pending timers scheduled for any generation other than `current`.
    pub fn cancel_stale(&self, current: u64) -> usize {
        let stale: Vec<PendingTimer> = {
            let mut map = self.timers.lock();
            let ids: Vec<u64> = map
                .iter()
                .filter(|(_, t)| t.generation != current)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter().filter_map(|id| map.remove(&id)).collect()
        };
        for timer in &stale {
            timer.task.abort();
        }
        stale.len()
    }

    pub fn pending(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn pending_of(&self, kind: TimerKind) -> usize {
        self.timers.lock().values().filter(|t| t.kind == kind).count()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for (_, timer) in self.timers.lock().drain() {
            timer.task.abort();
        }
    }
}
