//! Per-session timers with structured cancellation.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Decrements the outstanding count when a timer task ends, however it ends.
struct Outstanding(Arc<AtomicUsize>);

impl Outstanding {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for Outstanding {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A group of timers cancelled together.
///
/// After [`shutdown`](Self::shutdown) returns no timer of the group is
/// outstanding and new timers are refused.
pub struct TimerGroup {
    cancel: CancellationToken,
    outstanding: Arc<AtomicUsize>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TimerGroup {
    /// Creates a timer group.
    #[must_use]
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Creates a timer group cancelled together with `parent`.
    #[must_use]
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self::with_token(parent.child_token())
    }

    fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            outstanding: Arc::new(AtomicUsize::new(0)),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Runs `task` once after `delay`, unless the group is cancelled first.
    pub fn spawn_after<F>(&self, name: &'static str, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return;
        }
        let guard = Outstanding::new(&self.outstanding);
        let token = self.cancel.clone();

        self.track(tokio::spawn(async move {
            let _guard = guard;
            tokio::select! {
                () = token.cancelled() => trace!(timer = name, "Timer cancelled"),
                () = tokio::time::sleep(delay) => task.await,
            }
        }));
    }

    /// Calls `tick` every `period`, first after one full period. Stops when
    /// the group is cancelled or `tick` returns false.
    pub fn spawn_every<F, Fut>(&self, name: &'static str, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return;
        }
        let guard = Outstanding::new(&self.outstanding);
        let token = self.cancel.clone();

        self.track(tokio::spawn(async move {
            let _guard = guard;
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        trace!(timer = name, "Timer cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        if !tick().await {
                            break;
                        }
                    }
                }
            }
        }));
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Returns the number of timers not yet finished.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Returns true once the group is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels every timer without waiting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancels every timer and waits for all of them to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Default for TimerGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerGroup {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for TimerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerGroup")
            .field("outstanding", &self.outstanding())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test(start_paused = true)]
    async fn test_spawn_after_fires() {
        let group = TimerGroup::new();
        let fired = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&fired);
        group.spawn_after("once", Duration::from_millis(500), async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(group.outstanding(), 1);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(group.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_leaves_nothing_outstanding() {
        let group = TimerGroup::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        group.spawn_after("never", Duration::from_secs(3600), async {});
        let counter = Arc::clone(&ticks);
        group.spawn_every("tick", Duration::from_secs(1), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(group.outstanding(), 2);

        group.shutdown().await;
        assert_eq!(group.outstanding(), 0);

        group.spawn_after("late", Duration::from_millis(1), async {});
        assert_eq!(group.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_every_stops_on_false() {
        let group = TimerGroup::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ticks);
        group.spawn_every("twice", Duration::from_secs(1), move || {
            let counter = Arc::clone(&counter);
            async move { counter.fetch_add(1, Ordering::SeqCst) + 1 < 2 }
        });

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert_eq!(group.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_cancelled_with_parent() {
        let parent = CancellationToken::new();
        let group = TimerGroup::child_of(&parent);
        group.spawn_after("child", Duration::from_secs(60), async {});

        parent.cancel();
        assert!(group.is_cancelled());
        group.shutdown().await;
        assert_eq!(group.outstanding(), 0);
    }
}
