//! Trigger coalescing
//!
//! A [`Debouncer`] collapses a burst of [`Debouncer::trigger`] calls into a
//! single action that runs once no trigger has arrived for the quiet window.
//! Only the time of the most recent trigger is kept, so the number of
//! triggers in a burst never matters.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Default quiet window between the last change and a rebuild
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Collapses many triggers into one delayed action.
#[derive(Debug)]
pub struct Debouncer {
    quiet_window: Duration,
    last_trigger: Mutex<Option<Instant>>,
    wakeup: Notify,
}

impl Debouncer {
    /// Create a debouncer that waits `quiet_window` after the latest trigger.
    pub fn new(quiet_window: Duration) -> Self {
        Self {
            quiet_window,
            last_trigger: Mutex::new(None),
            wakeup: Notify::new(),
        }
    }

    /// Record a trigger. Never blocks; callable from any thread.
    pub fn trigger(&self) {
        *self.lock() = Some(Instant::now());
        // A stored permit may cause one redundant wakeup, which is harmless.
        self.wakeup.notify_one();
    }

    /// Whether a trigger is waiting for its quiet window to elapse.
    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Run `action` each time the quiet window elapses after a trigger.
    ///
    /// Returns `Ok(())` when `cancel` fires and the first error returned by
    /// `action` otherwise. `action` is awaited inline, so it never overlaps
    /// with itself; triggers arriving while it runs schedule the next fire.
    pub async fn listen<F, Fut, E>(&self, cancel: &CancellationToken, mut action: F) -> Result<(), E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        loop {
            let pending = *self.lock();
            match pending {
                None => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(()),
                        _ = self.wakeup.notified() => {}
                    }
                }
                Some(triggered_at) => {
                    let deadline = triggered_at + self.quiet_window;
                    if Instant::now() < deadline {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Ok(()),
                            _ = sleep_until(deadline) => {}
                            _ = self.wakeup.notified() => {}
                        }
                        continue;
                    }

                    if !self.take_if_unchanged(triggered_at) {
                        continue;
                    }
                    if cancel.is_cancelled() {
                        return Ok(());
                    }
                    action().await?;
                }
            }
        }
    }

    /// Clear the pending trigger unless a newer one replaced it meanwhile.
    fn take_if_unchanged(&self, triggered_at: Instant) -> bool {
        let mut last = self.lock();
        if *last == Some(triggered_at) {
            *last = None;
            true
        } else {
            false
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.last_trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    fn spawn_counter(
        debouncer: Arc<Debouncer>,
        cancel: CancellationToken,
    ) -> (Arc<AtomicUsize>, tokio::task::JoinHandle<Result<(), ()>>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = count.clone();
        let handle = tokio::spawn(async move {
            debouncer
                .listen(&cancel, || {
                    counted.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                })
                .await
        });
        (count, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_then_gap_fires_twice() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(500)));
        let cancel = CancellationToken::new();
        let (count, handle) = spawn_counter(debouncer.clone(), cancel.clone());

        let started = Instant::now();
        for _ in 0..10 {
            sleep(Duration::from_millis(20)).await;
            debouncer.trigger();
        }
        sleep(Duration::from_millis(706)).await;
        debouncer.trigger();

        sleep_until(started + Duration::from_secs(4)).await;
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), Ok(()));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fires_no_earlier_than_quiet_window() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(300)));
        let cancel = CancellationToken::new();
        let (count, handle) = spawn_counter(debouncer.clone(), cancel.clone());

        debouncer.trigger();
        sleep(Duration::from_millis(299)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn each_trigger_resets_the_deadline() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(100)));
        let cancel = CancellationToken::new();
        let (count, handle) = spawn_counter(debouncer.clone(), cancel.clone());

        for _ in 0..20 {
            debouncer.trigger();
            sleep(Duration::from_millis(90)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn action_error_stops_listening() {
        let debouncer = Debouncer::new(Duration::from_millis(10));
        let cancel = CancellationToken::new();
        debouncer.trigger();

        let result = debouncer
            .listen(&cancel, || async { Err::<(), _>("boom") })
            .await;

        assert_eq!(result, Err("boom"));
    }

    #[tokio::test]
    async fn cancellation_returns_ok_while_idle() {
        let debouncer = Debouncer::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = debouncer
            .listen(&cancel, || async { Err::<(), _>("should not run") })
            .await;

        assert_eq!(result, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_during_action_schedules_another_fire() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(50)));
        let cancel = CancellationToken::new();
        let count = Arc::new(AtomicUsize::new(0));

        let listener = {
            let debouncer = debouncer.clone();
            let cancel = cancel.clone();
            let count = count.clone();
            tokio::spawn(async move {
                let inner = debouncer.clone();
                debouncer
                    .listen(&cancel, || {
                        let n = count.fetch_add(1, Ordering::SeqCst);
                        let inner = inner.clone();
                        async move {
                            if n == 0 {
                                inner.trigger();
                            }
                            Ok::<(), ()>(())
                        }
                    })
                    .await
            })
        };

        debouncer.trigger();
        sleep(Duration::from_millis(500)).await;
        cancel.cancel();
        listener.await.unwrap().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
