//! Generic start/stop/ticker scaffolding shared by every background
//! worker (spec §5: "each worker is a long-lived task with its own
//! ticker"). Not grounded in a single teacher file — the teacher's
//! `ConsolidationEngine` and friends are invoked engine-style, not
//! self-scheduled — so this is new infrastructure built from the
//! teacher's own async stack (`tokio::sync::watch`, `tokio::time`). See
//! DESIGN.md.

use std::future::Future;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

struct TickerInner {
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

/// A cancellable, budgeted ticker. `start` and `stop` are idempotent: a
/// second `start` while already running is a no-op, and a second `stop`
/// while already stopped is a no-op — this is what makes repeated
/// start/stop cycles leak-free (spec §8 concurrency properties).
pub struct Ticker {
    inner: StdMutex<TickerInner>,
}

impl Default for Ticker {
    fn default() -> Self {
        Self {
            inner: StdMutex::new(TickerInner {
                stop_tx: None,
                handle: None,
            }),
        }
    }
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the ticker if it isn't already running. `sweep` runs once per
    /// tick, bounded by `budget` (spec §5: "each tick establishes a bounded
    /// context").
    pub fn start<F, Fut>(&self, name: &'static str, tick: Duration, budget: Duration, sweep: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        if inner.handle.is_some() {
            return;
        }
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if tokio::time::timeout(budget, sweep()).await.is_err() {
                            tracing::warn!(worker = name, budget_secs = budget.as_secs(), "tick exceeded budget, sweep aborted");
                        }
                    }
                    _ = stop_rx.changed() => {
                        break;
                    }
                }
            }
            tracing::debug!(worker = name, "ticker loop exited");
        });
        inner.stop_tx = Some(stop_tx);
        inner.handle = Some(handle);
    }

    /// Stop the ticker if running. Finishes the in-flight sweep before
    /// returning (spec §5: "finishes the in-flight sweep, and joins").
    pub async fn stop(&self) {
        let (stop_tx, handle) = {
            let mut inner = self.inner.lock().unwrap();
            (inner.stop_tx.take(), inner.handle.take())
        };
        if let Some(tx) = stop_tx {
            let _ = tx.send(true);
        }
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().handle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread")]
    async fn start_stop_is_idempotent_and_leak_free() {
        let ticker = Arc::new(Ticker::new());
        let ticks = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let ticks = ticks.clone();
            ticker.start("test", Duration::from_millis(5), Duration::from_millis(50), move || {
                let ticks = ticks.clone();
                async move {
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            });
            // second start is a no-op
            ticker.start("test", Duration::from_millis(5), Duration::from_millis(50), || async {});
            assert!(ticker.is_running());
            ticker.stop().await;
            ticker.stop().await; // second stop is a no-op
            assert!(!ticker.is_running());
        }
    }
}
