//! Periodic background purging of expired state.
//!
//! Sweeps run on their own tokio tasks, off the request path. A target's
//! `sweep` must take the same per-key locks as its foreground operations.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// State that can drop its expired entries.
pub trait Sweep: Send + Sync + 'static {
    /// Purge expired entries, returning how many were removed.
    fn sweep(&self) -> usize;
}

/// Owns the background sweep tasks and stops them on shutdown.
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Sweeper {
    /// Create a sweeper with no tasks.
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Sweep `target` every `every` until shutdown.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: Sweep>(&self, name: &'static str, target: Arc<S>, every: Duration) {
        let mut shutdown = self.shutdown.subscribe();
        let every = every.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = target.sweep();
                        if purged > 0 {
                            debug!(sweep = name, purged = purged, "Purged expired entries");
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }

            debug!(sweep = name, "Sweep stopped");
        });

        info!(sweep = name, interval_ms = every.as_millis() as u64, "Started background sweep");
        self.tasks.lock().push(handle);
    }

    /// Number of running sweep tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Signal every sweep to stop and wait for them to finish.
    pub async fn shutdown(&self) {
        // No receivers left just means every task already ended
        let _ = self.shutdown.send(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Sweep task ended abnormally");
            }
        }
    }
}

impl Default for Sweeper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTarget {
        runs: AtomicUsize,
    }

    impl Sweep for CountingTarget {
        fn sweep(&self) -> usize {
            self.runs.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    #[tokio::test]
    async fn test_sweeper_runs_periodically() {
        let target = Arc::new(CountingTarget::default());
        let sweeper = Sweeper::new();

        sweeper.spawn("counting", target.clone(), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(target.runs.load(Ordering::SeqCst) >= 2);
        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_sweeps() {
        let target = Arc::new(CountingTarget::default());
        let sweeper = Sweeper::new();

        sweeper.spawn("counting", target.clone(), Duration::from_millis(5));
        assert_eq!(sweeper.task_count(), 1);

        sweeper.shutdown().await;
        assert_eq!(sweeper.task_count(), 0);

        let runs = target.runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(target.runs.load(Ordering::SeqCst), runs);
    }

    #[tokio::test]
    async fn test_first_sweep_waits_one_interval() {
        let target = Arc::new(CountingTarget::default());
        let sweeper = Sweeper::new();

        sweeper.spawn("counting", target.clone(), Duration::from_secs(3600));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(target.runs.load(Ordering::SeqCst), 0);
        sweeper.shutdown().await;
    }
}
