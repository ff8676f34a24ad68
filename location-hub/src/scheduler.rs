//! Private single-thread scheduled executor
//!
//! Spawns a thread with its own current-thread tokio runtime. Watchdog ticks
//! and retry timers run there, never on the threads of callers or of the
//! upstream connector. The runtime lives until the owning [`Scheduler`] is
//! dropped.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{HubError, Result};

/// Handle to a task queued on the [`Scheduler`]
///
/// Dropping the handle leaves the task running; call [`cancel`](Self::cancel)
/// to stop it.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: tokio::task::JoinHandle<()>,
}

impl ScheduledTask {
    /// Stop the task; a one-shot task that already ran is unaffected
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the task ran to completion or was cancelled
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Single-thread executor for delayed and periodic work
pub struct Scheduler {
    /// Spawns onto the worker's runtime
    handle: Handle,

    /// Stops the worker's runtime
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// Worker thread handle (kept alive)
    _worker: JoinHandle<()>,
}

impl Scheduler {
    /// Start the worker thread and wait until its runtime is ready
    pub fn start(name: &str) -> Result<Self> {
        let (handle_tx, handle_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!("Failed to create tokio runtime for scheduler: {}", e);
                        let _ = handle_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                let _ = handle_tx.send(Ok(rt.handle().clone()));

                tracing::debug!("Scheduler started");
                rt.block_on(async {
                    let _ = shutdown_rx.await;
                });
                tracing::debug!("Scheduler shut down");
            })
            .map_err(|e| HubError::Scheduler(e.to_string()))?;

        let handle = handle_rx
            .recv()
            .map_err(|_| HubError::Scheduler("scheduler thread exited during startup".to_string()))?
            .map_err(HubError::Scheduler)?;

        Ok(Self {
            handle,
            shutdown_tx: Some(shutdown_tx),
            _worker: worker,
        })
    }

    /// Run `task` once after `delay`
    pub fn schedule<F>(&self, delay: Duration, task: F) -> ScheduledTask
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = self.handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task();
        });
        ScheduledTask { handle }
    }

    /// Run `task` every `period`, first after `initial_delay`
    ///
    /// Ticks that fall behind are delayed rather than bunched up.
    pub fn schedule_at_fixed_rate<F>(
        &self,
        initial_delay: Duration,
        period: Duration,
        mut task: F,
    ) -> ScheduledTask
    where
        F: FnMut() + Send + 'static,
    {
        let handle = self.handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + initial_delay, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task();
            }
        });
        ScheduledTask { handle }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
