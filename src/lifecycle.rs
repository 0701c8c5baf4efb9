// ABOUTME: Supervised periodic task used by the scan loop and the background processor
// ABOUTME: Normal period vs. error backoff, panic isolation, and bounded-timeout stop
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Supervised background loops
//!
//! A loop body runs, then the loop rests for the normal period on success or
//! for the backoff period on error. Errors and panics inside the body are
//! logged and never end the loop. Stopping flips a `watch` signal that every
//! rest (and, optionally, the body itself) listens to, then joins the task
//! with a bounded timeout and aborts it if the timeout elapses.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Timing of a supervised loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSchedule {
    /// Rest after a successful iteration
    pub period: Duration,
    /// Rest after a failed or panicked iteration
    pub error_backoff: Duration,
    /// Whether a stop request cancels an iteration that is still running
    pub cancel_in_flight: bool,
}

/// How a stop request completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Task observed the signal and exited within the timeout
    Joined,
    /// Task did not exit in time and was aborted
    Aborted,
}

/// Handle to a running supervised loop
pub struct SupervisedLoop {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SupervisedLoop {
    /// Spawn a loop on the current tokio runtime
    pub fn spawn<F, Fut, E>(name: &'static str, schedule: LoopSchedule, mut body: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!(task = name, "Background loop started");
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                let iteration = AssertUnwindSafe(body()).catch_unwind();
                let outcome = if schedule.cancel_in_flight {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => break,
                        outcome = iteration => outcome,
                    }
                } else {
                    iteration.await
                };

                let rest = match outcome {
                    Ok(Ok(())) => schedule.period,
                    Ok(Err(e)) => {
                        error!(task = name, error = %e, "Loop iteration failed, backing off");
                        schedule.error_backoff
                    }
                    Err(payload) => {
                        error!(
                            task = name,
                            panic = %panic_message(payload.as_ref()),
                            "Loop iteration panicked, backing off"
                        );
                        schedule.error_backoff
                    }
                };

                debug!(task = name, rest_ms = rest.as_millis() as u64, "Loop resting");
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    () = tokio::time::sleep(rest) => {}
                }
            }
            info!(task = name, "Background loop exited");
        });

        Self {
            name,
            shutdown_tx,
            handle,
        }
    }

    /// Whether the task has already exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop to exit and wait at most `join_timeout` for it
    pub async fn stop(self, join_timeout: Duration) -> StopOutcome {
        // Receiver is gone only if the task already exited
        let _ = self.shutdown_tx.send(true);

        let mut handle = self.handle;
        match tokio::time::timeout(join_timeout, &mut handle).await {
            Ok(Ok(())) => StopOutcome::Joined,
            Ok(Err(e)) => {
                warn!(task = self.name, error = %e, "Background loop ended abnormally");
                StopOutcome::Joined
            }
            Err(_) => {
                warn!(
                    task = self.name,
                    timeout_ms = join_timeout.as_millis() as u64,
                    "Background loop did not stop in time, aborting"
                );
                handle.abort();
                StopOutcome::Aborted
            }
        }
    }
}

/// Render a panic payload for logging
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn schedule(period_secs: u64, backoff_secs: u64) -> LoopSchedule {
        LoopSchedule {
            period: Duration::from_secs(period_secs),
            error_backoff: Duration::from_secs(backoff_secs),
            cancel_in_flight: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_iteration_uses_backoff() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        let task = SupervisedLoop::spawn("test", schedule(30, 60), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("boom")
            }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Still resting: a 30s period would have rerun by now
        tokio::time::sleep(Duration::from_secs(40)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        assert_eq!(task.stop(Duration::from_secs(5)).await, StopOutcome::Joined);
    }

    #[tokio::test(start_paused = true)]
    #[allow(clippy::panic)]
    async fn test_panicking_iteration_keeps_loop_alive() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        let task = SupervisedLoop::spawn("test", schedule(1, 2), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first pass explodes");
                }
                Ok::<(), String>(())
            }
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(runs.load(Ordering::SeqCst) >= 2);
        assert!(!task.is_finished());
        assert_eq!(task.stop(Duration::from_secs(5)).await, StopOutcome::Joined);
    }
}
