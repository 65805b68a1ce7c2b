// ============================
// aidlink-login-guard/src/sweep.rs
// ============================
//! Background task that periodically sweeps stale attempt records.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::limiter::LoginAttemptLimiter;

/// Handle to the recurring sweep task.
///
/// The task runs until `shutdown` is called or the handle is dropped.
#[derive(Debug)]
pub struct Sweeper {
    task: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn a task that sweeps the limiter once per interval.
    ///
    /// The first sweep happens one full interval after spawn.
    pub fn spawn(limiter: LoginAttemptLimiter, every: Duration) -> Self {
        tracing::debug!("Starting login-attempt sweep task, interval {every:?}");

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(every).await;
                limiter.sweep_expired();
            }
        });

        Self { task }
    }

    /// Stop the sweep task.
    ///
    /// An in-progress sweep pass finishes; the task just never wakes
    /// from its next sleep.
    pub fn shutdown(self) {
        self.task.abort();
        tracing::debug!("Stopped login-attempt sweep task");
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.task.abort();
    }
}
