//! Repeating timer primitive
//!
//! A [`PeriodicTask`] runs an async callback on a fixed period in its own
//! tokio task. Ticks of one task never overlap: the next tick is only taken
//! once the callback has finished. A callback that overruns its period is
//! followed by one full period of rest; missed ticks are never made up. Tasks stop when their cancellation token
//! fires, when [`PeriodicTask::stop`] is called, or when the handle drops.

use crate::error::ZooError;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Owned handle to a running periodic task
pub struct PeriodicTask {
    label: String,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `callback` every `period`, first tick immediately.
    ///
    /// `token` is usually a child of an owner's token, so cancelling the
    /// owner stops the task as well.
    pub fn spawn<F, Fut>(
        label: impl Into<String>,
        period: Duration,
        token: CancellationToken,
        mut callback: F,
    ) -> Result<Self, ZooError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let label = label.into();
        if period.is_zero() {
            return Err(ZooError::InvalidTiming(format!(
                "period of {} must be non-zero",
                label
            )));
        }
        let runtime = Handle::try_current().map_err(|_| ZooError::NoRuntime(label.clone()))?;

        let task_token = token.clone();
        let task_label = label.clone();
        let handle = runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let fired = tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    at = ticker.tick() => at,
                };

                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = callback() => {}
                }

                if fired.elapsed() >= period {
                    ticker.reset();
                }
            }

            debug!("Timer {} stopped", task_label);
        });

        debug!("Timer {} started (period {:?})", label, period);

        Ok(Self {
            label,
            token,
            handle,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Request the task to stop; takes effect at its next suspension point
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the task and wait until it has exited
    pub async fn shutdown(mut self) {
        self.token.cancel();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
