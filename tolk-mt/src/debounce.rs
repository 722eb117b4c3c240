//! Trailing-edge debouncer for use inside `tokio::select!`

use std::time::Duration;
use tokio::time::Instant;

/// Holds the latest scheduled value until `interval` passes without another
/// `schedule` call
///
/// `fired` resolves with that value. With nothing scheduled it never
/// resolves, which makes it safe to poll in a `select!` loop.
#[derive(Debug)]
pub struct Debouncer<T> {
    interval: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Replace any pending value and restart the timer
    pub fn schedule(&mut self, value: T) {
        self.pending = Some((Instant::now() + self.interval, value));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for the pending value
    ///
    /// Cancel safe: if the future is dropped before it resolves the value
    /// stays pending.
    pub async fn fired(&mut self) -> T {
        let Some(deadline) = self.pending.as_ref().map(|(deadline, _)| *deadline) else {
            return std::future::pending().await;
        };
        tokio::time::sleep_until(deadline).await;
        match self.pending.take() {
            Some((_, value)) => value,
            None => std::future::pending().await,
        }
    }
}
