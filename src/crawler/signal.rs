//! Cooperative stop signal
//!
//! A walk checks its [`StopSignal`] at step boundaries only. Waits between
//! steps and after clicks end early once stop is requested, but an in-flight
//! driver call always runs to completion.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Requests a walk to stop; cheap to clone and safe to use from any task
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes stop requests
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// A signal nobody can trigger
    pub fn never() -> Self {
        stop_channel().1
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleeps for `duration` unless stopped first
    ///
    /// # Returns
    ///
    /// `true` if the wait ended because stop was requested
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_stopped() {
            return true;
        }
        if duration.is_zero() {
            return false;
        }

        let mut rx = self.rx.clone();
        let stopped = async move {
            // A dropped handle can never request a stop
            if rx.wait_for(|stopped| *stopped).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = stopped => true,
        }
    }
}

/// Creates a connected handle/signal pair
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx: Arc::new(tx) }, StopSignal { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_stopped_initially() {
        let (_handle, signal) = stop_channel();
        assert!(!signal.is_stopped());
    }

    #[tokio::test]
    async fn test_stop_is_seen_by_clones() {
        let (handle, signal) = stop_channel();
        let other = signal.clone();
        handle.clone().stop();
        assert!(signal.is_stopped());
        assert!(other.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_runs_full_duration_without_stop() {
        let signal = StopSignal::never();
        let started = tokio::time::Instant::now();
        assert!(!signal.sleep(Duration::from_secs(5)).await);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_ends_early_on_stop() {
        let (handle, signal) = stop_channel();
        let started = tokio::time::Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.stop();
        });

        assert!(signal.sleep(Duration::from_secs(60)).await);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_sleep_after_stop_returns_immediately() {
        let (handle, signal) = stop_channel();
        handle.stop();
        assert!(signal.sleep(Duration::from_secs(3600)).await);
    }
}
