//! Cancellable periodic task

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Runs `tick` every `period` until stopped. The first tick fires
/// immediately.
pub struct Poller {
    name: &'static str,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // A tick in flight also yields to cancellation.
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = tick() => {}
                        }
                    }
                }
            }
            tracing::debug!("{} poll loop stopped", name);
        });

        tracing::info!("Started {} polling every {}s", name, period.as_secs());
        Self {
            name,
            shutdown,
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel the loop and wait for it to wind down.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                tracing::error!("{} poll loop panicked: {}", self.name, e);
            }
        }
        tracing::info!("Stopped {} polling", self.name);
    }
}
