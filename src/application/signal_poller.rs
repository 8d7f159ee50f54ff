// Live signal poller - periodically pulls the cycle time from the backend
use crate::application::instrument_backend::SignalSource;
use crate::domain::reading::SignalSample;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct SignalPoller {
    source: Arc<dyn SignalSource>,
    interval: Duration,
    latest: watch::Sender<Option<SignalSample>>,
}

impl SignalPoller {
    /// Create a poller and the receiver its samples are published on.
    pub fn new(
        source: Arc<dyn SignalSource>,
        interval: Duration,
    ) -> (Self, watch::Receiver<Option<SignalSample>>) {
        let (latest, rx) = watch::channel(None);
        let poller = Self {
            source,
            interval,
            latest,
        };
        (poller, rx)
    }

    pub fn spawn(self) -> PollerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            tracing::info!("Signal poller started (every {:?})", self.interval);
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => self.poll_once().await,
                }
            }
            tracing::info!("Signal poller stopped");
        });

        PollerHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn poll_once(&self) {
        match self.source.read_cycle_time().await {
            Ok(reading) => match reading.to_sample(Utc::now()) {
                Some(sample) => {
                    tracing::debug!(
                        "Cycle time {:.2}us over {} edges",
                        sample.signal_us,
                        sample.edge_count
                    );
                    self.latest.send_replace(Some(sample));
                }
                None => {
                    // Keep the last known signal; the gauge should not drop to zero.
                    tracing::debug!(
                        "No cycle time available: {}",
                        reading.message.as_deref().unwrap_or("no edges")
                    );
                }
            },
            Err(e) => tracing::warn!("Error polling cycle time: {}", e),
        }
    }
}

/// Cancellation handle for a running poller. Dropping it also stops the loop.
pub struct PollerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop polling and wait for the in-flight tick to finish.
    pub async fn cancel(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!("Signal poller task ended abnormally: {}", e);
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
