//! Status ingestor: consumes node status signals.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use fleetscale_queue::{Broker, Delivery, MessageConsumer};
use fleetscale_state::{LivenessTracker, SharedClock, decode_status};

use crate::error::{IngestError, IngestResult};

/// What happened to one status delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Busy signal; liveness refreshed.
    Busy,
    /// Idle signal; acknowledged without touching liveness.
    Idle,
    /// Malformed payload; rejected without requeue.
    Rejected,
}

/// Feeds status signals into the liveness tracker.
pub struct StatusIngestor {
    tracker: LivenessTracker,
    clock: SharedClock,
    queue: String,
    prefetch: u16,
}

impl StatusIngestor {
    pub fn new(tracker: LivenessTracker, clock: SharedClock) -> Self {
        Self {
            tracker,
            clock,
            queue: "status".to_string(),
            prefetch: 1,
        }
    }

    /// Consume a queue other than `status`.
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Process one delivery and settle it.
    ///
    /// Only a failed ack/reject is an error; a malformed payload is
    /// rejected and reported as [`SignalOutcome::Rejected`].
    pub async fn handle(&self, delivery: Delivery) -> IngestResult<SignalOutcome> {
        let signal = match decode_status(&delivery.body) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(
                    queue = %self.queue,
                    error = %e,
                    redelivered = delivery.redelivered,
                    "rejecting malformed status message"
                );
                delivery.reject(false).await?;
                return Ok(SignalOutcome::Rejected);
            }
        };

        debug!(
            address = %signal.address,
            task = ?signal.task_id,
            ram_pct = signal.ram_pct,
            cpu_pct = signal.cpu_pct,
            "status signal"
        );

        let outcome = if signal.is_busy() {
            self.tracker
                .mark_busy(&signal.address, self.clock.now())
                .await;
            SignalOutcome::Busy
        } else {
            SignalOutcome::Idle
        };

        delivery.ack().await?;
        Ok(outcome)
    }

    /// Drain `consumer` until shutdown, cancellation, or transport loss.
    pub async fn consume(
        &self,
        mut consumer: Box<dyn MessageConsumer>,
        mut shutdown: watch::Receiver<bool>,
    ) -> IngestResult<()> {
        loop {
            tokio::select! {
                next = consumer.next_delivery() => {
                    match next? {
                        Some(delivery) => {
                            self.handle(delivery).await?;
                        }
                        None => return Err(IngestError::Cancelled(self.queue.clone())),
                    }
                }
                _ = shutdown.changed() => {
                    info!(queue = %self.queue, "status ingestor shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Subscribe to the status queue on `broker` and run until shutdown.
    pub async fn run(
        &self,
        broker: &dyn Broker,
        shutdown: watch::Receiver<bool>,
    ) -> IngestResult<()> {
        let consumer = broker.consume(&self.queue, self.prefetch).await?;
        info!(queue = %self.queue, "status ingestor started");
        self.consume(consumer, shutdown).await
    }
}
