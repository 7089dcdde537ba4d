//! Broker traits and the acknowledged [`Delivery`] type.

use std::fmt;

use async_trait::async_trait;

use crate::error::QueueResult;

/// Reports the number of messages waiting on a queue.
#[async_trait]
pub trait QueueDepthProbe: Send + Sync {
    /// Messages ready for delivery on `queue`. Messages already delivered
    /// but not yet acknowledged are not counted.
    async fn depth(&self, queue: &str) -> QueueResult<u64>;
}

/// Publishes persistent messages to a named queue.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, queue: &str, payload: &[u8]) -> QueueResult<()>;
}

/// A stream of deliveries from one queue.
#[async_trait]
pub trait MessageConsumer: Send {
    /// Wait for the next delivery.
    ///
    /// Returns `Ok(None)` when the broker cancelled the consumer and
    /// `Err(QueueError::Connection)` when the transport was lost.
    async fn next_delivery(&mut self) -> QueueResult<Option<Delivery>>;
}

/// A full broker backend.
#[async_trait]
pub trait Broker: QueueDepthProbe + MessagePublisher {
    /// Start consuming `queue` with at most `prefetch` unacknowledged
    /// deliveries outstanding (0 = unlimited).
    async fn consume(&self, queue: &str, prefetch: u16) -> QueueResult<Box<dyn MessageConsumer>>;
}

/// Backend-specific settlement of one delivery.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> QueueResult<()>;
    async fn reject(&self, requeue: bool) -> QueueResult<()>;
}

/// A message received from a queue, pending settlement.
///
/// Settling consumes the delivery, so each one is acked or rejected at
/// most once.
pub struct Delivery {
    pub body: Vec<u8>,
    /// Whether the broker delivered this message before.
    pub redelivered: bool,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(body: Vec<u8>, redelivered: bool, acker: Box<dyn Acknowledger>) -> Self {
        Self {
            body,
            redelivered,
            acker,
        }
    }

    /// Positive acknowledgement; the broker forgets the message.
    pub async fn ack(self) -> QueueResult<()> {
        self.acker.ack().await
    }

    /// Negative acknowledgement. With `requeue = false` the message is
    /// dropped (or dead-lettered, if the broker is set up for it).
    pub async fn reject(self, requeue: bool) -> QueueResult<()> {
        self.acker.reject(requeue).await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("body_len", &self.body.len())
            .field("redelivered", &self.redelivered)
            .finish()
    }
}
