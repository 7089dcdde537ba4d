//! In-process broker with AMQP-like acknowledgement semantics.
//!
//! Messages move `ready → unacked → gone`. Rejecting with requeue, or
//! dropping the consumer that holds them, moves unacked messages back to
//! the front of `ready` flagged as redelivered. [`MemoryBroker::close`]
//! simulates a lost connection.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;

use crate::broker::{
    Acknowledger, Broker, Delivery, MessageConsumer, MessagePublisher, QueueDepthProbe,
};
use crate::error::{QueueError, QueueResult};

#[derive(Debug, Clone)]
struct Message {
    body: Vec<u8>,
    redelivered: bool,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Message>,
    /// delivery tag → (consumer id, message)
    unacked: HashMap<u64, (u64, Message)>,
}

#[derive(Debug, Default)]
struct Inner {
    queues: HashMap<String, QueueState>,
    next_tag: u64,
    next_consumer: u64,
    closed: bool,
}

impl Inner {
    fn check_open(&self) -> QueueResult<()> {
        if self.closed {
            Err(QueueError::Connection("broker connection closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn queue(&mut self, name: &str) -> &mut QueueState {
        self.queues.entry(name.to_string()).or_default()
    }

    /// Move every unacked message held by `consumer` back to the front of
    /// its queue, oldest first.
    fn requeue_consumer(&mut self, consumer: u64) -> usize {
        let mut moved = 0;
        for state in self.queues.values_mut() {
            let mut tags: Vec<u64> = state
                .unacked
                .iter()
                .filter(|(_, (owner, _))| *owner == consumer)
                .map(|(tag, _)| *tag)
                .collect();
            tags.sort_unstable();

            for tag in tags.into_iter().rev() {
                if let Some((_, mut msg)) = state.unacked.remove(&tag) {
                    msg.redelivered = true;
                    state.ready.push_front(msg);
                    moved += 1;
                }
            }
        }
        moved
    }
}

#[derive(Debug, Default)]
struct Shared {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory broker. Clones share the same queues.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing the broker connection: every pending and future
    /// operation fails with [`QueueError::Connection`].
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.notify.notify_waiters();
    }

    /// Messages delivered but not yet settled on `queue`.
    pub fn unacked_count(&self, queue: &str) -> usize {
        self.shared
            .lock()
            .queues
            .get(queue)
            .map_or(0, |q| q.unacked.len())
    }
}

#[async_trait]
impl QueueDepthProbe for MemoryBroker {
    async fn depth(&self, queue: &str) -> QueueResult<u64> {
        let inner = self.shared.lock();
        inner.check_open()?;
        Ok(inner.queues.get(queue).map_or(0, |q| q.ready.len() as u64))
    }
}

#[async_trait]
impl MessagePublisher for MemoryBroker {
    async fn publish(&self, queue: &str, payload: &[u8]) -> QueueResult<()> {
        {
            let mut inner = self.shared.lock();
            inner.check_open()?;
            inner.queue(queue).ready.push_back(Message {
                body: payload.to_vec(),
                redelivered: false,
            });
        }
        self.shared.notify.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn consume(&self, queue: &str, prefetch: u16) -> QueueResult<Box<dyn MessageConsumer>> {
        let id = {
            let mut inner = self.shared.lock();
            inner.check_open()?;
            inner.queue(queue);
            inner.next_consumer += 1;
            inner.next_consumer
        };
        debug!(%queue, consumer = id, prefetch, "memory consumer started");

        Ok(Box::new(MemoryConsumer {
            shared: Arc::clone(&self.shared),
            queue: queue.to_string(),
            id,
            prefetch,
        }))
    }
}

/// Consumer handle. Dropping it returns its unacked messages to the queue.
struct MemoryConsumer {
    shared: Arc<Shared>,
    queue: String,
    id: u64,
    prefetch: u16,
}

impl MemoryConsumer {
    fn try_take(&self) -> QueueResult<Option<Delivery>> {
        let mut inner = self.shared.lock();
        inner.check_open()?;

        inner.next_tag += 1;
        let tag = inner.next_tag;
        let id = self.id;
        let prefetch = self.prefetch;
        let state = inner.queue(&self.queue);

        if prefetch > 0 {
            let outstanding = state.unacked.values().filter(|(owner, _)| *owner == id).count();
            if outstanding >= prefetch as usize {
                return Ok(None);
            }
        }

        let Some(msg) = state.ready.pop_front() else {
            return Ok(None);
        };
        let delivery_body = msg.body.clone();
        let redelivered = msg.redelivered;
        state.unacked.insert(tag, (id, msg));

        let acker = MemoryAcker {
            shared: Arc::clone(&self.shared),
            queue: self.queue.clone(),
            tag,
        };
        Ok(Some(Delivery::new(delivery_body, redelivered, Box::new(acker))))
    }
}

#[async_trait]
impl MessageConsumer for MemoryConsumer {
    async fn next_delivery(&mut self) -> QueueResult<Option<Delivery>> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a publish in between is not lost.
            notified.as_mut().enable();

            if let Some(delivery) = self.try_take()? {
                return Ok(Some(delivery));
            }
            notified.await;
        }
    }
}

impl Drop for MemoryConsumer {
    fn drop(&mut self) {
        let moved = self.shared.lock().requeue_consumer(self.id);
        if moved > 0 {
            debug!(queue = %self.queue, consumer = self.id, moved, "requeued unacked deliveries");
            self.shared.notify.notify_waiters();
        }
    }
}

struct MemoryAcker {
    shared: Arc<Shared>,
    queue: String,
    tag: u64,
}

impl MemoryAcker {
    fn settle(&self, requeue: Option<bool>) -> QueueResult<()> {
        {
            let mut inner = self.shared.lock();
            inner.check_open()?;
            let state = inner.queue(&self.queue);
            let Some((_, mut msg)) = state.unacked.remove(&self.tag) else {
                return Err(QueueError::Ack(format!(
                    "unknown delivery tag {} on queue {}",
                    self.tag, self.queue
                )));
            };
            if requeue == Some(true) {
                msg.redelivered = true;
                state.ready.push_front(msg);
            }
        }
        // Frees a prefetch slot and possibly makes a message ready.
        self.shared.notify.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl Acknowledger for MemoryAcker {
    async fn ack(&self) -> QueueResult<()> {
        self.settle(None)
    }

    async fn reject(&self, requeue: bool) -> QueueResult<()> {
        self.settle(Some(requeue))
    }
}
