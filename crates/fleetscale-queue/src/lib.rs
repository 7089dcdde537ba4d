//! fleetscale-queue — broker seam for the fleetscale control plane.
//!
//! The control plane talks to two durable queues:
//!
//! - `tasks`: `(task_id, cmdline)` work items; the autoscaler only reads
//!   its depth, workers consume it.
//! - `status`: `(address, task_id|null, ram_pct, cpu_pct)` signals; the
//!   status ingestor consumes it.
//!
//! Consumers acknowledge explicitly. A delivery that is never acknowledged
//! (consumer crash, connection loss) is redelivered; one that has been
//! acknowledged never is.
//!
//! Two backends implement the [`Broker`] trait:
//!
//! - [`AmqpBroker`]: RabbitMQ over AMQP 0-9-1.
//! - [`MemoryBroker`]: in-process, for tests and local simulation.

pub mod amqp;
pub mod broker;
pub mod error;
pub mod memory;

pub use amqp::AmqpBroker;
pub use broker::{
    Acknowledger, Broker, Delivery, MessageConsumer, MessagePublisher, QueueDepthProbe,
};
pub use error::{QueueError, QueueResult};
pub use memory::MemoryBroker;
