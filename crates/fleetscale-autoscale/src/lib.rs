//! fleetscale-autoscale — queue-driven fleet sizing.
//!
//! One [`Autoscaler`] manages one labeled pool. Each tick it reads the
//! running fleet and the `tasks` queue depth, requests new nodes when the
//! backlog exceeds the fleet, and reclaims nodes idle for longer than
//! `idle_timeout`.
//!
//! # Scaling Algorithm
//!
//! ```text
//! nodes  = inventory.list(label)            // running only
//! ntasks = queue.depth("tasks")
//!
//! create = min(ntasks - len(nodes), max_nodes, max_nodes - len(nodes))
//! if create > 0:
//!     provisioner.create(label, create)
//!
//! for node in nodes:
//!     last_busy = tracker.last_busy_or_seed(node.address, now)
//!     effective = max(last_busy, node.created_at + startup_grace)
//!     if now - effective > idle_timeout:
//!         delete_set += node.name
//! if delete_set:
//!     provisioner.delete(delete_set)
//! ```
//!
//! Provisioning calls are awaited inside the tick, so a create or delete
//! batch in flight delays the next inventory and queue poll. Provisioning
//! failures are logged and corrected by the next tick; losing the broker
//! ends the loop.

pub mod decision;
pub mod error;
pub mod scaler;

pub use decision::{NodeIdleness, effective_last_busy, is_idle, scale_up_count};
pub use error::{AutoscaleError, AutoscaleResult};
pub use scaler::{Autoscaler, ScalerSettings, TickReport};
