//! fleetscale-state — shared state for the fleetscale control plane.
//!
//! Holds the node model as reported by the provisioning backend, the
//! [`LivenessTracker`] shared between the status ingestor and the
//! autoscaler, and the JSON codec for the `tasks` and `status` queues.
//!
//! # Architecture
//!
//! ```text
//! StatusIngestor ──mark_busy()──▶ LivenessTracker ◀──last_busy_or_seed()── Autoscaler
//!                                  (Arc<RwLock<HashMap<address, epoch secs>>>)
//! ```
//!
//! Time is read through the [`Clock`] trait so both loops can be driven
//! deterministically in tests with a [`ManualClock`].

pub mod clock;
pub mod codec;
pub mod error;
pub mod liveness;
pub mod types;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use codec::{decode_status, decode_task, encode_status, encode_task};
pub use error::{StateError, StateResult};
pub use liveness::LivenessTracker;
pub use types::*;
