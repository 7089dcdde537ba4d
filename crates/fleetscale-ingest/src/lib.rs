//! fleetscale-ingest — status signal ingestion.
//!
//! Consumes the `status` queue for the lifetime of the process and keeps
//! the [`LivenessTracker`](fleetscale_state::LivenessTracker) current:
//!
//! ```text
//! status queue ──▶ decode ──┬─ busy (task_id present) ─▶ mark_busy(address, now) ─▶ ack
//!                           ├─ idle (task_id null) ───────────────────────────────▶ ack
//!                           └─ malformed ─────────────────────────────▶ reject (no requeue)
//! ```
//!
//! Idle signals never refresh liveness. A delivery is acknowledged only
//! after the tracker update, so a crash mid-update leads to redelivery.
//! Losing the broker connection ends the loop with an error.

pub mod error;
pub mod ingestor;

pub use error::{IngestError, IngestResult};
pub use ingestor::{SignalOutcome, StatusIngestor};
