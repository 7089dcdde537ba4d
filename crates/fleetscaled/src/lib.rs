//! fleetscaled — the fleetscale daemon.
//!
//! Runs two loops against one labeled pool, sharing a liveness tracker:
//!
//! ```text
//!   status queue ──▶ StatusIngestor ──mark_busy──▶ LivenessTracker
//!                                                       │
//!   tasks queue ──depth──▶ Autoscaler ◀──last_busy──────┘
//!                              │
//!                   create / delete nodes
//!                              ▼
//!                     FleetInventory / NodeProvisioner
//! ```
//!
//! The binary wraps this library with a CLI; integration tests drive it
//! directly with in-memory backends.

pub mod api;
pub mod config;
pub mod daemon;

pub use config::{Config, ConfigError, ConfigResult};
pub use daemon::{BrokerHandle, Daemon, FleetHandle, submit_task};
