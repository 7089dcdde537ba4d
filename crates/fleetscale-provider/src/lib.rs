//! fleetscale-provider — provisioning seam for the fleetscale control plane.
//!
//! The autoscaler sees the compute backend through two traits:
//!
//! - [`FleetInventory`]: lists the *running* nodes carrying a cluster
//!   label. Nodes mid-boot or mid-teardown are excluded, so counts err on
//!   the low side.
//! - [`NodeProvisioner`]: creates `count` nodes under a label in one
//!   batch, and deletes a set of nodes by name. Both wait for the backend
//!   to finish and return a [`ProvisionReport`] with one
//!   [`OperationReport`] per operation. Partial failure is reported, never
//!   raised.
//!
//! Backends:
//!
//! - [`GceProvider`]: Google Compute Engine REST API.
//! - [`MemoryFleet`]: in-process fleet for tests and local simulation.

pub mod error;
pub mod gce;
pub mod memory;
pub mod provider;

pub use error::{ProviderError, ProviderResult};
pub use gce::{GceProvider, GceSettings, MachineProfile};
pub use memory::MemoryFleet;
pub use provider::{FleetInventory, NodeProvisioner, OperationReport, ProvisionReport};
