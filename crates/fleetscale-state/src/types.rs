//! Domain types for the fleetscale control plane.
//!
//! Nodes are owned by the provisioning backend; the control plane only
//! holds per-tick snapshots of them and never mutates them directly.

use serde::{Deserialize, Serialize};

/// Name of a node as known to the provisioning backend. Deletion key.
pub type NodeName = String;

/// Network address of a node. Liveness key.
pub type NodeAddress = String;

// ── Node ───────────────────────────────────────────────────────────

/// Backend-reported lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Provisioning,
    Running,
    Stopping,
    Terminated,
}

impl NodeStatus {
    /// Only running nodes are part of the fleet inventory.
    pub fn is_running(self) -> bool {
        self == NodeStatus::Running
    }
}

/// A snapshot of one compute node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: NodeName,
    pub address: NodeAddress,
    /// Unix timestamp (seconds) when the backend created the node.
    pub created_at: u64,
    /// Cluster label the node belongs to.
    pub label: String,
    pub status: NodeStatus,
}

// ── Liveness ───────────────────────────────────────────────────────

/// Last time a node was known to be busy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessRecord {
    pub address: NodeAddress,
    /// Unix timestamp (seconds).
    pub last_busy: u64,
}

// ── Queue payloads ─────────────────────────────────────────────────

/// A periodic status report published by a worker node.
///
/// A present `task_id` means the node is busy; an absent one means idle.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSignal {
    pub address: NodeAddress,
    pub task_id: Option<String>,
    pub ram_pct: f64,
    pub cpu_pct: f64,
}

impl StatusSignal {
    pub fn is_busy(&self) -> bool {
        self.task_id.is_some()
    }
}

/// A unit of work placed on the `tasks` queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMessage {
    pub task_id: String,
    pub cmdline: String,
}

// ── Decisions ──────────────────────────────────────────────────────

/// What one controller tick decided to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScaleDecision {
    /// Number of nodes to create (0 = no creation request).
    pub create_count: u32,
    /// Names of nodes to delete (empty = no deletion request).
    pub delete_set: Vec<NodeName>,
}

impl ScaleDecision {
    pub fn is_noop(&self) -> bool {
        self.create_count == 0 && self.delete_set.is_empty()
    }
}
