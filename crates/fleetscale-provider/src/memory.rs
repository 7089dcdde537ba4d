//! In-process fleet backend.
//!
//! Nodes are created `Running` immediately, stamped with the injected
//! clock. Every create/delete call is recorded so tests can assert on
//! exactly what the autoscaler asked for.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use fleetscale_state::{Node, NodeStatus, SharedClock};

use crate::error::ProviderResult;
use crate::provider::{FleetInventory, NodeProvisioner, OperationReport, ProvisionReport};

#[derive(Debug, Default)]
struct FleetState {
    nodes: BTreeMap<String, Node>,
    next_index: u32,
    create_calls: Vec<(String, u32)>,
    delete_calls: Vec<Vec<String>>,
    /// When set, every operation reports this error and has no effect.
    failure: Option<String>,
}

/// In-memory fleet. Clones share the same nodes and call log.
#[derive(Clone)]
pub struct MemoryFleet {
    state: Arc<Mutex<FleetState>>,
    clock: SharedClock,
}

impl MemoryFleet {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            state: Arc::new(Mutex::new(FleetState::default())),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FleetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add (or replace) a node directly, bypassing `create`.
    pub fn insert(&self, node: Node) {
        self.lock().nodes.insert(node.name.clone(), node);
    }

    /// Change a node's status. Returns false if the node is unknown.
    pub fn set_status(&self, name: &str, status: NodeStatus) -> bool {
        match self.lock().nodes.get_mut(name) {
            Some(node) => {
                node.status = status;
                true
            }
            None => false,
        }
    }

    /// Every node regardless of label or status.
    pub fn nodes(&self) -> Vec<Node> {
        self.lock().nodes.values().cloned().collect()
    }

    /// `(label, count)` of each create call, in order.
    pub fn create_calls(&self) -> Vec<(String, u32)> {
        self.lock().create_calls.clone()
    }

    /// Names passed to each delete call, in order.
    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.lock().delete_calls.clone()
    }

    /// Make every subsequent operation fail with `reason` (or succeed
    /// again with `None`).
    pub fn fail_operations(&self, reason: Option<&str>) {
        self.lock().failure = reason.map(str::to_string);
    }
}

#[async_trait]
impl FleetInventory for MemoryFleet {
    async fn list(&self, label: &str) -> ProviderResult<Vec<Node>> {
        Ok(self
            .lock()
            .nodes
            .values()
            .filter(|n| n.label == label && n.status.is_running())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NodeProvisioner for MemoryFleet {
    async fn create(&self, label: &str, count: u32) -> ProviderResult<ProvisionReport> {
        let now = self.clock.now();
        let mut state = self.lock();
        state.create_calls.push((label.to_string(), count));

        let mut report = ProvisionReport::default();
        if let Some(reason) = state.failure.clone() {
            report.push(OperationReport::failed(format!("{label} x{count}"), reason));
            return Ok(report);
        }

        for _ in 0..count {
            state.next_index += 1;
            let idx = state.next_index;
            let node = Node {
                name: format!("{label}-{idx:06}"),
                address: format!("10.0.{}.{}", idx / 256, idx % 256),
                created_at: now,
                label: label.to_string(),
                status: NodeStatus::Running,
            };
            debug!(node = %node.name, address = %node.address, "memory node created");
            report.push(OperationReport::succeeded(node.name.clone()));
            state.nodes.insert(node.name.clone(), node);
        }
        Ok(report)
    }

    async fn delete(&self, names: &[String]) -> ProviderResult<ProvisionReport> {
        let mut state = self.lock();
        state.delete_calls.push(names.to_vec());

        let mut report = ProvisionReport::default();
        for name in names {
            if let Some(reason) = state.failure.clone() {
                report.push(OperationReport::failed(name.clone(), reason));
            } else if state.nodes.remove(name).is_some() {
                report.push(OperationReport::succeeded(name.clone()));
            } else {
                report.push(OperationReport::failed(name.clone(), "node not found"));
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fleetscale_state::ManualClock;

    use super::*;

    fn fleet() -> (MemoryFleet, ManualClock) {
        let clock = ManualClock::new(1000);
        (MemoryFleet::new(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn create_adds_running_nodes_stamped_now() {
        let (fleet, clock) = fleet();
        clock.set(1234);

        let report = fleet.create("batch", 3).await.unwrap();
        assert_eq!(report.operations.len(), 3);
        assert_eq!(report.error_count(), 0);

        let nodes = fleet.list("batch").await.unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|n| n.created_at == 1234));
        assert_eq!(fleet.create_calls(), vec![("batch".to_string(), 3)]);
    }

    #[tokio::test]
    async fn list_filters_label_and_status() {
        let (fleet, _) = fleet();
        fleet.create("a", 2).await.unwrap();
        fleet.create("b", 1).await.unwrap();

        let first = fleet.list("a").await.unwrap()[0].name.clone();
        assert!(fleet.set_status(&first, NodeStatus::Stopping));

        assert_eq!(fleet.list("a").await.unwrap().len(), 1);
        assert_eq!(fleet.list("b").await.unwrap().len(), 1);
        assert_eq!(fleet.nodes().len(), 3);
    }

    #[tokio::test]
    async fn delete_reports_unknown_nodes_without_aborting() {
        let (fleet, _) = fleet();
        fleet.create("a", 1).await.unwrap();
        let name = fleet.list("a").await.unwrap()[0].name.clone();

        let report = fleet
            .delete(&["ghost".to_string(), name.clone()])
            .await
            .unwrap();

        assert_eq!(report.error_count(), 1);
        assert_eq!(report.succeeded().collect::<Vec<_>>(), [name.as_str()]);
        assert!(fleet.list("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_failure_is_reported_not_raised() {
        let (fleet, _) = fleet();
        fleet.fail_operations(Some("ZONE_RESOURCE_POOL_EXHAUSTED"));

        let report = fleet.create("a", 2).await.unwrap();
        assert_eq!(report.error_count(), 1);
        assert!(fleet.nodes().is_empty());

        fleet.fail_operations(None);
        let report = fleet.create("a", 2).await.unwrap();
        assert_eq!(report.error_count(), 0);
    }
}
