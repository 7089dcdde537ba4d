//! Provisioning traits and operation reports.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use fleetscale_state::Node;

use crate::error::ProviderResult;

/// Lists the running nodes of one labeled pool.
#[async_trait]
pub trait FleetInventory: Send + Sync {
    async fn list(&self, label: &str) -> ProviderResult<Vec<Node>>;
}

/// Creates and deletes nodes, waiting for each batch to complete.
#[async_trait]
pub trait NodeProvisioner: Send + Sync {
    /// Create `count` nodes under `label` as one batched request.
    async fn create(&self, label: &str, count: u32) -> ProviderResult<ProvisionReport>;

    /// Delete the named nodes and wait for every deletion to finish.
    async fn delete(&self, names: &[String]) -> ProviderResult<ProvisionReport>;
}

/// Outcome of one backend operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationReport {
    /// What the operation acted on (node name, or the batch description).
    pub target: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl OperationReport {
    pub fn succeeded(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn failed(target: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            errors: vec![error.into()],
            warnings: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of a create or delete batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub operations: Vec<OperationReport>,
}

impl ProvisionReport {
    pub fn push(&mut self, op: OperationReport) {
        self.operations.push(op);
    }

    pub fn error_count(&self) -> usize {
        self.operations.iter().map(|op| op.errors.len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.operations.iter().map(|op| op.warnings.len()).sum()
    }

    /// Targets whose operation finished without errors.
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.operations
            .iter()
            .filter(|op| op.is_ok())
            .map(|op| op.target.as_str())
    }

    /// Log every error and warning against its target, then a summary.
    pub fn log(&self, action: &str) {
        for op in &self.operations {
            for e in &op.errors {
                error!(%action, node = %op.target, error = %e, "provisioning error");
            }
            for w in &op.warnings {
                warn!(%action, node = %op.target, warning = %w, "provisioning warning");
            }
        }
        info!(
            %action,
            operations = self.operations.len(),
            errors = self.error_count(),
            warnings = self.warning_count(),
            "provisioning batch finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts_and_successes() {
        let mut report = ProvisionReport::default();
        report.push(OperationReport::succeeded("node-1"));
        report.push(OperationReport::failed("node-2", "QUOTA_EXCEEDED"));
        report.push(OperationReport {
            target: "node-3".to_string(),
            errors: Vec::new(),
            warnings: vec!["slow".to_string()],
        });

        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        let ok: Vec<_> = report.succeeded().collect();
        assert_eq!(ok, ["node-1", "node-3"]);
    }
}
