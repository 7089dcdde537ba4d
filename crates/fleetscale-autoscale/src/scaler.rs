//! Autoscaler: the periodic fleet control loop.
//!
//! Each tick compares the `tasks` backlog with the running fleet, requests
//! new nodes through the provisioner, and deletes nodes whose effective
//! last-busy time is older than `idle_timeout`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use fleetscale_provider::{FleetInventory, NodeProvisioner, ProvisionReport};
use fleetscale_queue::QueueDepthProbe;
use fleetscale_state::{LivenessTracker, Node, ScaleDecision, SharedClock, SystemClock};

use crate::decision::{NodeIdleness, effective_last_busy, is_idle, scale_up_count};
use crate::error::{AutoscaleError, AutoscaleResult};

/// Fixed-at-startup parameters for one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalerSettings {
    /// Cluster label selecting the pool.
    pub label: String,
    /// Ceiling on the running fleet.
    pub max_nodes: u32,
    /// Maximum time without a busy signal before a node is reclaimed.
    pub idle_timeout: Duration,
    /// Minimum time after creation during which a node is never reclaimed.
    pub startup_grace: Duration,
    /// Target tick cadence.
    pub poll_interval: Duration,
    /// Queue whose depth drives scale-up.
    pub task_queue: String,
}

impl ScalerSettings {
    /// Settings with the stock `max_nodes`, grace, cadence and queue name.
    /// `idle_timeout` has no default and must always be given.
    pub fn new(label: impl Into<String>, idle_timeout: Duration) -> Self {
        Self {
            label: label.into(),
            max_nodes: 30,
            idle_timeout,
            startup_grace: Duration::from_secs(120),
            poll_interval: Duration::from_secs(10),
            task_queue: "tasks".to_string(),
        }
    }
}

/// What one tick observed and did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Running nodes in the inventory snapshot.
    pub nodes: usize,
    /// Ready messages on the task queue.
    pub tasks: u64,
    pub decision: ScaleDecision,
    /// Per-node idle assessment, in inventory order.
    pub idleness: Vec<NodeIdleness>,
    /// Outcome of the create batch, if one was requested and issued.
    pub created: Option<ProvisionReport>,
    /// Outcome of the delete batch, if one was requested and issued.
    pub deleted: Option<ProvisionReport>,
    /// Liveness records dropped for nodes no longer in the inventory.
    pub pruned: usize,
}

/// Sizes one labeled pool to the task backlog.
pub struct Autoscaler {
    settings: ScalerSettings,
    inventory: Arc<dyn FleetInventory>,
    provisioner: Arc<dyn NodeProvisioner>,
    queue: Arc<dyn QueueDepthProbe>,
    tracker: LivenessTracker,
    clock: SharedClock,
}

impl Autoscaler {
    pub fn new(
        settings: ScalerSettings,
        inventory: Arc<dyn FleetInventory>,
        provisioner: Arc<dyn NodeProvisioner>,
        queue: Arc<dyn QueueDepthProbe>,
        tracker: LivenessTracker,
    ) -> Self {
        Self {
            settings,
            inventory,
            provisioner,
            queue,
            tracker,
            clock: Arc::new(SystemClock),
        }
    }

    /// Read time from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &ScalerSettings {
        &self.settings
    }

    /// Assess every node in `nodes` at `now`.
    ///
    /// Nodes seen for the first time get a liveness record seeded to `now`.
    pub async fn assess(&self, nodes: &[Node], now: u64) -> Vec<NodeIdleness> {
        let grace = self.settings.startup_grace;
        let timeout = self.settings.idle_timeout;
        let mut out = Vec::with_capacity(nodes.len());

        for node in nodes {
            let last_busy = self.tracker.last_busy_or_seed(&node.address, now).await;
            let effective = effective_last_busy(last_busy, node.created_at, grace);
            let age_secs = now.saturating_sub(effective);
            let deletion_in_secs = timeout.as_secs() as i64 - age_secs as i64;

            debug!(
                node = %node.name,
                address = %node.address,
                age_secs,
                deletion_in_secs,
                "node idleness"
            );

            out.push(NodeIdleness {
                name: node.name.clone(),
                address: node.address.clone(),
                age_secs,
                deletion_in_secs,
                idle: is_idle(age_secs, timeout),
            });
        }
        out
    }

    /// Names of the nodes in `nodes` that are idle at `now`.
    pub async fn scale_down_set(&self, nodes: &[Node], now: u64) -> Vec<String> {
        self.assess(nodes, now)
            .await
            .into_iter()
            .filter(|n| n.idle)
            .map(|n| n.name)
            .collect()
    }

    /// Run one control iteration.
    pub async fn tick(&self) -> AutoscaleResult<TickReport> {
        let label = &self.settings.label;
        let started_at = self.clock.now();

        let nodes = self
            .inventory
            .list(label)
            .await
            .map_err(AutoscaleError::Inventory)?;
        let tasks = self.queue.depth(&self.settings.task_queue).await?;

        let mut report = TickReport {
            nodes: nodes.len(),
            tasks,
            ..TickReport::default()
        };

        // Scale up.
        let create_count = scale_up_count(nodes.len(), tasks, self.settings.max_nodes);
        report.decision.create_count = create_count;
        if create_count > 0 {
            info!(%label, count = create_count, nodes = nodes.len(), tasks, "scaling up");
            match self.provisioner.create(label, create_count).await {
                Ok(outcome) => {
                    outcome.log("create");
                    report.created = Some(outcome);
                }
                Err(e) => error!(%label, count = create_count, error = %e, "create request failed"),
            }
        }

        // Scale down, against the same inventory snapshot.
        let now = self.clock.now();
        report.idleness = self.assess(&nodes, now).await;
        let delete_set: Vec<String> = report
            .idleness
            .iter()
            .filter(|n| n.idle)
            .map(|n| n.name.clone())
            .collect();

        if !delete_set.is_empty() {
            info!(%label, nodes = ?delete_set, "reclaiming idle nodes");
            match self.provisioner.delete(&delete_set).await {
                Ok(outcome) => {
                    outcome.log("delete");
                    report.deleted = Some(outcome);
                }
                Err(e) => error!(%label, nodes = ?delete_set, error = %e, "delete request failed"),
            }
        }
        report.decision.delete_set = delete_set;

        // Records written after the snapshot belong to nodes it cannot see
        // yet, typically ones booted by this tick's create batch.
        let live: HashSet<&str> = nodes.iter().map(|n| n.address.as_str()).collect();
        report.pruned = self
            .tracker
            .retain(|address, last_busy| live.contains(address) || last_busy >= started_at)
            .await;

        info!(
            %label,
            nodes = report.nodes,
            tasks = report.tasks,
            create = report.decision.create_count,
            delete = report.decision.delete_set.len(),
            "autoscaler tick"
        );
        Ok(report)
    }

    /// Tick every `poll_interval` until shutdown or a fatal error.
    ///
    /// Time spent inside a tick is subtracted from the following sleep.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> AutoscaleResult<()> {
        info!(
            label = %self.settings.label,
            max_nodes = self.settings.max_nodes,
            idle_timeout_secs = self.settings.idle_timeout.as_secs(),
            startup_grace_secs = self.settings.startup_grace.as_secs(),
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            "autoscaler started"
        );

        loop {
            let started = Instant::now();

            match self.tick().await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "autoscaler stopping");
                    return Err(e);
                }
                Err(e) => warn!(error = %e, "autoscaler tick skipped"),
            }

            let pause = self.settings.poll_interval.saturating_sub(started.elapsed());
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = shutdown.changed() => {
                    info!("autoscaler shutting down");
                    return Ok(());
                }
            }
        }
    }
}
