//! Pure scale-up and scale-down decision rules.

use std::time::Duration;

/// Idle assessment of one node at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdleness {
    pub name: String,
    pub address: String,
    /// Seconds since the effective last-busy time.
    pub age_secs: u64,
    /// Seconds until the node becomes eligible for deletion (negative once
    /// it is overdue).
    pub deletion_in_secs: i64,
    pub idle: bool,
}

/// Number of nodes to request this tick.
///
/// `min(ntasks - nnodes, max_nodes)`, further capped by the remaining
/// headroom `max_nodes - nnodes` so a decision never pushes the running
/// fleet past `max_nodes`. Zero means no creation request.
///
/// The headroom cap is intentional: it only differs from the plain formula
/// when `ntasks > max_nodes` and nodes already run, where the plain formula
/// would overshoot the ceiling (see "Scale-up ceiling" in DESIGN.md).
pub fn scale_up_count(nnodes: usize, ntasks: u64, max_nodes: u32) -> u32 {
    let nnodes = nnodes as i128;
    let max_nodes = i128::from(max_nodes);

    let nplus = (i128::from(ntasks) - nnodes).min(max_nodes);
    let headroom = max_nodes - nnodes;
    nplus.min(headroom).max(0) as u32
}

/// The last-busy time used for reclamation: never earlier than the end of
/// the node's startup grace period.
///
/// Timestamps are whole seconds, so a fractional grace rounds up.
pub fn effective_last_busy(last_busy: u64, created_at: u64, startup_grace: Duration) -> u64 {
    let grace_secs = startup_grace.as_secs() + u64::from(startup_grace.subsec_nanos() > 0);
    last_busy.max(created_at.saturating_add(grace_secs))
}

/// Strictly longer than `idle_timeout` without a busy signal.
pub fn is_idle(age_secs: u64, idle_timeout: Duration) -> bool {
    Duration::from_secs(age_secs) > idle_timeout
}
