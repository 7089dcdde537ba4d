//! Liveness tracker: per-address last-busy timestamps.
//!
//! Written by the status ingestor (`mark_busy`) and read by the
//! autoscaler (`last_busy_or_seed`, `age_since_busy`). Each lookup is
//! consistent for one address; no snapshot consistency is offered across
//! the whole map within a tick.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::types::LivenessRecord;

/// Shared map of node address → last busy time (epoch seconds).
///
/// Cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct LivenessTracker {
    records: Arc<RwLock<HashMap<String, u64>>>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `address` was busy at `at`.
    ///
    /// Unconditional overwrite: an earlier `at` than the stored value is
    /// accepted as-is.
    pub async fn mark_busy(&self, address: &str, at: u64) {
        let mut records = self.records.write().await;
        records.insert(address.to_string(), at);
        debug!(%address, at, "node marked busy");
    }

    /// Last busy time for `address`, if it has ever been observed.
    pub async fn last_busy(&self, address: &str) -> Option<u64> {
        self.records.read().await.get(address).copied()
    }

    /// Last busy time for `address`, seeding it to `now` on first sight.
    pub async fn last_busy_or_seed(&self, address: &str, now: u64) -> u64 {
        if let Some(at) = self.last_busy(address).await {
            return at;
        }

        // A concurrent writer may have inserted between the two locks.
        let mut records = self.records.write().await;
        *records.entry(address.to_string()).or_insert(now)
    }

    /// Seconds since `address` was last busy (0 if in the future).
    pub async fn age_since_busy(&self, address: &str, now: u64) -> u64 {
        now.saturating_sub(self.last_busy_or_seed(address, now).await)
    }

    /// Drop every record for which `keep(address, last_busy)` is false.
    ///
    /// Returns the number of records removed.
    pub async fn retain<F>(&self, keep: F) -> usize
    where
        F: Fn(&str, u64) -> bool,
    {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|address, last_busy| keep(address, *last_busy));
        before - records.len()
    }

    /// All records, sorted by address.
    pub async fn snapshot(&self) -> Vec<LivenessRecord> {
        let records = self.records.read().await;
        let mut out: Vec<LivenessRecord> = records
            .iter()
            .map(|(address, last_busy)| LivenessRecord {
                address: address.clone(),
                last_busy: *last_busy,
            })
            .collect();
        out.sort_by(|a, b| a.address.cmp(&b.address));
        out
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
