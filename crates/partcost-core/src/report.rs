//! Serializable summary of one workload cost estimation, for audit and for
//! comparing designs across a search run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::CatalogKey;
use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostReport {
    pub id: ReportId,

    /// Partition-layout fingerprint of the catalog used.
    pub catalog_hash: Hash256,

    /// Ordered workload fingerprint.
    pub workload_hash: Hash256,

    /// Digest of the weights the estimate ran with.
    pub weights_hash: Hash256,

    /// Version string for provenance.
    pub engine_version: String,

    pub total_cost: f64,
    pub txn_count: usize,
    pub single_sited_count: usize,
    pub multi_partition_count: usize,

    /// Cost attributed to each entity. Inspection only: a transaction that
    /// touches several entities appears in each of them, so these do not sum
    /// to `total_cost`.
    pub entity_costs: BTreeMap<CatalogKey, f64>,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl CostReport {
    pub fn new(
        catalog_hash: Hash256,
        workload_hash: Hash256,
        weights_hash: Hash256,
        started_ms: u64,
    ) -> Self {
        Self {
            id: ReportId(Uuid::new_v4()),
            catalog_hash,
            workload_hash,
            weights_hash,
            engine_version: crate::VERSION.to_string(),
            total_cost: 0.0,
            txn_count: 0,
            single_sited_count: 0,
            multi_partition_count: 0,
            entity_costs: BTreeMap::new(),
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64) -> Self {
        self.finished_ms = finished_ms;
        self
    }
}
