//! Aggregate workload cost: how much of the workload needs cross-partition
//! coordination under the catalog's partitioning design.
//!
//! A design-search loop calls `estimate_workload_cost` after every catalog
//! mutation and invalidates only the entities that mutation affected. The
//! result never depends on which entries were invalidated, only on when
//! the work is done:
//! - a transaction is replayed when it has no cached entry or touches a
//!   stale entity;
//! - entity contributions are recomputed from the transaction entries;
//! - the total is summed once per transaction, in workload order.

use std::collections::{BTreeMap, BTreeSet};

use partcost_core::catalog::{Catalog, CatalogKey};
use partcost_core::config::{CostModelConfig, SingleSitedWeights};
use partcost_core::error::{Error, Result};
use partcost_core::hash::{hash_serde, Hash256};
use partcost_core::id::PartitionId;
use partcost_core::report::CostReport;
use partcost_core::workload::{TransactionTrace, Workload};

use crate::cache::{CacheStats, EntityCostCache, TxnCacheEntry};
use crate::estimator::{HashPartitionEstimator, PartitionEstimator};
use crate::metrics::emit_span;

pub struct SingleSitedCostModel<E: PartitionEstimator = HashPartitionEstimator> {
    weights: SingleSitedWeights,
    estimator: E,
    /// Entities of the catalog the model is bound to.
    known: BTreeSet<CatalogKey>,
    entities: EntityCostCache,
    /// Indexed by workload position.
    txns: Vec<Option<TxnCacheEntry>>,
    catalog_fp: Option<Hash256>,
    workload_fp: Option<Hash256>,
    last_total: Option<f64>,
    stats: CacheStats,
}

impl SingleSitedCostModel<HashPartitionEstimator> {
    pub fn new(catalog: &Catalog, config: &CostModelConfig) -> Result<Self> {
        Self::with_estimator(catalog, config, HashPartitionEstimator)
    }
}

impl<E: PartitionEstimator> SingleSitedCostModel<E> {
    /// Validates every weight in `config`; bad weights fail here, not while estimating.
    pub fn with_estimator(
        catalog: &Catalog,
        config: &CostModelConfig,
        estimator: E,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            weights: config.single_sited.clone(),
            estimator,
            known: catalog.entity_keys().into_iter().collect(),
            entities: EntityCostCache::default(),
            txns: Vec::new(),
            catalog_fp: None,
            workload_fp: None,
            last_total: None,
            stats: CacheStats::default(),
        })
    }

    pub fn weights(&self) -> &SingleSitedWeights {
        &self.weights
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Mark `key`'s cached contribution stale. Nothing is recomputed until the
    /// next estimate. Entities with no entry get a stale placeholder.
    pub fn invalidate_cache(&mut self, key: &CatalogKey) -> Result<()> {
        if !self.known.contains(key) {
            return Err(Error::UnknownCatalogEntity(key.clone()));
        }
        self.entities.invalidate(key);
        self.stats.invalidations += 1;

        #[cfg(feature = "tracing")]
        tracing::trace!(entity = %key, "invalidated cost cache entry");

        Ok(())
    }

    /// Mark every cached entity stale.
    pub fn invalidate_all(&mut self) {
        self.entities.invalidate_all();
        self.stats.invalidations += 1;
    }

    /// Drop all cached state; the next estimate replays the whole workload.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.txns.clear();
        self.catalog_fp = None;
        self.workload_fp = None;
        self.last_total = None;
    }

    /// Total coordination cost of `workload` under `catalog`'s design.
    ///
    /// On error the cache is cleared, so a failed estimate never leaves
    /// half-replayed entries behind.
    pub fn estimate_workload_cost(
        &mut self,
        catalog: &Catalog,
        workload: &Workload,
    ) -> Result<f64> {
        match self.refresh(catalog, workload) {
            Ok(total) => Ok(total),
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    fn refresh(&mut self, catalog: &Catalog, workload: &Workload) -> Result<f64> {
        self.stats.estimates += 1;

        let catalog_fp = catalog.fingerprint();
        let workload_fp = workload.fingerprint();
        if self.catalog_fp != Some(catalog_fp) || self.workload_fp != Some(workload_fp) {
            if self.catalog_fp.is_some() {
                self.stats.resets += 1;
            }
            self.entities.clear();
            self.txns.clear();
            self.catalog_fp = Some(catalog_fp);
            self.workload_fp = Some(workload_fp);
        }

        self.known = catalog.entity_keys().into_iter().collect();
        for key in &self.known {
            self.entities.ensure(key);
        }
        self.txns.resize(workload.len(), None);

        // Phase 1: transactions that must be replayed.
        let stale = self.entities.stale_keys();
        let mut dirty: BTreeSet<usize> = BTreeSet::new();
        for key in &stale {
            dirty.extend(self.entities.txns_of(key));
        }
        dirty.extend(
            self.txns
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_none())
                .map(|(idx, _)| idx),
        );

        // Phase 2: replay them in workload order and re-index.
        let mut affected: BTreeSet<CatalogKey> = stale.into_iter().collect();
        let replays = dirty.len();
        for idx in dirty {
            let entry = self.estimate_transaction_cost(catalog, &workload.transactions[idx])?;
            if let Some(old) = self.txns[idx].take() {
                for key in &old.entities {
                    self.entities.unindex(key, idx);
                    affected.insert(key.clone());
                }
            }
            for key in &entry.entities {
                self.entities.index(key, idx);
                affected.insert(key.clone());
            }
            self.txns[idx] = Some(entry);
        }
        self.stats.txn_replays += replays as u64;

        // Phase 3: entity contributions, for inspection.
        for key in &affected {
            let mut contribution = 0.0;
            for idx in self.entities.txns_of(key) {
                contribution += self.cached_cost(idx)?;
            }
            self.entities.set_valid(key, contribution);
        }
        self.stats.entity_recomputes += affected.len() as u64;

        // Phase 4: one term per transaction, in workload order.
        let mut total = 0.0;
        for idx in 0..self.txns.len() {
            total += self.cached_cost(idx)?;
        }
        self.last_total = Some(total);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            txns = workload.len(),
            replays,
            recomputed_entities = affected.len(),
            total,
            "estimated workload cost"
        );
        emit_span(
            "single_sited_estimate",
            &[
                ("txns", workload.len().to_string()),
                ("replays", replays.to_string()),
                ("entities", affected.len().to_string()),
            ],
        );

        Ok(total)
    }

    fn cached_cost(&self, idx: usize) -> Result<f64> {
        self.txns
            .get(idx)
            .and_then(Option::as_ref)
            .map(|e| e.cost)
            .ok_or_else(|| Error::Invariant(format!("transaction #{idx} has no cache entry")))
    }

    /// Evaluate one transaction from scratch. Does not touch the cache.
    pub fn estimate_transaction_cost(
        &self,
        catalog: &Catalog,
        txn: &TransactionTrace,
    ) -> Result<TxnCacheEntry> {
        let proc_ = catalog
            .procedure(&txn.procedure)
            .ok_or_else(|| Error::UnknownCatalogEntity(CatalogKey::procedure(&txn.procedure)))?;
        let base_partition = self.estimator.base_partition(catalog, txn)?;

        let mut entities = BTreeSet::from([CatalogKey::procedure(proc_.name.as_str())]);
        let mut read_partitions = BTreeSet::new();
        let mut write_partitions = BTreeSet::new();
        for query in &txn.queries {
            let stmt = proc_.statement(&query.statement).ok_or_else(|| {
                Error::UnknownCatalogEntity(CatalogKey::statement(&proc_.name, &query.statement))
            })?;
            entities.insert(CatalogKey::statement(&proc_.name, &stmt.name));
            entities.extend(
                stmt.tables_read
                    .iter()
                    .chain(&stmt.tables_written)
                    .map(CatalogKey::table),
            );
            let parts = self
                .estimator
                .query_partitions(catalog, base_partition, stmt, query)?;
            read_partitions.extend(parts.read);
            write_partitions.extend(parts.write);
        }

        let mut touched_partitions: BTreeSet<PartitionId> =
            read_partitions.union(&write_partitions).copied().collect();
        touched_partitions.insert(base_partition);
        let single_sited = touched_partitions.len() == 1;
        let cost = if single_sited {
            self.weights.single_partition_cost
        } else {
            let remote = (touched_partitions.len() - 1) as f64;
            self.weights.multi_partition_cost + self.weights.remote_partition_cost * remote
        };

        Ok(TxnCacheEntry {
            txn_id: txn.txn_id,
            base_partition,
            entities,
            read_partitions,
            write_partitions,
            touched_partitions,
            single_sited,
            cost,
        })
    }

    /// Cached contribution of `key`, or `None` if it is stale or unknown.
    pub fn entity_cost(&self, key: &CatalogKey) -> Option<f64> {
        self.entities.get(key).and_then(|e| e.value())
    }

    /// Every valid entity contribution. A transaction is attributed to every
    /// entity it touches, so these overlap and do not sum to the total.
    pub fn entity_costs(&self) -> BTreeMap<CatalogKey, f64> {
        self.entities
            .iter()
            .filter_map(|(k, e)| e.value().map(|v| (k.clone(), v)))
            .collect()
    }

    pub fn is_cached(&self, key: &CatalogKey) -> bool {
        self.entities.get(key).is_some_and(|e| e.is_valid())
    }

    pub fn transaction_entry(&self, idx: usize) -> Option<&TxnCacheEntry> {
        self.txns.get(idx).and_then(Option::as_ref)
    }

    pub fn transaction_entries(&self) -> impl Iterator<Item = &TxnCacheEntry> {
        self.txns.iter().flatten()
    }

    /// Number of cached transactions touching each partition.
    pub fn partition_histogram(&self) -> BTreeMap<PartitionId, u64> {
        let mut hist = BTreeMap::new();
        for entry in self.transaction_entries() {
            for p in &entry.touched_partitions {
                *hist.entry(*p).or_default() += 1;
            }
        }
        hist
    }

    pub fn single_sited_count(&self) -> usize {
        self.transaction_entries().filter(|e| e.single_sited).count()
    }

    pub fn multi_partition_count(&self) -> usize {
        self.transaction_entries().filter(|e| !e.single_sited).count()
    }

    pub fn last_total(&self) -> Option<f64> {
        self.last_total
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Summarize the most recent estimate of `workload` under `catalog`.
    pub fn report(
        &self,
        catalog: &Catalog,
        workload: &Workload,
        started_ms: u64,
        finished_ms: u64,
    ) -> Result<CostReport> {
        let catalog_hash = catalog.fingerprint();
        let workload_hash = workload.fingerprint();
        let total_cost = match self.last_total {
            Some(t)
                if self.catalog_fp == Some(catalog_hash)
                    && self.workload_fp == Some(workload_hash) =>
            {
                t
            }
            _ => {
                return Err(Error::Invariant(
                    "report requested before estimating this workload".into(),
                ))
            }
        };
        let weights_hash = hash_serde(&self.weights)?;
        let mut report = CostReport::new(catalog_hash, workload_hash, weights_hash, started_ms);
        report.total_cost = total_cost;
        report.txn_count = workload.len();
        report.single_sited_count = self.single_sited_count();
        report.multi_partition_count = self.multi_partition_count();
        report.entity_costs = self.entity_costs();
        Ok(report.finish(finished_ms))
    }
}
