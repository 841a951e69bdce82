//! Entity-keyed cost cache with lazy invalidation.
//!
//! Each catalog entity maps to a dirty-flagged contribution plus the workload
//! positions of the transactions that touch it. Invalidation only flips the
//! flag; recomputation happens on the next estimate that reads the entry.

use std::collections::{BTreeMap, BTreeSet};

use partcost_core::catalog::CatalogKey;
use partcost_core::id::{PartitionId, TxnId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CacheState {
    Valid(f64),
    /// Needs recomputation; the previous value is dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostCacheEntry {
    pub state: CacheState,
    /// Workload positions of the transactions that touch this entity.
    pub txns: BTreeSet<usize>,
}

impl CostCacheEntry {
    fn stale() -> Self {
        Self {
            state: CacheState::Stale,
            txns: BTreeSet::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.state, CacheState::Valid(_))
    }

    pub fn value(&self) -> Option<f64> {
        match self.state {
            CacheState::Valid(v) => Some(v),
            CacheState::Stale => None,
        }
    }
}

/// Cached evaluation of one transaction under the current design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxnCacheEntry {
    pub txn_id: TxnId,
    pub base_partition: PartitionId,
    /// Procedure, statements, and tables the transaction touched.
    pub entities: BTreeSet<CatalogKey>,
    pub read_partitions: BTreeSet<PartitionId>,
    pub write_partitions: BTreeSet<PartitionId>,
    /// Reads ∪ writes ∪ {base partition}.
    pub touched_partitions: BTreeSet<PartitionId>,
    pub single_sited: bool,
    pub cost: f64,
}

/// Counters for cache behaviour across estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub estimates: u64,
    pub txn_replays: u64,
    pub entity_recomputes: u64,
    pub invalidations: u64,
    /// Whole-cache drops caused by a new workload or partition count.
    pub resets: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct EntityCostCache {
    entries: BTreeMap<CatalogKey, CostCacheEntry>,
}

impl EntityCostCache {
    pub(crate) fn invalidate(&mut self, key: &CatalogKey) {
        match self.entries.get_mut(key) {
            Some(e) => e.state = CacheState::Stale,
            None => {
                self.entries.insert(key.clone(), CostCacheEntry::stale());
            }
        }
    }

    pub(crate) fn invalidate_all(&mut self) {
        for e in self.entries.values_mut() {
            e.state = CacheState::Stale;
        }
    }

    /// Insert a stale placeholder unless an entry exists.
    pub(crate) fn ensure(&mut self, key: &CatalogKey) {
        if !self.entries.contains_key(key) {
            self.entries.insert(key.clone(), CostCacheEntry::stale());
        }
    }

    pub(crate) fn stale_keys(&self) -> Vec<CatalogKey> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_valid())
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub(crate) fn txns_of(&self, key: &CatalogKey) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .get(key)
            .into_iter()
            .flat_map(|e| e.txns.iter().copied())
    }

    pub(crate) fn index(&mut self, key: &CatalogKey, txn: usize) {
        self.entries
            .entry(key.clone())
            .or_insert_with(CostCacheEntry::stale)
            .txns
            .insert(txn);
    }

    pub(crate) fn unindex(&mut self, key: &CatalogKey, txn: usize) {
        if let Some(e) = self.entries.get_mut(key) {
            e.txns.remove(&txn);
        }
    }

    pub(crate) fn set_valid(&mut self, key: &CatalogKey, value: f64) {
        if let Some(e) = self.entries.get_mut(key) {
            e.state = CacheState::Valid(value);
        }
    }

    pub(crate) fn get(&self, key: &CatalogKey) -> Option<&CostCacheEntry> {
        self.entries.get(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&CatalogKey, &CostCacheEntry)> {
        self.entries.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidate_creates_stale_placeholder() {
        let mut c = EntityCostCache::default();
        let key = CatalogKey::table("STOCK");
        c.invalidate(&key);
        assert_eq!(c.get(&key).map(|e| e.state), Some(CacheState::Stale));
        assert!(c.get(&key).is_some_and(|e| e.txns.is_empty()));
    }

    #[test]
    fn invalidate_keeps_txn_index() {
        let mut c = EntityCostCache::default();
        let key = CatalogKey::procedure("neworder");
        c.index(&key, 3);
        c.set_valid(&key, 2.5);
        assert_eq!(c.get(&key).and_then(CostCacheEntry::value), Some(2.5));
        c.invalidate(&key);
        assert_eq!(c.stale_keys(), vec![key.clone()]);
        assert_eq!(c.txns_of(&key).collect::<Vec<_>>(), vec![3]);
    }
}
