//! Partition estimation: which partitions a transaction and its queries
//! touch under the catalog's current partitioning design.
//!
//! The trait is the seam for alternative routing policies; the cost models
//! are generic over it.

use std::collections::BTreeSet;

use partcost_core::catalog::{Catalog, CatalogKey, Statement, Table};
use partcost_core::error::{Error, Result};
use partcost_core::id::PartitionId;
use partcost_core::workload::{QueryTrace, TransactionTrace};
use serde::{Deserialize, Serialize};

/// Partitions read and written by one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPartitions {
    pub read: BTreeSet<PartitionId>,
    pub write: BTreeSet<PartitionId>,
}

pub trait PartitionEstimator {
    /// Partition at which the transaction's invocation originates.
    fn base_partition(&self, catalog: &Catalog, txn: &TransactionTrace) -> Result<PartitionId>;

    /// Partitions one executed query touches.
    fn query_partitions(
        &self,
        catalog: &Catalog,
        base_partition: PartitionId,
        statement: &Statement,
        query: &QueryTrace,
    ) -> Result<QueryPartitions>;
}

/// Routes integer keys with `key mod num_partitions`.
///
/// - Replicated tables: reads stay on the base partition, writes go to every
///   partition.
/// - Partitioned tables: the partitions of the query's keys, or every
///   partition when the query carries no key or the table has no
///   partitioning column.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashPartitionEstimator;

impl HashPartitionEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn partition_for(key: i64, num_partitions: u32) -> PartitionId {
        // rem_euclid keeps negative keys in range.
        PartitionId::new(key.rem_euclid(i64::from(num_partitions)) as u32)
    }

    fn table_partitions(
        catalog: &Catalog,
        table: &Table,
        base_partition: PartitionId,
        keys: &[i64],
        is_write: bool,
    ) -> BTreeSet<PartitionId> {
        if table.replicated {
            return if is_write {
                catalog.all_partitions().collect()
            } else {
                BTreeSet::from([base_partition])
            };
        }
        if table.partition_column.is_none() || keys.is_empty() {
            return catalog.all_partitions().collect();
        }
        keys.iter()
            .map(|k| Self::partition_for(*k, catalog.num_partitions))
            .collect()
    }
}

fn require_partitions(catalog: &Catalog) -> Result<()> {
    if catalog.num_partitions == 0 {
        return Err(Error::Config("catalog declares zero partitions".into()));
    }
    Ok(())
}

impl PartitionEstimator for HashPartitionEstimator {
    fn base_partition(&self, catalog: &Catalog, txn: &TransactionTrace) -> Result<PartitionId> {
        require_partitions(catalog)?;
        let proc_ = catalog
            .procedure(&txn.procedure)
            .ok_or_else(|| Error::UnknownCatalogEntity(CatalogKey::procedure(&txn.procedure)))?;
        let partition = proc_
            .partition_param
            .and_then(|idx| txn.params.get(idx))
            .map(|v| Self::partition_for(*v, catalog.num_partitions))
            .unwrap_or(PartitionId::new(0));
        Ok(partition)
    }

    fn query_partitions(
        &self,
        catalog: &Catalog,
        base_partition: PartitionId,
        statement: &Statement,
        query: &QueryTrace,
    ) -> Result<QueryPartitions> {
        require_partitions(catalog)?;
        let mut out = QueryPartitions::default();
        for (names, is_write) in [
            (&statement.tables_read, false),
            (&statement.tables_written, true),
        ] {
            for name in names {
                let table = catalog
                    .table(name)
                    .ok_or_else(|| Error::UnknownCatalogEntity(CatalogKey::table(name)))?;
                let parts =
                    Self::table_partitions(catalog, table, base_partition, &query.keys, is_write);
                if is_write {
                    out.write.extend(parts);
                } else {
                    out.read.extend(parts);
                }
            }
        }
        Ok(out)
    }
}
