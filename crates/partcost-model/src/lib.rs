#![forbid(unsafe_code)]
//! partcost-model: cost models over a catalog snapshot and a workload.
//!
//! Two models live here:
//! - `SingleSitedCostModel`: aggregate workload cost (how much cross-partition
//!   coordination the workload needs under the current design), backed by an
//!   entity-keyed cache with selective invalidation.
//! - `MarkovCostModel`: scores how far a predicted execution path diverged
//!   from the actual one, as a weighted list of `Penalty` kinds.
//!
//! Both are synchronous `&mut self` value objects. Use one per evaluation
//! context; they hold "last computed" state and do no locking.

pub mod cache;
pub mod comparator;
pub mod estimator;
pub mod markov;
pub mod metrics;
pub mod penalty;
pub mod single_sited;

pub use cache::{CacheState, CacheStats, CostCacheEntry, TxnCacheEntry};
pub use comparator::{PathComparator, PathPartitions};
pub use estimator::{HashPartitionEstimator, PartitionEstimator, QueryPartitions};
pub use markov::MarkovCostModel;
pub use penalty::{Penalty, PenaltyHistogram};
pub use single_sited::SingleSitedCostModel;
