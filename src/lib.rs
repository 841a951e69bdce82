#![forbid(unsafe_code)]
//! partcost: workload cost estimation for partitioned OLTP designs.
//!
//! Facade over the workspace crates; most callers only need the two cost
//! models and the core vocabulary re-exported here.

pub use partcost_core;
pub use partcost_markov;
pub use partcost_model;

pub use partcost_core::prelude::*;
pub use partcost_markov::{MarkovGraph, MarkovGraphsContainer, Path, TransactionPathState};
pub use partcost_model::{
    HashPartitionEstimator, MarkovCostModel, PartitionEstimator, Penalty, SingleSitedCostModel,
};
