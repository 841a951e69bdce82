//! Convenient re-exports for downstream crates.

pub use crate::catalog::{Catalog, CatalogKey, EntityKind, Procedure, Statement, Table};
pub use crate::config::{CostModelConfig, PenaltyWeights, SingleSitedWeights};
pub use crate::error::{Error, Result};
pub use crate::hash::Hash256;
pub use crate::id::{PartitionId, TxnId, VertexId};
pub use crate::report::{CostReport, ReportId};
pub use crate::workload::{QueryTrace, TransactionTrace, Workload};
