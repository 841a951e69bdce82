//! Per-transaction estimated/actual path bundle.

use partcost_core::id::{PartitionId, TxnId};
use serde::{Deserialize, Serialize};

use crate::path::Path;

/// Produced by the predictor once per transaction trace. Read-only to the
/// cost models, except that callers may edit either path for what-if runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPathState {
    pub txn_id: TxnId,
    pub procedure: String,
    pub base_partition: PartitionId,
    estimated: Path,
    actual: Path,
}

impl TransactionPathState {
    pub fn new(
        txn_id: TxnId,
        procedure: impl Into<String>,
        base_partition: PartitionId,
        estimated: Path,
        actual: Path,
    ) -> Self {
        Self {
            txn_id,
            procedure: procedure.into(),
            base_partition,
            estimated,
            actual,
        }
    }

    pub fn estimated_path(&self) -> &Path {
        &self.estimated
    }

    pub fn actual_path(&self) -> &Path {
        &self.actual
    }

    pub fn estimated_path_mut(&mut self) -> &mut Path {
        &mut self.estimated
    }

    pub fn actual_path_mut(&mut self) -> &mut Path {
        &mut self.actual
    }
}
