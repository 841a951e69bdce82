//! Graph vertices: one point in a procedure's control flow.

use std::collections::BTreeSet;

use partcost_core::id::{PartitionId, VertexId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexKind {
    Start,
    /// The `counter`-th execution of `statement` within the transaction.
    Query { statement: String, counter: u32 },
    Commit,
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub kind: VertexKind,
    /// Partitions read at this point.
    #[serde(default)]
    pub read_partitions: BTreeSet<PartitionId>,
    /// Partitions written at this point.
    #[serde(default)]
    pub write_partitions: BTreeSet<PartitionId>,
}

impl Vertex {
    pub fn new(id: VertexId, kind: VertexKind) -> Self {
        Self {
            id,
            kind,
            read_partitions: BTreeSet::new(),
            write_partitions: BTreeSet::new(),
        }
    }

    pub fn query(
        id: VertexId,
        statement: impl Into<String>,
        counter: u32,
        reads: impl IntoIterator<Item = PartitionId>,
        writes: impl IntoIterator<Item = PartitionId>,
    ) -> Self {
        Self {
            id,
            kind: VertexKind::Query {
                statement: statement.into(),
                counter,
            },
            read_partitions: reads.into_iter().collect(),
            write_partitions: writes.into_iter().collect(),
        }
    }

    pub fn is_commit(&self) -> bool {
        self.kind == VertexKind::Commit
    }

    pub fn is_abort(&self) -> bool {
        self.kind == VertexKind::Abort
    }

    pub fn is_terminal(&self) -> bool {
        self.is_commit() || self.is_abort()
    }

    /// Every partition touched here, read or write.
    pub fn partitions(&self) -> BTreeSet<PartitionId> {
        self.read_partitions
            .union(&self.write_partitions)
            .copied()
            .collect()
    }
}
