//! Cheap structural path comparison.
//!
//! Two paths are equivalent when they end in the same terminal and touch the
//! same read and write partitions overall. Vertex order and repetition do not
//! matter: partition-set union is idempotent and order-independent.

use std::collections::BTreeSet;

use partcost_core::error::Result;
use partcost_core::id::{PartitionId, VertexId};
use partcost_markov::{MarkovGraph, Path};
use serde::{Deserialize, Serialize};

/// Read/write partition unions for an (estimated, actual) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPartitions {
    pub estimated_read: BTreeSet<PartitionId>,
    pub estimated_write: BTreeSet<PartitionId>,
    pub actual_read: BTreeSet<PartitionId>,
    pub actual_write: BTreeSet<PartitionId>,
}

impl PathPartitions {
    pub fn sets_match(&self) -> bool {
        self.estimated_read == self.actual_read && self.estimated_write == self.actual_write
    }
}

/// Identity of the pair the retained sets were computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PairKey {
    procedure: String,
    base_partition: PartitionId,
    revision: u64,
    estimated: Vec<VertexId>,
    actual: Vec<VertexId>,
}

impl PairKey {
    fn new(graph: &MarkovGraph, estimated: &Path, actual: &Path) -> Self {
        Self {
            procedure: graph.procedure().to_string(),
            base_partition: graph.base_partition(),
            revision: graph.revision(),
            estimated: estimated.as_slice().to_vec(),
            actual: actual.as_slice().to_vec(),
        }
    }

    fn matches(&self, graph: &MarkovGraph, estimated: &Path, actual: &Path) -> bool {
        self.procedure == graph.procedure()
            && self.base_partition == graph.base_partition()
            && self.revision == graph.revision()
            && self.estimated == estimated.as_slice()
            && self.actual == actual.as_slice()
    }
}

/// Stateful comparator. Keeps the partition sets of the most recent pair (a
/// one-slot cache, not a history) so a following full comparison of the same
/// pair can reuse them.
#[derive(Debug, Clone, Default)]
pub struct PathComparator {
    last: PathPartitions,
    last_pair: Option<PairKey>,
}

/// Union of read and write partitions across a validated path.
pub fn partition_unions(
    graph: &MarkovGraph,
    path: &Path,
) -> (BTreeSet<PartitionId>, BTreeSet<PartitionId>) {
    let mut read = BTreeSet::new();
    let mut write = BTreeSet::new();
    for v in path.resolve(graph) {
        read.extend(v.read_partitions.iter().copied());
        write.extend(v.write_partitions.iter().copied());
    }
    (read, write)
}

impl PathComparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast equivalence check. The first path is treated as the estimate and
    /// the second as the actual path for the retained-set accessors.
    ///
    /// Fails with `MalformedPath` for an empty or non-terminal-ending path and
    /// with `InconsistentGraph` for vertices outside `graph`; retained state
    /// is left untouched on failure.
    pub fn compare_paths_fast(
        &mut self,
        graph: &MarkovGraph,
        estimated: &Path,
        actual: &Path,
    ) -> Result<bool> {
        let e_commit = estimated.validate(graph)?.is_commit();
        let a_commit = actual.validate(graph)?.is_commit();

        // Sets are retained even on a terminal mismatch so a full comparison
        // of the same pair can reuse them.
        let (estimated_read, estimated_write) = partition_unions(graph, estimated);
        let (actual_read, actual_write) = partition_unions(graph, actual);
        self.last = PathPartitions {
            estimated_read,
            estimated_write,
            actual_read,
            actual_write,
        };
        self.last_pair = Some(PairKey::new(graph, estimated, actual));

        if e_commit != a_commit {
            return Ok(false);
        }
        Ok(self.last.sets_match())
    }

    /// Whether the retained sets were computed for exactly this pair against
    /// the graph as it is now.
    pub fn is_current(&self, graph: &MarkovGraph, estimated: &Path, actual: &Path) -> bool {
        self.last_pair
            .as_ref()
            .is_some_and(|k| k.matches(graph, estimated, actual))
    }

    /// Forget the retained pair; the next full comparison recomputes.
    pub fn reset(&mut self) {
        self.last = PathPartitions::default();
        self.last_pair = None;
    }

    pub fn last_partitions(&self) -> &PathPartitions {
        &self.last
    }

    pub fn last_estimated_read_partitions(&self) -> &BTreeSet<PartitionId> {
        &self.last.estimated_read
    }

    pub fn last_actual_read_partitions(&self) -> &BTreeSet<PartitionId> {
        &self.last.actual_read
    }

    pub fn last_estimated_write_partitions(&self) -> &BTreeSet<PartitionId> {
        &self.last.estimated_write
    }

    pub fn last_actual_write_partitions(&self) -> &BTreeSet<PartitionId> {
        &self.last.actual_write
    }

    /// What-if edits. They stick until the next comparison of a different pair.
    pub fn last_estimated_read_partitions_mut(&mut self) -> &mut BTreeSet<PartitionId> {
        &mut self.last.estimated_read
    }

    pub fn last_actual_read_partitions_mut(&mut self) -> &mut BTreeSet<PartitionId> {
        &mut self.last.actual_read
    }

    pub fn last_estimated_write_partitions_mut(&mut self) -> &mut BTreeSet<PartitionId> {
        &mut self.last.estimated_write
    }

    pub fn last_actual_write_partitions_mut(&mut self) -> &mut BTreeSet<PartitionId> {
        &mut self.last.actual_write
    }
}
