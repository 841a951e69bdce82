//! Paths through an execution-path graph.

use partcost_core::error::{Error, Result};
use partcost_core::id::VertexId;
use serde::{Deserialize, Serialize};

use crate::graph::MarkovGraph;
use crate::vertex::Vertex;

/// Ordered vertex ids from a procedure's entry to Commit or Abort.
///
/// Estimated and actual paths share this type; provenance is tracked by the
/// holder (`TransactionPathState`), not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    vertices: Vec<VertexId>,
}

impl Path {
    pub fn new(vertices: Vec<VertexId>) -> Self {
        Self { vertices }
    }

    pub fn push(&mut self, v: VertexId) {
        self.vertices.push(v);
    }

    pub fn pop(&mut self) -> Option<VertexId> {
        self.vertices.pop()
    }

    /// Replace the trailing vertex, e.g. to force a different terminal.
    /// Returns the vertex that was replaced.
    pub fn set_last(&mut self, v: VertexId) -> Option<VertexId> {
        let last = self.vertices.last_mut()?;
        Some(std::mem::replace(last, v))
    }

    pub fn last(&self) -> Option<VertexId> {
        self.vertices.last().copied()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn as_slice(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn iter(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().copied()
    }

    /// Check that the path is non-empty, every vertex belongs to `graph`, and
    /// it ends in a terminal. Returns the resolved terminal vertex.
    pub fn validate<'g>(&self, graph: &'g MarkovGraph) -> Result<&'g Vertex> {
        if self.vertices.is_empty() {
            return Err(Error::MalformedPath(format!(
                "empty path for '{}'",
                graph.procedure()
            )));
        }
        for (pos, id) in self.vertices.iter().enumerate() {
            if !graph.contains(*id) {
                return Err(Error::InconsistentGraph(format!(
                    "vertex {id} at position {pos} is not part of the '{}' graph",
                    graph.procedure()
                )));
            }
        }
        let last = self
            .last()
            .and_then(|id| graph.vertex(id))
            .ok_or_else(|| Error::Invariant("validated path lost its last vertex".into()))?;
        if !last.is_terminal() {
            return Err(Error::MalformedPath(format!(
                "path for '{}' ends at non-terminal vertex {}",
                graph.procedure(),
                last.id
            )));
        }
        Ok(last)
    }

    /// Resolve every vertex against `graph`. Assumes `validate` passed.
    pub fn resolve<'a>(&'a self, graph: &'a MarkovGraph) -> impl Iterator<Item = &'a Vertex> + 'a {
        self.vertices.iter().filter_map(move |id| graph.vertex(*id))
    }
}

impl From<Vec<VertexId>> for Path {
    fn from(vertices: Vec<VertexId>) -> Self {
        Self::new(vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partcost_core::id::PartitionId;

    fn graph() -> (MarkovGraph, VertexId) {
        let mut g = MarkovGraph::new("payment", PartitionId::new(0));
        let q = g.add_query_vertex("getWarehouse", 0, [PartitionId::new(0)], []);
        (g, q)
    }

    #[test]
    fn empty_path_is_malformed() {
        let (g, _) = graph();
        assert!(matches!(
            Path::default().validate(&g),
            Err(Error::MalformedPath(_))
        ));
    }

    #[test]
    fn non_terminal_tail_is_malformed() {
        let (g, q) = graph();
        let path = Path::new(vec![g.start_vertex(), q]);
        assert!(matches!(path.validate(&g), Err(Error::MalformedPath(_))));
    }

    #[test]
    fn foreign_vertex_is_inconsistent() {
        let (g, q) = graph();
        let path = Path::new(vec![g.start_vertex(), q, VertexId::new(77), g.commit_vertex()]);
        assert!(matches!(path.validate(&g), Err(Error::InconsistentGraph(_))));
    }

    #[test]
    fn set_last_swaps_terminal() {
        let (g, q) = graph();
        let mut path = Path::new(vec![g.start_vertex(), q, g.commit_vertex()]);
        assert_eq!(path.set_last(g.abort_vertex()), Some(g.commit_vertex()));
        assert!(path.validate(&g).unwrap().is_abort());
    }
}
