//! Structural checks for consumed graphs.
//!
//! These are cheap and run on every deserialized graph. Callers that build
//! graphs in memory can run them explicitly before handing a graph to a
//! cost model.

use partcost_core::error::{Error, Result};

use crate::graph::MarkovGraph;
use crate::vertex::VertexKind;

/// Slack allowed when outgoing probabilities are summed.
const PROBABILITY_EPSILON: f64 = 1e-6;

/// Verify terminal uniqueness, edge endpoints, and outgoing probabilities.
pub fn verify_graph(graph: &MarkovGraph) -> Result<()> {
    let name = graph.procedure();
    for (kind, expected) in [
        (VertexKind::Start, graph.start_vertex()),
        (VertexKind::Commit, graph.commit_vertex()),
        (VertexKind::Abort, graph.abort_vertex()),
    ] {
        let ids: Vec<_> = graph
            .vertices()
            .filter(|v| v.kind == kind)
            .map(|v| v.id)
            .collect();
        if ids != [expected] {
            return Err(Error::InconsistentGraph(format!(
                "'{name}' must have exactly one {kind:?} vertex ({expected}), found {ids:?}"
            )));
        }
    }

    for v in graph.vertices() {
        let out = graph.successors(v.id);
        if v.is_terminal() && !out.is_empty() {
            return Err(Error::InconsistentGraph(format!(
                "terminal vertex {} in '{name}' has outgoing edges",
                v.id
            )));
        }
        let mut total = 0.0;
        for e in out {
            if !graph.contains(e.to) {
                return Err(Error::InconsistentGraph(format!(
                    "edge {} -> {} in '{name}' points at an unknown vertex",
                    v.id, e.to
                )));
            }
            if !e.probability.is_finite() || e.probability < 0.0 {
                return Err(Error::InconsistentGraph(format!(
                    "edge {} -> {} in '{name}' has invalid probability {}",
                    v.id, e.to, e.probability
                )));
            }
            total += e.probability;
        }
        if total > 1.0 + PROBABILITY_EPSILON {
            return Err(Error::InconsistentGraph(format!(
                "outgoing probabilities of {} in '{name}' sum to {total}",
                v.id
            )));
        }
    }
    Ok(())
}
