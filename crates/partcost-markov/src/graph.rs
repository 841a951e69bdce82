//! Per-procedure execution-path graph.
//!
//! Every graph is created with its Start, Commit and Abort vertices; callers
//! only add query vertices and transition edges. Serialized as flat vertex and
//! edge lists, and verified on load.

use std::collections::BTreeMap;

use partcost_core::error::{Error, Result};
use partcost_core::id::{PartitionId, VertexId};
use serde::{Deserialize, Serialize};

use crate::path::Path;
use crate::vertex::{Vertex, VertexKind};

/// Observed transition between two vertices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub to: VertexId,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GraphDoc", into = "GraphDoc")]
pub struct MarkovGraph {
    procedure: String,
    base_partition: PartitionId,
    vertices: BTreeMap<VertexId, Vertex>,
    edges: BTreeMap<VertexId, Vec<Edge>>,
    start: VertexId,
    commit: VertexId,
    abort: VertexId,
    next_id: u64,
    /// Bumped on every structural or vertex edit. Not serialized.
    revision: u64,
}

/// Revisions are local edit counters, so equality ignores them.
impl PartialEq for MarkovGraph {
    fn eq(&self, other: &Self) -> bool {
        self.procedure == other.procedure
            && self.base_partition == other.base_partition
            && self.vertices == other.vertices
            && self.edges == other.edges
            && self.start == other.start
            && self.commit == other.commit
            && self.abort == other.abort
            && self.next_id == other.next_id
    }
}

impl MarkovGraph {
    pub fn new(procedure: impl Into<String>, base_partition: PartitionId) -> Self {
        let start = VertexId::new(0);
        let commit = VertexId::new(1);
        let abort = VertexId::new(2);
        let mut vertices = BTreeMap::new();
        vertices.insert(start, Vertex::new(start, VertexKind::Start));
        vertices.insert(commit, Vertex::new(commit, VertexKind::Commit));
        vertices.insert(abort, Vertex::new(abort, VertexKind::Abort));
        Self {
            procedure: procedure.into(),
            base_partition,
            vertices,
            edges: BTreeMap::new(),
            start,
            commit,
            abort,
            next_id: 3,
            revision: 0,
        }
    }

    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn base_partition(&self) -> PartitionId {
        self.base_partition
    }

    pub fn start_vertex(&self) -> VertexId {
        self.start
    }

    pub fn commit_vertex(&self) -> VertexId {
        self.commit
    }

    pub fn abort_vertex(&self) -> VertexId {
        self.abort
    }

    /// Edit counter. Changes whenever a vertex or edge is added or a vertex
    /// is handed out mutably.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Add a query vertex and return its freshly assigned id.
    pub fn add_query_vertex(
        &mut self,
        statement: impl Into<String>,
        counter: u32,
        reads: impl IntoIterator<Item = PartitionId>,
        writes: impl IntoIterator<Item = PartitionId>,
    ) -> VertexId {
        let id = VertexId::new(self.next_id);
        self.next_id += 1;
        self.revision += 1;
        self.vertices
            .insert(id, Vertex::query(id, statement, counter, reads, writes));
        id
    }

    /// Record a transition `from -> to`. Both ends must already exist.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, probability: f64) -> Result<()> {
        for v in [from, to] {
            if !self.vertices.contains_key(&v) {
                return Err(Error::InconsistentGraph(format!(
                    "edge {from} -> {to} references unknown vertex {v} in '{}'",
                    self.procedure
                )));
            }
        }
        self.revision += 1;
        let out = self.edges.entry(from).or_default();
        match out.iter_mut().find(|e| e.to == to) {
            Some(e) => e.probability = probability,
            None => out.push(Edge { to, probability }),
        }
        Ok(())
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    /// Mutable access for what-if analysis (e.g. adding a partition to a
    /// vertex). Bumps the revision, so the next comparison against this
    /// graph recomputes its partition sets.
    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        let vertex = self.vertices.get_mut(&id)?;
        self.revision += 1;
        Some(vertex)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn successors(&self, id: VertexId) -> &[Edge] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges(&self) -> impl Iterator<Item = (VertexId, &Edge)> {
        self.edges
            .iter()
            .flat_map(|(from, out)| out.iter().map(move |e| (*from, e)))
    }

    /// Most-likely path from Start: repeatedly follow the highest-probability
    /// edge (ties go to the lower vertex id) until a terminal is reached.
    pub fn greedy_path(&self) -> Result<Path> {
        let mut path = Path::new(vec![self.start]);
        let mut cur = self.start;
        // A simple path visits each vertex at most once.
        for _ in 0..self.vertices.len() {
            let next = self
                .successors(cur)
                .iter()
                .max_by(|a, b| {
                    a.probability
                        .total_cmp(&b.probability)
                        .then_with(|| b.to.cmp(&a.to))
                })
                .map(|e| e.to)
                .ok_or_else(|| {
                    Error::InconsistentGraph(format!(
                        "vertex {cur} in '{}' has no outgoing edge and is not terminal",
                        self.procedure
                    ))
                })?;
            path.push(next);
            if next == self.commit || next == self.abort {
                return Ok(path);
            }
            cur = next;
        }
        Err(Error::InconsistentGraph(format!(
            "greedy walk in '{}' did not reach a terminal vertex",
            self.procedure
        )))
    }
}

/// Flat serde form of a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphDoc {
    procedure: String,
    base_partition: PartitionId,
    vertices: Vec<Vertex>,
    #[serde(default)]
    edges: Vec<EdgeDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EdgeDoc {
    from: VertexId,
    to: VertexId,
    probability: f64,
}

impl From<MarkovGraph> for GraphDoc {
    fn from(g: MarkovGraph) -> Self {
        let edges = g
            .edges()
            .map(|(from, e)| EdgeDoc {
                from,
                to: e.to,
                probability: e.probability,
            })
            .collect();
        GraphDoc {
            procedure: g.procedure,
            base_partition: g.base_partition,
            vertices: g.vertices.into_values().collect(),
            edges,
        }
    }
}

impl TryFrom<GraphDoc> for MarkovGraph {
    type Error = Error;

    fn try_from(doc: GraphDoc) -> Result<Self> {
        let find_unique = |kind: VertexKind| -> Result<VertexId> {
            let mut hits = doc.vertices.iter().filter(|v| v.kind == kind);
            match (hits.next(), hits.next()) {
                (Some(v), None) => Ok(v.id),
                (None, _) => Err(Error::InconsistentGraph(format!(
                    "'{}' has no {kind:?} vertex",
                    doc.procedure
                ))),
                (Some(_), Some(_)) => Err(Error::InconsistentGraph(format!(
                    "'{}' has more than one {kind:?} vertex",
                    doc.procedure
                ))),
            }
        };
        let start = find_unique(VertexKind::Start)?;
        let commit = find_unique(VertexKind::Commit)?;
        let abort = find_unique(VertexKind::Abort)?;

        let mut vertices = BTreeMap::new();
        for v in doc.vertices {
            let id = v.id;
            if vertices.insert(id, v).is_some() {
                return Err(Error::InconsistentGraph(format!(
                    "duplicate vertex id {id} in '{}'",
                    doc.procedure
                )));
            }
        }
        let next_id = vertices.keys().next_back().map_or(0, |id| id.get() + 1);

        let mut graph = MarkovGraph {
            procedure: doc.procedure,
            base_partition: doc.base_partition,
            vertices,
            edges: BTreeMap::new(),
            start,
            commit,
            abort,
            next_id,
            revision: 0,
        };
        for e in doc.edges {
            graph.add_edge(e.from, e.to, e.probability)?;
        }
        crate::verify::verify_graph(&graph)?;
        Ok(graph)
    }
}

/// All graphs for a workload, keyed by (base partition, procedure).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<MarkovGraph>", into = "Vec<MarkovGraph>")]
pub struct MarkovGraphsContainer {
    graphs: BTreeMap<(PartitionId, String), MarkovGraph>,
}

impl MarkovGraphsContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a graph, replacing any previous graph for the same key.
    pub fn insert(&mut self, graph: MarkovGraph) -> Option<MarkovGraph> {
        self.graphs
            .insert((graph.base_partition, graph.procedure.clone()), graph)
    }

    pub fn get(&self, base_partition: PartitionId, procedure: &str) -> Option<&MarkovGraph> {
        self.graphs.get(&(base_partition, procedure.to_string()))
    }

    pub fn get_mut(
        &mut self,
        base_partition: PartitionId,
        procedure: &str,
    ) -> Option<&mut MarkovGraph> {
        self.graphs.get_mut(&(base_partition, procedure.to_string()))
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkovGraph> {
        self.graphs.values()
    }
}

impl From<Vec<MarkovGraph>> for MarkovGraphsContainer {
    fn from(graphs: Vec<MarkovGraph>) -> Self {
        let mut c = Self::new();
        for g in graphs {
            c.insert(g);
        }
        c
    }
}

impl From<MarkovGraphsContainer> for Vec<MarkovGraph> {
    fn from(c: MarkovGraphsContainer) -> Self {
        c.graphs.into_values().collect()
    }
}
