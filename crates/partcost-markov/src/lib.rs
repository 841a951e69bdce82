#![forbid(unsafe_code)]
//! partcost-markov: the per-procedure execution-path graph and the paths
//! that walk it.
//!
//! Graphs are trained elsewhere and consumed here read-only, apart from the
//! what-if edits tests and analysts make through `vertex_mut`. A `Path` is a
//! sequence of vertex ids into one graph; it never owns vertices.

pub mod graph;
pub mod path;
pub mod state;
pub mod verify;
pub mod vertex;

pub use graph::{Edge, MarkovGraph, MarkovGraphsContainer};
pub use path::Path;
pub use state::TransactionPathState;
pub use verify::verify_graph;
pub use vertex::{Vertex, VertexKind};
