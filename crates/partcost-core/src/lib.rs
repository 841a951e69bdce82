#![forbid(unsafe_code)]
//! partcost-core: shared vocabulary for the workload cost subsystem.
//!
//! Holds the strongly-typed ids, the error enum, the cost-model config, the
//! in-memory catalog snapshot and workload traces, plus blake3 fingerprints
//! and the serializable cost report.
//!
//! **No I/O, no graph logic** here. Catalog loading and trace parsing belong
//! to the callers; this crate only describes the shapes they hand us.

pub mod catalog;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod report;
pub mod workload;

/// Crate version recorded in cost reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
