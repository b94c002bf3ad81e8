// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # gedgraph
//!
//! An in-memory property graph over GEDCOM genealogy records.
//!
//! ## Architecture
//!
//! - **Records** (`record`, `tree`): read-only individual, family and
//!   auxiliary records, plus an in-memory JSON-loadable tree
//! - **Graph** (`graph`): dense-ID property graph with reciprocal edges,
//!   filter indexes, traversal, relationship calculation and analytics
//! - **Queries** (`query`): fluent builders over the graph
//! - **Snapshots** (`graph::snapshot`): structural save and restore
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gedgraph::GraphBuilder;
//! use gedgraph::tree::{Family, Individual, MemoryTree};
//!
//! let tree = MemoryTree::new()
//!     .with_individual(Individual::new("@I1@").named("John /Smith/").spouse_in("@F1@"))
//!     .with_individual(Individual::new("@I2@").named("Tom /Smith/").child_of("@F1@"))
//!     .with_family(Family::new("@F1@").husband("@I1@").child("@I2@"));
//! let graph = GraphBuilder::default().build(Arc::new(tree)).unwrap();
//! let rel = graph.calculate_relationship("@I2@", "@I1@").unwrap();
//! println!("{}", rel.relationship.unwrap_or_default());
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod query;
pub mod record;
pub mod tree;
pub mod xref;

pub use config::GraphConfig;
pub use error::{ConfigError, GedError, GedResult, GraphError, SnapshotError, TreeError};
pub use graph::snapshot::{GraphSnapshot, SnapshotFormat};
pub use graph::{FamilyGraph, GraphBuilder, GraphResult};
pub use metrics::{Metrics, MetricsCollector, MetricsSnapshot};
pub use query::QueryBuilder;
