//! The genealogy property graph.
//!
//! Individuals, families, notes, sources, repositories and events are typed
//! nodes; parentage, marriage, citation and event ownership are typed edges.
//!
//! - **Store** ([`FamilyGraph`]): one coarse `RwLock` around every map
//! - **Mutation** (`mutation`): primitive and reciprocal-maintaining edits
//! - **Indexes** ([`index::FilterIndexes`]): name, place, sex, birth date, flags
//! - **Traversal** (`traverse`): BFS/DFS, shortest and all paths, lineage
//! - **Relationships** (`relationship`): classification, common ancestors, LCA
//! - **Analytics** (`analytics`): degree, centrality, components over kinship links

pub mod analytics;
pub mod builder;
pub mod cache;
pub mod edge;
pub mod index;
pub mod mutation;
pub mod node;
pub mod relations;
pub mod relationship;
pub mod snapshot;
pub mod store;
pub mod traverse;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::error::GraphError;

pub use builder::GraphBuilder;
pub use edge::{Direction, Edge, EdgeKind, EdgeSpec, Path, PathKind, PathStep, PropertyValue, edge_key};
pub use node::{Node, NodeKind, NodePayload};
pub use relationship::{CommonAncestor, RelationshipClass, RelationshipResult};
pub use store::{FamilyGraph, GraphStore};
pub use traverse::{LineageEntry, LineageOptions, TraversalOrder};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;
