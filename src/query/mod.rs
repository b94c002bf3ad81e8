//! Fluent query façade over a [`FamilyGraph`].
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use gedgraph::{GraphBuilder, tree::MemoryTree};
//! # let graph = GraphBuilder::default().build(Arc::new(MemoryTree::new())).unwrap();
//! let grandparents = graph.query().individual("@I3@").ancestors().max_generations(2).execute()?;
//! let smiths = graph.query().filter().name_contains("smith").living(true).execute();
//! # Ok::<(), gedgraph::error::GraphError>(())
//! ```

mod collection;
mod filter;
mod individual;
mod lineage;
mod path;

use std::sync::Arc;

use crate::graph::analytics::{self, CentralityScore, ConnectedComponent, GraphSummary, NodeDegree};
use crate::graph::{FamilyGraph, GraphResult};
use crate::record::{IndividualRecord, Record};

pub use collection::{EventCollection, EventInfo, NameCollection, NameUniqueBy, PlaceCollection, PlaceUniqueBy, ParsedPlace};
pub use filter::FilterQuery;
pub use individual::{FamilyQuery, IndividualQuery};
pub use lineage::{LineageQuery, SubtreeQuery, SubtreeResult};
pub use path::PathQuery;

/// Entry point for every query.
#[derive(Clone, Copy)]
pub struct QueryBuilder<'g> {
    graph: &'g FamilyGraph,
}

impl<'g> QueryBuilder<'g> {
    pub fn new(graph: &'g FamilyGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g FamilyGraph {
        self.graph
    }

    pub fn individual(&self, xref: &str) -> IndividualQuery<'g> {
        IndividualQuery::new(self.graph, xref)
    }

    pub fn family(&self, xref: &str) -> FamilyQuery<'g> {
        FamilyQuery::new(self.graph, xref)
    }

    pub fn filter(&self) -> FilterQuery<'g> {
        FilterQuery::new(self.graph)
    }

    pub fn names(&self) -> NameCollection<'g> {
        NameCollection::new(self.graph)
    }

    pub fn places(&self) -> PlaceCollection<'g> {
        PlaceCollection::new(self.graph)
    }

    pub fn events(&self) -> EventCollection<'g> {
        EventCollection::new(self.graph)
    }

    pub fn analytics(&self) -> AnalyticsQuery<'g> {
        AnalyticsQuery { graph: self.graph }
    }
}

impl FamilyGraph {
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }
}

/// Method-style access to [`analytics`].
#[derive(Clone, Copy)]
pub struct AnalyticsQuery<'g> {
    graph: &'g FamilyGraph,
}

impl AnalyticsQuery<'_> {
    pub fn degree(&self, xref: &str) -> GraphResult<NodeDegree> {
        analytics::degree(self.graph, xref)
    }

    pub fn degree_centrality(&self) -> Vec<CentralityScore> {
        analytics::degree_centrality(self.graph)
    }

    pub fn betweenness_centrality(&self) -> Vec<CentralityScore> {
        analytics::betweenness_centrality(self.graph)
    }

    pub fn closeness_centrality(&self) -> Vec<CentralityScore> {
        analytics::closeness_centrality(self.graph)
    }

    pub fn connected_components(&self) -> Vec<ConnectedComponent> {
        analytics::connected_components(self.graph)
    }

    pub fn component_of(&self, xref: &str, max_depth: usize, max_size: usize) -> GraphResult<Vec<String>> {
        analytics::component_of(self.graph, xref, max_depth, max_size)
    }

    pub fn is_connected(&self, a: &str, b: &str) -> GraphResult<bool> {
        analytics::is_connected(self.graph, a, b)
    }

    pub fn density(&self) -> f64 {
        analytics::density(self.graph)
    }

    pub fn diameter(&self) -> usize {
        analytics::diameter(self.graph)
    }

    pub fn average_degree(&self) -> f64 {
        analytics::average_degree(self.graph)
    }

    pub fn summary(&self) -> GraphSummary {
        analytics::summary(self.graph)
    }
}

/// XREFs of `records`, in order.
pub fn xrefs_of(records: &[Arc<dyn IndividualRecord>]) -> Vec<String> {
    records.iter().map(|r| r.xref().to_string()).collect()
}
