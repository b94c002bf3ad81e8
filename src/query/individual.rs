//! Queries rooted at one individual or one family.

use std::sync::Arc;

use crate::graph::cache::CachedQuery;
use crate::graph::store::GraphStore;
use crate::graph::traverse::Lineage;
use crate::graph::{CommonAncestor, FamilyGraph, GraphResult, RelationshipResult};
use crate::record::{EventData, FamilyRecord, IndividualRecord};
use crate::xref::NodeId;

use super::lineage::{LineageQuery, SubtreeQuery};
use super::path::PathQuery;

fn push_unique(out: &mut Vec<NodeId>, id: NodeId) {
    if !out.contains(&id) {
        out.push(id);
    }
}

/// Apply `step` to every id in `from`, keeping first occurrences.
fn expand(from: &[NodeId], step: impl Fn(NodeId) -> Vec<NodeId>) -> Vec<NodeId> {
    let mut out = Vec::new();
    for id in from {
        for next in step(*id) {
            push_unique(&mut out, next);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Individual
// ---------------------------------------------------------------------------

pub struct IndividualQuery<'g> {
    graph: &'g FamilyGraph,
    xref: String,
}

impl<'g> IndividualQuery<'g> {
    pub(crate) fn new(graph: &'g FamilyGraph, xref: &str) -> Self {
        Self {
            graph,
            xref: xref.to_string(),
        }
    }

    pub fn xref(&self) -> &str {
        &self.xref
    }

    pub fn record(&self) -> GraphResult<Arc<dyn IndividualRecord>> {
        self.graph.individual(&self.xref)
    }

    /// Run `f` on the start individual's ID under one read lock and
    /// materialize the resulting IDs as records.
    fn collect(&self, f: impl FnOnce(&GraphStore, NodeId) -> Vec<NodeId>) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        self.graph.timed(|| {
            let store = self.graph.read();
            let id = store.require_individual(&self.xref)?;
            Ok(store.records_for(&f(&*store, id)))
        })
    }

    fn cached(&self, query: CachedQuery) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        self.collect(|store, id| self.graph.relative_ids(query, store, id).to_vec())
    }

    // ---- One hop ----

    pub fn parents(&self) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        self.cached(CachedQuery::Parents)
    }

    pub fn children(&self) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        self.cached(CachedQuery::Children)
    }

    pub fn siblings(&self) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        self.cached(CachedQuery::Siblings)
    }

    pub fn spouses(&self) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        self.cached(CachedQuery::Spouses)
    }

    // ---- Extended family ----

    pub fn grandparents(&self) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        self.collect(|store, id| expand(&store.parents(id), |p| store.parents(p)))
    }

    pub fn grandchildren(&self) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        self.collect(|store, id| expand(&store.children(id), |c| store.children(c)))
    }

    /// Parents' siblings and those siblings' spouses.
    pub fn uncles(&self) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        self.collect(|store, id| {
            let parents = store.parents(id);
            let blood = expand(&parents, |p| store.siblings(p));
            let mut out = blood.clone();
            for spouse in expand(&blood, |s| store.spouses(s)) {
                if !parents.contains(&spouse) {
                    push_unique(&mut out, spouse);
                }
            }
            out
        })
    }

    /// Children of siblings.
    pub fn nephews(&self) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        self.collect(|store, id| expand(&store.siblings(id), |s| store.children(s)))
    }

    /// Cousins of the given degree with no removal: individuals whose lowest
    /// common ancestor with this one sits `degree + 1` generations up on both
    /// sides. Degree 0 would be siblings, which are a direct relation, so it
    /// yields nothing.
    pub fn cousins(&self, degree: usize) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        self.collect(|store, id| {
            if degree == 0 {
                return Vec::new();
            }
            let depth = degree + 1;
            let order = self.graph.config().lineage_order;
            let mut out = Vec::new();
            let apexes = store.lineage_depths(id, Lineage::Ancestors, depth, order);
            for (apex, _) in apexes.into_iter().filter(|(_, d)| *d == depth) {
                for (candidate, d) in store.lineage_depths(apex, Lineage::Descendants, depth, order) {
                    if d != depth || candidate == id || out.contains(&candidate) {
                        continue;
                    }
                    let same_generation = store
                        .lowest_common_ancestor(id, candidate)
                        .is_some_and(|lca| lca.from_depth == depth && lca.to_depth == depth);
                    if same_generation {
                        out.push(candidate);
                    }
                }
            }
            out.sort_by(|a, b| store.xref_of(*a).cmp(&store.xref_of(*b)));
            out
        })
    }

    pub fn common_ancestors(&self, other: &str) -> GraphResult<Vec<CommonAncestor>> {
        self.graph.common_ancestors(&self.xref, other)
    }

    /// The individual's own events.
    pub fn events(&self) -> GraphResult<Vec<EventData>> {
        Ok(self.record()?.events())
    }

    // ---- Builders ----

    pub fn ancestors(&self) -> LineageQuery<'g> {
        LineageQuery::new(self.graph, &self.xref, Lineage::Ancestors)
    }

    pub fn descendants(&self) -> LineageQuery<'g> {
        LineageQuery::new(self.graph, &self.xref, Lineage::Descendants)
    }

    pub fn subtree(&self) -> SubtreeQuery<'g> {
        SubtreeQuery::new(self.graph, &self.xref)
    }

    pub fn path_to(&self, other: &str) -> PathQuery<'g> {
        PathQuery::new(self.graph, &self.xref, other)
    }

    pub fn relationship_to(&self, other: &str) -> GraphResult<RelationshipResult> {
        self.graph.calculate_relationship(&self.xref, other)
    }
}

// ---------------------------------------------------------------------------
// Family
// ---------------------------------------------------------------------------

pub struct FamilyQuery<'g> {
    graph: &'g FamilyGraph,
    xref: String,
}

impl<'g> FamilyQuery<'g> {
    pub(crate) fn new(graph: &'g FamilyGraph, xref: &str) -> Self {
        Self {
            graph,
            xref: xref.to_string(),
        }
    }

    pub fn record(&self) -> GraphResult<Arc<dyn FamilyRecord>> {
        self.graph.family(&self.xref)
    }

    fn member(&self, pick: impl FnOnce(&GraphStore, NodeId) -> Option<NodeId>) -> GraphResult<Option<Arc<dyn IndividualRecord>>> {
        let store = self.graph.read();
        let id = store.require_family(&self.xref)?;
        Ok(pick(&*store, id).and_then(|m| store.individual_record(m).cloned()))
    }

    pub fn husband(&self) -> GraphResult<Option<Arc<dyn IndividualRecord>>> {
        self.member(|store, id| store.family_husband(id))
    }

    pub fn wife(&self) -> GraphResult<Option<Arc<dyn IndividualRecord>>> {
        self.member(|store, id| store.family_wife(id))
    }

    /// Husband then wife, then any further spouses linked by `HUSB`/`WIFE` edges.
    pub fn parents(&self) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        let store = self.graph.read();
        let id = store.require_family(&self.xref)?;
        Ok(store.records_for(&store.family_spouses(id)))
    }

    pub fn children(&self) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        let store = self.graph.read();
        let id = store.require_family(&self.xref)?;
        Ok(store.records_for(&store.family_children(id)))
    }

    pub fn events(&self) -> GraphResult<Vec<EventData>> {
        Ok(self.record()?.events())
    }
}
