//! Ancestor, descendant and subtree builders.

use std::sync::Arc;

use crate::graph::traverse::{IndividualFilter, Lineage};
use crate::graph::{FamilyGraph, GraphResult, LineageEntry, LineageOptions, TraversalOrder};
use crate::record::IndividualRecord;
use crate::xref::NodeId;

/// Ancestors or descendants of one individual.
pub struct LineageQuery<'g> {
    graph: &'g FamilyGraph,
    xref: String,
    direction: Lineage,
    options: LineageOptions,
}

impl<'g> LineageQuery<'g> {
    pub(crate) fn new(graph: &'g FamilyGraph, xref: &str, direction: Lineage) -> Self {
        let options = LineageOptions {
            order: graph.config().lineage_order,
            ..LineageOptions::default()
        };
        Self {
            graph,
            xref: xref.to_string(),
            direction,
            options,
        }
    }

    /// Zero means unlimited.
    pub fn max_generations(mut self, n: usize) -> Self {
        self.options.max_generations = n;
        self
    }

    pub fn include_self(mut self) -> Self {
        self.options.include_self = true;
        self
    }

    pub fn filter(mut self, f: impl Fn(&dyn IndividualRecord) -> bool + Send + Sync + 'static) -> Self {
        self.options.filter = Some(Arc::new(f));
        self
    }

    pub fn order(mut self, order: TraversalOrder) -> Self {
        self.options.order = order;
        self
    }

    pub fn execute_with_depths(&self) -> GraphResult<Vec<LineageEntry>> {
        match self.direction {
            Lineage::Ancestors => self.graph.ancestors(&self.xref, &self.options),
            Lineage::Descendants => self.graph.descendants(&self.xref, &self.options),
        }
    }

    pub fn execute(&self) -> GraphResult<Vec<Arc<dyn IndividualRecord>>> {
        let entries = self.execute_with_depths()?;
        let ids: Vec<NodeId> = entries.iter().map(|e| e.id).collect();
        Ok(self.graph.read().records_for(&ids))
    }

    pub fn count(&self) -> GraphResult<usize> {
        Ok(self.execute_with_depths()?.len())
    }

    pub fn exists(&self) -> GraphResult<bool> {
        Ok(self.count()? > 0)
    }
}

// ---------------------------------------------------------------------------
// Subtree
// ---------------------------------------------------------------------------

/// Everything around one individual: ancestors and descendants up to their
/// own generation limits, and optionally siblings and spouses.
pub struct SubtreeQuery<'g> {
    graph: &'g FamilyGraph,
    xref: String,
    ancestor_generations: usize,
    descendant_generations: usize,
    include_self: bool,
    include_siblings: bool,
    include_spouses: bool,
    filter: Option<IndividualFilter>,
}

#[derive(Clone, Default)]
pub struct SubtreeResult {
    pub root: Option<Arc<dyn IndividualRecord>>,
    pub ancestors: Vec<Arc<dyn IndividualRecord>>,
    pub descendants: Vec<Arc<dyn IndividualRecord>>,
    pub siblings: Vec<Arc<dyn IndividualRecord>>,
    pub spouses: Vec<Arc<dyn IndividualRecord>>,
    /// Every individual above, each once, root first.
    pub all: Vec<Arc<dyn IndividualRecord>>,
}

impl<'g> SubtreeQuery<'g> {
    pub(crate) fn new(graph: &'g FamilyGraph, xref: &str) -> Self {
        Self {
            graph,
            xref: xref.to_string(),
            ancestor_generations: 0,
            descendant_generations: 0,
            include_self: true,
            include_siblings: false,
            include_spouses: false,
            filter: None,
        }
    }

    pub fn ancestor_generations(mut self, n: usize) -> Self {
        self.ancestor_generations = n;
        self
    }

    pub fn descendant_generations(mut self, n: usize) -> Self {
        self.descendant_generations = n;
        self
    }

    pub fn exclude_self(mut self) -> Self {
        self.include_self = false;
        self
    }

    pub fn include_siblings(mut self) -> Self {
        self.include_siblings = true;
        self
    }

    pub fn include_spouses(mut self) -> Self {
        self.include_spouses = true;
        self
    }

    pub fn filter(mut self, f: impl Fn(&dyn IndividualRecord) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(f));
        self
    }

    fn keep(&self, record: &Arc<dyn IndividualRecord>) -> bool {
        self.filter.as_ref().map_or(true, |f| f(record.as_ref()))
    }

    /// Collect the subtree under a single read lock.
    pub fn execute(&self) -> GraphResult<SubtreeResult> {
        self.graph.timed(|| {
            let store = self.graph.read();
            let id = store.require_individual(&self.xref)?;
            let order = self.graph.config().lineage_order;

            let walk = |direction, generations| -> Vec<NodeId> {
                store
                    .lineage_depths(id, direction, generations, order)
                    .into_iter()
                    .map(|(n, _)| n)
                    .collect()
            };
            let ancestors = walk(Lineage::Ancestors, self.ancestor_generations);
            let descendants = walk(Lineage::Descendants, self.descendant_generations);
            let siblings = if self.include_siblings { store.siblings(id) } else { Vec::new() };
            let spouses = if self.include_spouses { store.spouses(id) } else { Vec::new() };

            let records = |ids: &[NodeId]| -> Vec<Arc<dyn IndividualRecord>> {
                store.records_for(ids).into_iter().filter(|r| self.keep(r)).collect()
            };
            let mut result = SubtreeResult {
                root: store.individual_record(id).cloned(),
                ancestors: records(&ancestors),
                descendants: records(&descendants),
                siblings: records(&siblings),
                spouses: records(&spouses),
                all: Vec::new(),
            };

            let mut seen = Vec::new();
            if self.include_self {
                seen.push(id);
            }
            for group in [&ancestors, &descendants, &siblings, &spouses] {
                for n in group.iter() {
                    if !seen.contains(n) {
                        seen.push(*n);
                    }
                }
            }
            result.all = records(&seen);
            Ok(result)
        })
    }

    pub fn count(&self) -> GraphResult<usize> {
        Ok(self.execute()?.all.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures;
    use crate::query::xrefs_of;

    #[test]
    fn ancestors_builder_limits_generations() {
        let graph = fixtures::three_generations();
        let q = graph.query().individual("@I3@");
        assert_eq!(xrefs_of(&q.ancestors().max_generations(1).execute().unwrap()), vec!["@I2@"]);
        assert_eq!(q.ancestors().count().unwrap(), 2);
        assert_eq!(q.ancestors().include_self().count().unwrap(), 3);
        assert!(!q.descendants().exists().unwrap());
    }

    #[test]
    fn depths_are_generations() {
        let graph = fixtures::three_generations();
        let entries = graph.query().individual("@I1@").descendants().execute_with_depths().unwrap();
        let depths: Vec<(String, usize)> = entries.into_iter().map(|e| (e.xref, e.depth)).collect();
        assert_eq!(depths, vec![("@I2@".to_string(), 1), ("@I3@".to_string(), 2)]);
    }

    #[test]
    fn filter_drops_but_walks_through() {
        let graph = fixtures::three_generations();
        let found = graph
            .query()
            .individual("@I1@")
            .descendants()
            .order(TraversalOrder::DepthFirst)
            .filter(|r| r.name() != "Bert Old")
            .execute()
            .unwrap();
        assert_eq!(xrefs_of(&found), vec!["@I3@"]);
    }

    #[test]
    fn subtree_collects_each_once() {
        let graph = fixtures::cousins();
        let result = graph
            .query()
            .individual("@I2@")
            .subtree()
            .include_siblings()
            .include_spouses()
            .execute()
            .unwrap();
        assert_eq!(xrefs_of(&result.ancestors), vec!["@I1@"]);
        assert_eq!(xrefs_of(&result.descendants), vec!["@I4@"]);
        assert_eq!(xrefs_of(&result.siblings), vec!["@I3@"]);
        assert!(result.spouses.is_empty());
        assert_eq!(xrefs_of(&result.all), vec!["@I2@", "@I1@", "@I4@", "@I3@"]);
    }

    #[test]
    fn subtree_generation_limits_and_exclusion() {
        let graph = fixtures::three_generations();
        let q = graph.query().individual("@I1@");
        assert_eq!(q.subtree().descendant_generations(1).exclude_self().count().unwrap(), 1);
        assert_eq!(q.subtree().count().unwrap(), 3);
    }
}
