//! The graph store.
//!
//! [`GraphStore`] holds every node, edge, ID table and secondary index.
//! [`FamilyGraph`] wraps it in a single reader/writer lock together with the
//! query cache and an optional metrics collector, and is the XREF-facing
//! entry point. Internals key on [`NodeId`]; XREFs are translated here.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::record::{FamilyRecord, IndividualRecord, Record, TreeSource};
use crate::xref::{EdgeId, EdgeKeyInterner, NodeId, XrefInterner};

use super::cache::{CachedQuery, QueryCache};
use super::edge::Edge;
use super::index::FilterIndexes;
use super::node::{Node, NodeKind};
use super::GraphResult;

/// Everything guarded by the graph lock.
#[derive(Debug, Default)]
pub struct GraphStore {
    pub(crate) xrefs: XrefInterner,
    pub(crate) edge_keys: EdgeKeyInterner,
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) by_kind: [BTreeSet<NodeId>; 6],
    pub(crate) edges: HashMap<EdgeId, Edge>,
    /// Node → every edge touching it, in either direction.
    pub(crate) edge_index: HashMap<NodeId, Vec<EdgeId>>,
    pub(crate) indexes: FilterIndexes,
    /// Bumped by every mutation; cached results from older generations are stale.
    pub(crate) generation: u64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_by_xref(&self, xref: &str) -> Option<&Node> {
        self.xrefs.id_of(xref).and_then(|id| self.nodes.get(&id))
    }

    /// Internal ID of a live node. IDs of removed nodes stay interned but do
    /// not resolve here.
    pub fn id_of(&self, xref: &str) -> Option<NodeId> {
        self.xrefs
            .id_of(xref)
            .filter(|id| self.nodes.contains_key(id))
    }

    pub fn xref_of(&self, id: NodeId) -> Option<&str> {
        self.xrefs.key_of(id)
    }

    pub fn xrefs_interned(&self) -> &XrefInterner {
        &self.xrefs
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn edge_by_key(&self, key: &str) -> Option<&Edge> {
        self.edge_keys.id_of(key).and_then(|id| self.edges.get(&id))
    }

    /// Every edge touching `id`, in the order they were attached.
    pub fn edges_of(&self, id: NodeId) -> Vec<&Edge> {
        self.edge_index
            .get(&id)
            .map(|ids| ids.iter().filter_map(|e| self.edges.get(e)).collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn count_of(&self, kind: NodeKind) -> usize {
        self.by_kind[kind.slot()].len()
    }

    /// IDs of every node of `kind`, ascending.
    pub fn ids_of(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.by_kind[kind.slot()].iter().copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn indexes(&self) -> &FilterIndexes {
        &self.indexes
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn require_node(&self, xref: &str) -> GraphResult<NodeId> {
        self.id_of(xref).ok_or_else(|| GraphError::NodeNotFound {
            xref: xref.to_string(),
        })
    }

    pub fn require_individual(&self, xref: &str) -> GraphResult<NodeId> {
        match self.node_by_xref(xref) {
            Some(node) if node.kind() == NodeKind::Individual => Ok(node.id),
            _ => Err(GraphError::IndividualNotFound {
                xref: xref.to_string(),
            }),
        }
    }

    pub fn require_family(&self, xref: &str) -> GraphResult<NodeId> {
        match self.node_by_xref(xref) {
            Some(node) if node.kind() == NodeKind::Family => Ok(node.id),
            _ => Err(GraphError::FamilyNotFound {
                xref: xref.to_string(),
            }),
        }
    }

    pub fn individual_record(&self, id: NodeId) -> Option<&Arc<dyn IndividualRecord>> {
        self.nodes.get(&id).and_then(Node::individual)
    }

    pub fn family_record(&self, id: NodeId) -> Option<&Arc<dyn FamilyRecord>> {
        self.nodes.get(&id).and_then(Node::family)
    }

    /// Translate IDs to XREFs, skipping any that no longer resolve.
    pub fn xrefs_for(&self, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.xrefs.key_of(*id))
            .map(str::to_string)
            .collect()
    }

    /// Translate IDs to individual records, skipping non-individuals.
    pub fn records_for(&self, ids: &[NodeId]) -> Vec<Arc<dyn IndividualRecord>> {
        ids.iter()
            .filter_map(|id| self.individual_record(*id))
            .cloned()
            .collect()
    }
}

/// Thread-safe genealogy graph addressed by XREF.
pub struct FamilyGraph {
    store: RwLock<GraphStore>,
    cache: QueryCache,
    metrics: Option<Arc<dyn MetricsCollector>>,
    config: GraphConfig,
    tree: Option<Arc<dyn TreeSource>>,
}

impl FamilyGraph {
    /// An empty graph.
    pub fn new(config: GraphConfig) -> Self {
        Self::from_store(GraphStore::new(), config, None)
    }

    pub(crate) fn from_store(
        store: GraphStore,
        config: GraphConfig,
        tree: Option<Arc<dyn TreeSource>>,
    ) -> Self {
        let metrics: Option<Arc<dyn MetricsCollector>> = if config.collect_metrics {
            Some(Arc::new(crate::metrics::Metrics::new()))
        } else {
            None
        };
        Self {
            store: RwLock::new(store),
            cache: QueryCache::new(config.query_cache_size),
            metrics,
            config,
            tree,
        }
    }

    /// Replace the metrics collector.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Take the read lock for a consistent multi-step view.
    ///
    /// Holding the guard blocks writers, so keep it short.
    pub fn read(&self) -> RwLockReadGuard<'_, GraphStore> {
        self.store.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, GraphStore> {
        self.store.write()
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// The tree the graph was built from, if any.
    pub fn tree(&self) -> Option<&Arc<dyn TreeSource>> {
        self.tree.as_ref()
    }

    pub fn metrics(&self) -> Option<&Arc<dyn MetricsCollector>> {
        self.metrics.as_ref()
    }

    pub fn metrics_snapshot(&self) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().and_then(|m| m.snapshot())
    }

    pub(crate) fn cache(&self) -> &QueryCache {
        &self.cache
    }

    // ---- Metrics plumbing ----

    /// Run `f` as a timed query.
    pub(crate) fn timed<T>(&self, f: impl FnOnce() -> GraphResult<T>) -> GraphResult<T> {
        let started = Instant::now();
        let result = f();
        if let Some(metrics) = &self.metrics {
            metrics.record_query(started.elapsed());
            if let Err(err) = &result {
                metrics.record_error(err.kind());
            }
        }
        result
    }

    pub(crate) fn record_error(&self, err: &GraphError) {
        if let Some(metrics) = &self.metrics {
            metrics.record_error(err.kind());
        }
    }

    // ---- Lookups ----

    pub fn contains(&self, xref: &str) -> bool {
        self.store.read().id_of(xref).is_some()
    }

    /// A copy of the node, including its adjacency lists.
    pub fn node(&self, xref: &str) -> GraphResult<Node> {
        let store = self.store.read();
        let id = store.require_node(xref)?;
        store
            .node(id)
            .cloned()
            .ok_or_else(|| GraphError::NodeNotFound {
                xref: xref.to_string(),
            })
    }

    pub fn node_id(&self, xref: &str) -> Option<NodeId> {
        self.store.read().id_of(xref)
    }

    pub fn xref_of(&self, id: NodeId) -> Option<String> {
        self.store.read().xref_of(id).map(str::to_string)
    }

    pub fn edge(&self, key: &str) -> GraphResult<Edge> {
        self.store
            .read()
            .edge_by_key(key)
            .cloned()
            .ok_or_else(|| GraphError::EdgeNotFound {
                edge_id: key.to_string(),
            })
    }

    /// Copies of every edge touching the node.
    pub fn edges_of(&self, xref: &str) -> GraphResult<Vec<Edge>> {
        let store = self.store.read();
        let id = store.require_node(xref)?;
        Ok(store.edges_of(id).into_iter().cloned().collect())
    }

    pub fn node_count(&self) -> usize {
        self.store.read().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.store.read().edge_count()
    }

    pub fn count_of(&self, kind: NodeKind) -> usize {
        self.store.read().count_of(kind)
    }

    /// XREFs of every node of `kind`, sorted.
    pub fn xrefs_of(&self, kind: NodeKind) -> Vec<String> {
        let store = self.store.read();
        let mut out: Vec<String> = store
            .ids_of(kind)
            .filter_map(|id| store.xref_of(id))
            .map(str::to_string)
            .collect();
        out.sort();
        out
    }

    pub fn individual(&self, xref: &str) -> GraphResult<Arc<dyn IndividualRecord>> {
        let store = self.store.read();
        let id = store.require_individual(xref)?;
        store
            .individual_record(id)
            .cloned()
            .ok_or_else(|| GraphError::IndividualNotFound {
                xref: xref.to_string(),
            })
    }

    pub fn family(&self, xref: &str) -> GraphResult<Arc<dyn FamilyRecord>> {
        let store = self.store.read();
        let id = store.require_family(xref)?;
        store
            .family_record(id)
            .cloned()
            .ok_or_else(|| GraphError::FamilyNotFound {
                xref: xref.to_string(),
            })
    }

    /// Every individual record, ordered by XREF.
    pub fn individuals(&self) -> Vec<Arc<dyn IndividualRecord>> {
        let store = self.store.read();
        let mut records: Vec<Arc<dyn IndividualRecord>> = store
            .ids_of(NodeKind::Individual)
            .filter_map(|id| store.individual_record(id).cloned())
            .collect();
        records.sort_by(|a, b| a.xref().cmp(b.xref()));
        records
    }

    /// Every family record, ordered by XREF.
    pub fn families(&self) -> Vec<Arc<dyn FamilyRecord>> {
        let store = self.store.read();
        let mut records: Vec<Arc<dyn FamilyRecord>> = store
            .ids_of(NodeKind::Family)
            .filter_map(|id| store.family_record(id).cloned())
            .collect();
        records.sort_by(|a, b| a.xref().cmp(b.xref()));
        records
    }

    // ---- Derived relationships ----

    pub fn parents(&self, xref: &str) -> GraphResult<Vec<String>> {
        self.relatives(CachedQuery::Parents, xref)
    }

    pub fn children(&self, xref: &str) -> GraphResult<Vec<String>> {
        self.relatives(CachedQuery::Children, xref)
    }

    pub fn siblings(&self, xref: &str) -> GraphResult<Vec<String>> {
        self.relatives(CachedQuery::Siblings, xref)
    }

    pub fn spouses(&self, xref: &str) -> GraphResult<Vec<String>> {
        self.relatives(CachedQuery::Spouses, xref)
    }

    /// Derived relatives as internal IDs, served from the cache when the
    /// entry belongs to the current generation.
    pub(crate) fn relative_ids(&self, query: CachedQuery, store: &GraphStore, id: NodeId) -> Arc<[NodeId]> {
        if let Some(hit) = self.cache.get(query, id, store.generation) {
            if let Some(metrics) = &self.metrics {
                metrics.record_cache_hit();
            }
            return hit;
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_miss();
        }
        let ids: Arc<[NodeId]> = match query {
            CachedQuery::Parents => store.parents(id),
            CachedQuery::Children => store.children(id),
            CachedQuery::Siblings => store.siblings(id),
            CachedQuery::Spouses => store.spouses(id),
        }
        .into();
        self.cache.insert(query, id, store.generation, Arc::clone(&ids));
        ids
    }

    fn relatives(&self, query: CachedQuery, xref: &str) -> GraphResult<Vec<String>> {
        self.timed(|| {
            let store = self.store.read();
            let id = store.require_individual(xref)?;
            let ids = self.relative_ids(query, &store, id);
            Ok(store.xrefs_for(&ids))
        })
    }

    pub fn family_husband(&self, xref: &str) -> GraphResult<Option<String>> {
        let store = self.store.read();
        let id = store.require_family(xref)?;
        Ok(store
            .family_husband(id)
            .and_then(|h| store.xref_of(h))
            .map(str::to_string))
    }

    pub fn family_wife(&self, xref: &str) -> GraphResult<Option<String>> {
        let store = self.store.read();
        let id = store.require_family(xref)?;
        Ok(store
            .family_wife(id)
            .and_then(|w| store.xref_of(w))
            .map(str::to_string))
    }

    pub fn family_children(&self, xref: &str) -> GraphResult<Vec<String>> {
        let store = self.store.read();
        let id = store.require_family(xref)?;
        Ok(store.xrefs_for(&store.family_children(id)))
    }
}

impl std::fmt::Debug for FamilyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.store.read();
        f.debug_struct("FamilyGraph")
            .field("nodes", &store.node_count())
            .field("edges", &store.edge_count())
            .field("individuals", &store.count_of(NodeKind::Individual))
            .field("families", &store.count_of(NodeKind::Family))
            .finish()
    }
}

impl Default for FamilyGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures;

    #[test]
    fn empty_graph() {
        let graph = FamilyGraph::default();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains("@I1@"));
        assert!(matches!(
            graph.node("@I1@"),
            Err(GraphError::NodeNotFound { .. })
        ));
        assert!(graph.xrefs_of(NodeKind::Individual).is_empty());
    }

    #[test]
    fn typed_lookups_reject_wrong_kind() {
        let graph = fixtures::nuclear_family();
        assert!(graph.individual("@I1@").is_ok());
        assert!(matches!(
            graph.individual("@F1@"),
            Err(GraphError::IndividualNotFound { .. })
        ));
        assert!(matches!(
            graph.family("@I1@"),
            Err(GraphError::FamilyNotFound { .. })
        ));
        assert!(matches!(
            graph.parents("@F1@"),
            Err(GraphError::IndividualNotFound { .. })
        ));
    }

    #[test]
    fn relatives_are_served_from_cache_on_repeat() {
        let graph = fixtures::nuclear_family();
        let first = graph.parents("@I3@").unwrap();
        let second = graph.parents("@I3@").unwrap();
        assert_eq!(first, second);
        let snapshot = graph.metrics_snapshot().unwrap();
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.cache_hits, 1);
    }

    #[test]
    fn family_accessors() {
        let graph = fixtures::nuclear_family();
        assert_eq!(graph.family_husband("@F1@").unwrap().as_deref(), Some("@I1@"));
        assert_eq!(graph.family_wife("@F1@").unwrap().as_deref(), Some("@I2@"));
        assert_eq!(graph.family_children("@F1@").unwrap(), vec!["@I3@"]);
    }

    #[test]
    fn debug_shows_counts() {
        let graph = fixtures::nuclear_family();
        let dbg = format!("{graph:?}");
        assert!(dbg.contains("individuals: 3"));
        assert!(dbg.contains("families: 1"));
    }
}
