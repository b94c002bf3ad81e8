//! Adding and removing nodes and edges.
//!
//! The `GraphStore` methods here run with the write lock already held, so
//! composite edits (an edge plus its reciprocal) take the lock once. The
//! `FamilyGraph` methods acquire the lock, bump the store generation and
//! clear the query cache.
//!
//! The primitive edge layer never creates or removes reciprocals. The
//! incremental layer keeps `HUSB`/`WIFE` paired with `FAMS` and `CHIL` paired
//! with `FAMC`, in either direction.

use tracing::debug;

use crate::error::GraphError;
use crate::record::{IndividualRecord, Record};
use crate::xref::{EdgeId, NodeId};

use super::edge::{Direction, Edge, EdgeKind, EdgeSpec, Properties, edge_key};
use super::index::IndividualFacts;
use super::node::{remove_ordered, remove_swap, Node, NodeKind, NodePayload};
use super::store::{FamilyGraph, GraphStore};
use super::GraphResult;

/// An edge whose endpoints have already been resolved to internal IDs.
#[derive(Debug, Clone)]
pub(crate) struct NewEdge {
    pub key: String,
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    pub family: Option<NodeId>,
    pub direction: Direction,
    pub properties: Properties,
}

impl NewEdge {
    pub fn forward(key: String, from: NodeId, to: NodeId, kind: EdgeKind, family: Option<NodeId>) -> Self {
        Self {
            key,
            from,
            to,
            kind,
            family,
            direction: Direction::Forward,
            properties: Properties::new(),
        }
    }
}

fn invalid_edge(message: impl Into<String>) -> GraphError {
    GraphError::InvalidEdge {
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Lock-held primitives
// ---------------------------------------------------------------------------

impl GraphStore {
    /// Store a node. Does not touch the secondary indexes.
    pub(crate) fn insert_node(&mut self, xref: &str, payload: NodePayload) -> GraphResult<NodeId> {
        if xref.trim().is_empty() {
            return Err(GraphError::InvalidNode {
                message: "XREF is empty".into(),
            });
        }
        if self.id_of(xref).is_some() {
            return Err(GraphError::DuplicateNode {
                xref: xref.to_string(),
            });
        }
        let id = self.xrefs.intern(xref)?;
        let kind = payload.kind();
        self.nodes.insert(id, Node::new(id, xref.to_string(), payload));
        self.by_kind[kind.slot()].insert(id);
        Ok(id)
    }

    /// (Re)index an individual from its record and current relation flags.
    pub(crate) fn index_individual(&mut self, id: NodeId) {
        let Some(record) = self.individual_record(id).cloned() else {
            return;
        };
        let facts = IndividualFacts::from_record(record.as_ref(), self.has_children(id), self.has_spouse(id));
        self.indexes.insert(id, &facts);
    }

    pub(crate) fn refresh_flags(&mut self, id: NodeId) {
        if self.individual_record(id).is_some() {
            let (children, spouse) = (self.has_children(id), self.has_spouse(id));
            self.indexes.set_relation_flags(id, children, spouse);
        }
    }

    /// Individuals whose has-children/has-spouse flags depend on `id`.
    fn node_dependents(&self, id: NodeId) -> Vec<NodeId> {
        match self.nodes.get(&id).map(Node::kind) {
            Some(NodeKind::Individual) => {
                let mut out = self.spouses(id);
                out.extend(self.parents(id));
                out
            }
            Some(NodeKind::Family) => self.family_spouses(id),
            _ => Vec::new(),
        }
    }

    /// Individuals whose flags may change when `edge` comes or goes.
    fn edge_dependents(&self, edge: &Edge) -> Vec<NodeId> {
        if !(edge.kind.is_member() || matches!(edge.kind, EdgeKind::Famc | EdgeKind::Fams)) {
            return Vec::new();
        }
        let mut out = self.family_spouses(edge.family_node());
        for end in [edge.from, edge.to] {
            if self.individual_record(end).is_some() && !out.contains(&end) {
                out.push(end);
            }
        }
        out
    }

    /// Remove a node, every edge touching it, and its index entries.
    ///
    /// Edge removal is best-effort: a failure is logged and the remaining
    /// edges and the node itself are still removed.
    pub(crate) fn remove_node_locked(&mut self, xref: &str) -> GraphResult<NodeId> {
        let id = self.require_node(xref)?;
        let dependents = self.node_dependents(id);

        let mut touching = self.edge_index.get(&id).cloned().unwrap_or_default();
        if let Some(node) = self.nodes.get(&id) {
            for edge in node.out_edges.iter().chain(node.in_edges.iter()) {
                if !touching.contains(edge) {
                    touching.push(*edge);
                }
            }
        }
        for edge in touching {
            if let Err(err) = self.remove_edge_locked(edge) {
                debug!(node = xref, %edge, error = %err, "edge removal failed during node removal");
            }
        }

        if let Some(node) = self.nodes.remove(&id) {
            self.by_kind[node.kind().slot()].remove(&id);
        }
        self.edge_index.remove(&id);
        self.indexes.remove(id);
        for dependent in dependents {
            if dependent != id {
                self.refresh_flags(dependent);
            }
        }
        Ok(id)
    }

    /// Translate an XREF-addressed edge into internal IDs, validating it.
    pub(crate) fn resolve_edge(&self, spec: EdgeSpec) -> GraphResult<NewEdge> {
        if spec.key.trim().is_empty() {
            return Err(invalid_edge("edge ID is empty"));
        }
        let endpoint = |xref: &str, side: &str| {
            if xref.trim().is_empty() {
                return Err(invalid_edge(format!("{side} endpoint is empty")));
            }
            self.id_of(xref)
                .ok_or_else(|| invalid_edge(format!("{side} endpoint {xref} is not in the graph")))
        };
        let from = endpoint(&spec.from, "from")?;
        let to = endpoint(&spec.to, "to")?;
        let family = match &spec.family {
            Some(xref) => match self.node_by_xref(xref) {
                Some(node) if node.kind() == NodeKind::Family => Some(node.id),
                _ => return Err(invalid_edge(format!("family back-reference {xref} is not a family"))),
            },
            None => None,
        };
        Ok(NewEdge {
            key: spec.key,
            from,
            to,
            kind: spec.kind,
            family,
            direction: spec.direction,
            properties: spec.properties,
        })
    }

    /// Store an edge and wire it into adjacency lists, the per-node edge
    /// index and the family edge caches.
    pub(crate) fn insert_edge(&mut self, new: NewEdge) -> GraphResult<EdgeId> {
        if new.key.trim().is_empty() {
            return Err(invalid_edge("edge ID is empty"));
        }
        if !self.nodes.contains_key(&new.from) || !self.nodes.contains_key(&new.to) {
            return Err(invalid_edge(format!("endpoint of {} is not in the graph", new.key)));
        }
        if self.edge_by_key(&new.key).is_some() {
            return Err(GraphError::DuplicateEdge { edge_id: new.key });
        }
        let id = self.edge_keys.intern(&new.key)?;
        let edge = Edge {
            id,
            key: new.key,
            from: new.from,
            to: new.to,
            kind: new.kind,
            family: new.family,
            direction: new.direction,
            properties: new.properties,
        };

        self.edge_index.entry(edge.from).or_default().push(id);
        if edge.to != edge.from {
            self.edge_index.entry(edge.to).or_default().push(id);
        }
        if let Some(node) = self.nodes.get_mut(&edge.from) {
            node.out_edges.push(id);
            if edge.is_bidirectional() {
                node.in_edges.push(id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&edge.to) {
            node.in_edges.push(id);
            if edge.is_bidirectional() {
                node.out_edges.push(id);
            }
        }
        self.link_cache(&edge);
        self.edges.insert(id, edge);
        Ok(id)
    }

    fn link_cache(&mut self, edge: &Edge) {
        match edge.kind {
            EdgeKind::Husb | EdgeKind::Wife | EdgeKind::Chil => {
                if let Some(cache) = self.nodes.get_mut(&edge.from).and_then(Node::family_edges_mut) {
                    match edge.kind {
                        EdgeKind::Husb => {
                            cache.husband.get_or_insert(edge.id);
                        }
                        EdgeKind::Wife => {
                            cache.wife.get_or_insert(edge.id);
                        }
                        _ => cache.children.push(edge.id),
                    }
                }
            }
            EdgeKind::Famc | EdgeKind::Fams => {
                if let Some(cache) = self.nodes.get_mut(&edge.from).and_then(Node::membership_edges_mut) {
                    if edge.kind == EdgeKind::Famc {
                        cache.as_child.push(edge.id);
                    } else {
                        cache.as_spouse.push(edge.id);
                    }
                }
            }
            _ => {}
        }
    }

    fn unlink_cache(&mut self, edge: &Edge) {
        match edge.kind {
            EdgeKind::Husb | EdgeKind::Wife => {
                // another edge of the same kind takes over the slot
                let replacement = self.nodes.get(&edge.from).and_then(|n| {
                    n.out_edges.iter().copied().find(|other| {
                        *other != edge.id && self.edges.get(other).is_some_and(|o| o.kind == edge.kind)
                    })
                });
                if let Some(cache) = self.nodes.get_mut(&edge.from).and_then(Node::family_edges_mut) {
                    let slot = if edge.kind == EdgeKind::Husb {
                        &mut cache.husband
                    } else {
                        &mut cache.wife
                    };
                    if *slot == Some(edge.id) {
                        *slot = replacement;
                    }
                }
            }
            EdgeKind::Chil => {
                if let Some(cache) = self.nodes.get_mut(&edge.from).and_then(Node::family_edges_mut) {
                    remove_swap(&mut cache.children, edge.id);
                }
            }
            EdgeKind::Famc | EdgeKind::Fams => {
                if let Some(cache) = self.nodes.get_mut(&edge.from).and_then(Node::membership_edges_mut) {
                    let list = if edge.kind == EdgeKind::Famc {
                        &mut cache.as_child
                    } else {
                        &mut cache.as_spouse
                    };
                    remove_swap(list, edge.id);
                }
            }
            _ => {}
        }
    }

    /// Remove an edge from every cache, index and adjacency list.
    pub(crate) fn remove_edge_locked(&mut self, id: EdgeId) -> GraphResult<Edge> {
        let Some(edge) = self.edges.get(&id).cloned() else {
            return Err(GraphError::EdgeNotFound {
                edge_id: self
                    .edge_keys
                    .key_of(id)
                    .map_or_else(|| id.to_string(), str::to_string),
            });
        };
        self.unlink_cache(&edge);

        for end in [edge.from, edge.to] {
            if let Some(list) = self.edge_index.get_mut(&end) {
                remove_swap(list, id);
                if list.is_empty() {
                    self.edge_index.remove(&end);
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(&edge.from) {
            remove_ordered(&mut node.out_edges, id);
            if edge.is_bidirectional() {
                remove_ordered(&mut node.in_edges, id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&edge.to) {
            remove_ordered(&mut node.in_edges, id);
            if edge.is_bidirectional() {
                remove_ordered(&mut node.out_edges, id);
            }
        }
        self.edges.remove(&id);
        Ok(edge)
    }

    // ---- Reciprocal maintenance ----

    /// The edge that should pair with `edge`, if it is a family edge whose
    /// counterpart is missing.
    fn reciprocal_for(&self, edge: &NewEdge) -> Option<NewEdge> {
        let kind_of = |id: NodeId| self.nodes.get(&id).map(Node::kind);
        let (individual, family, kind) = match edge.kind {
            EdgeKind::Husb | EdgeKind::Wife | EdgeKind::Chil => {
                let kind = if edge.kind == EdgeKind::Chil {
                    EdgeKind::Famc
                } else {
                    EdgeKind::Fams
                };
                (edge.to, edge.from, kind)
            }
            EdgeKind::Famc => (edge.from, edge.family.unwrap_or(edge.to), EdgeKind::Chil),
            EdgeKind::Fams => {
                let family = edge.family.unwrap_or(edge.to);
                (family_side_for_spouse(self, edge.from, family)).map(|k| (edge.from, family, k))?
            }
            _ => return None,
        };
        if kind_of(individual) != Some(NodeKind::Individual) || kind_of(family) != Some(NodeKind::Family) {
            return None;
        }
        let ind_xref = self.xref_of(individual)?;
        let fam_xref = self.xref_of(family)?;
        let (from, to, key) = match kind {
            EdgeKind::Fams | EdgeKind::Famc => (individual, family, edge_key(ind_xref, kind, fam_xref)),
            _ => (family, individual, edge_key(fam_xref, kind, ind_xref)),
        };
        Some(NewEdge::forward(key, from, to, kind, Some(family)))
    }

    /// Edges pairing with `edge`: looked up through the family caches first,
    /// scanning the whole edge table only if that finds nothing.
    pub(crate) fn find_reciprocals(&self, edge: &Edge) -> Vec<EdgeId> {
        let family = edge.family_node();
        let (individual, wanted): (NodeId, &[EdgeKind]) = match edge.kind {
            EdgeKind::Husb | EdgeKind::Wife => (edge.to, &[EdgeKind::Fams][..]),
            EdgeKind::Chil => (edge.to, &[EdgeKind::Famc][..]),
            EdgeKind::Fams => (edge.from, &[EdgeKind::Husb, EdgeKind::Wife][..]),
            EdgeKind::Famc => (edge.from, &[EdgeKind::Chil][..]),
            _ => return Vec::new(),
        };
        let matches = |other: &Edge| {
            other.id != edge.id
                && wanted.contains(&other.kind)
                && other.family_node() == family
                && (other.from == individual || other.to == individual)
        };

        let candidates: Vec<EdgeId> = match edge.kind {
            EdgeKind::Husb | EdgeKind::Wife | EdgeKind::Chil => self
                .nodes
                .get(&individual)
                .and_then(Node::membership_edges)
                .map(|m| {
                    if edge.kind == EdgeKind::Chil {
                        m.as_child.clone()
                    } else {
                        m.as_spouse.clone()
                    }
                })
                .unwrap_or_default(),
            _ => self
                .nodes
                .get(&family)
                .map(|n| n.out_edges.clone())
                .unwrap_or_default(),
        };
        let found: Vec<EdgeId> = candidates
            .into_iter()
            .filter(|id| self.edges.get(id).is_some_and(|e| matches(e)))
            .collect();
        if !found.is_empty() {
            return found;
        }
        let mut fallback: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| matches(e))
            .map(|e| e.id)
            .collect();
        if !fallback.is_empty() {
            debug!(edge = edge.key.as_str(), "reciprocal found only by full edge scan");
        }
        fallback.sort();
        fallback
    }

    /// Insert `new` and, for family edges, its reciprocal. A reciprocal that
    /// already exists is not an error.
    pub(crate) fn insert_edge_incremental(&mut self, new: NewEdge) -> GraphResult<EdgeId> {
        let reciprocal = self.reciprocal_for(&new);
        let id = self.insert_edge(new)?;
        let Some(edge) = self.edges.get(&id).cloned() else {
            return Ok(id);
        };
        if let Some(reciprocal) = reciprocal {
            if self.find_reciprocals(&edge).is_empty() {
                let key = reciprocal.key.clone();
                match self.insert_edge(reciprocal) {
                    Ok(_) => {}
                    Err(GraphError::DuplicateEdge { .. }) => {
                        debug!(edge = key.as_str(), "reciprocal edge already present");
                    }
                    Err(err) => debug!(edge = key.as_str(), error = %err, "reciprocal edge not created"),
                }
            }
        }
        for dependent in self.edge_dependents(&edge) {
            self.refresh_flags(dependent);
        }
        Ok(id)
    }

    /// Remove an edge together with its reciprocals.
    pub(crate) fn remove_edge_incremental_locked(&mut self, id: EdgeId) -> GraphResult<()> {
        let Some(edge) = self.edges.get(&id).cloned() else {
            return Err(GraphError::EdgeNotFound {
                edge_id: self
                    .edge_keys
                    .key_of(id)
                    .map_or_else(|| id.to_string(), str::to_string),
            });
        };
        let reciprocals = self.find_reciprocals(&edge);
        let dependents = self.edge_dependents(&edge);
        self.remove_edge_locked(id)?;
        for reciprocal in reciprocals {
            if let Err(err) = self.remove_edge_locked(reciprocal) {
                debug!(edge = edge.key.as_str(), error = %err, "reciprocal removal failed");
            }
        }
        for dependent in dependents {
            self.refresh_flags(dependent);
        }
        Ok(())
    }
}

/// Which family-side slot a new `FAMS` edge fills: by sex, otherwise the
/// first free slot, husband first.
fn family_side_for_spouse(store: &GraphStore, individual: NodeId, family: NodeId) -> Option<EdgeKind> {
    let record = store.individual_record(individual)?;
    match record.sex().trim().to_uppercase().as_str() {
        "M" => Some(EdgeKind::Husb),
        "F" => Some(EdgeKind::Wife),
        _ if store.family_husband(family).is_none() => Some(EdgeKind::Husb),
        _ => Some(EdgeKind::Wife),
    }
}

// ---------------------------------------------------------------------------
// Lock-acquiring API
// ---------------------------------------------------------------------------

impl FamilyGraph {
    fn mutate<T>(&self, op: &'static str, f: impl FnOnce(&mut GraphStore) -> GraphResult<T>) -> GraphResult<T> {
        let mut store = self.write();
        match f(&mut *store) {
            Ok(value) => {
                store.generation += 1;
                drop(store);
                self.cache().clear();
                debug!(op, "graph mutated, query cache cleared");
                Ok(value)
            }
            Err(err) => {
                self.record_error(&err);
                Err(err)
            }
        }
    }

    /// Add a node. Individuals are indexed immediately.
    pub fn add_node(&self, xref: &str, payload: NodePayload) -> GraphResult<NodeId> {
        self.mutate("add_node", |store| {
            let id = store.insert_node(xref, payload)?;
            store.index_individual(id);
            Ok(id)
        })
    }

    /// Convenience for [`add_node`](Self::add_node) with an individual record.
    pub fn add_individual(&self, record: std::sync::Arc<dyn IndividualRecord>) -> GraphResult<NodeId> {
        let xref = record.xref().to_string();
        self.add_node(&xref, NodePayload::Individual(record))
    }

    /// Remove a node with every edge touching it and its index entries.
    pub fn remove_node(&self, xref: &str) -> GraphResult<()> {
        self.mutate("remove_node", |store| store.remove_node_locked(xref).map(|_| ()))
    }

    /// Add a single edge. Reciprocals are not created.
    pub fn add_edge(&self, spec: EdgeSpec) -> GraphResult<EdgeId> {
        self.mutate("add_edge", |store| {
            let new = store.resolve_edge(spec)?;
            store.insert_edge(new)
        })
    }

    /// Remove a single edge. Reciprocals are left alone.
    pub fn remove_edge(&self, key: &str) -> GraphResult<()> {
        self.mutate("remove_edge", |store| {
            let id = edge_id(store, key)?;
            store.remove_edge_locked(id).map(|_| ())
        })
    }

    /// Add an edge and, for `HUSB`/`WIFE`/`CHIL`/`FAMS`/`FAMC`, its reciprocal,
    /// under one lock acquisition.
    pub fn add_edge_incremental(&self, spec: EdgeSpec) -> GraphResult<EdgeId> {
        self.mutate("add_edge_incremental", |store| {
            let new = store.resolve_edge(spec)?;
            store.insert_edge_incremental(new)
        })
    }

    /// Remove an edge together with its reciprocal.
    pub fn remove_edge_incremental(&self, key: &str) -> GraphResult<()> {
        self.mutate("remove_edge_incremental", |store| {
            let id = edge_id(store, key)?;
            store.remove_edge_incremental_locked(id)
        })
    }
}

fn edge_id(store: &GraphStore, key: &str) -> GraphResult<EdgeId> {
    store
        .edge_by_key(key)
        .map(Edge::id)
        .ok_or_else(|| GraphError::EdgeNotFound {
            edge_id: key.to_string(),
        })
}
