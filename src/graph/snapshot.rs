//! Graph snapshots: structure only, records re-resolved through the tree.
//!
//! A snapshot stores every node's internal ID, XREF and kind, plus every
//! edge with its key, endpoints and properties. Record payloads are not
//! stored; reloading looks each XREF up in the source tree again. Event
//! nodes carry their data inline and are restored from the snapshot itself.

use std::collections::BTreeMap;
use std::path::Path as FsPath;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::GraphConfig;
use crate::error::SnapshotError;
use crate::record::{EventData, TreeSource};
use crate::xref::{EdgeId, NodeId};

use super::builder::index_all;
use super::edge::{Direction, EdgeKind, Properties};
use super::mutation::NewEdge;
use super::node::{NodeKind, NodePayload};
use super::store::{FamilyGraph, GraphStore};

/// One saved node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub internal_id: u32,
    pub xref: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub event_data: Option<BTreeMap<String, String>>,
}

/// One saved edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: u32,
    pub key: String,
    pub from_id: u32,
    pub to_id: u32,
    pub kind: EdgeKind,
    #[serde(default)]
    pub family_id: Option<u32>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    /// Next raw node ID the interner would allocate. IDs below it stay retired.
    #[serde(default)]
    pub next_node_id: u32,
    #[serde(default)]
    pub next_edge_id: u32,
}

/// On-disk encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// Compact `bincode`.
    Binary,
    /// Pretty-printed JSON.
    Json,
}

impl SnapshotFormat {
    /// JSON for a `.json` extension, binary otherwise.
    pub fn for_path(path: &FsPath) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Binary,
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

impl GraphSnapshot {
    fn capture(store: &GraphStore) -> Self {
        let mut nodes: Vec<NodeRecord> = store
            .nodes()
            .map(|node| {
                let event = node.event();
                NodeRecord {
                    internal_id: node.id().get(),
                    xref: node.xref().to_string(),
                    kind: node.kind(),
                    event_type: event.map(|e| e.event_type.clone()),
                    event_data: event.map(|e| e.data.clone()),
                }
            })
            .collect();
        nodes.sort_by_key(|n| n.internal_id);

        let mut edges: Vec<EdgeRecord> = store
            .all_edges()
            .map(|edge| EdgeRecord {
                id: edge.id().get(),
                key: edge.key().to_string(),
                from_id: edge.from().get(),
                to_id: edge.to().get(),
                kind: edge.kind(),
                family_id: edge.family().map(NodeId::get),
                direction: edge.direction(),
                properties: edge.properties().clone(),
            })
            .collect();
        edges.sort_by_key(|e| e.id);
        Self {
            nodes,
            edges,
            next_node_id: store.xrefs.peek_next(),
            next_edge_id: store.edge_keys.peek_next(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::Encode {
            message: format!("failed to serialize snapshot: {e}"),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        bincode::deserialize(bytes).map_err(|e| SnapshotError::Decode {
            message: format!("failed to deserialize snapshot: {e}"),
        })
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Encode {
            message: e.to_string(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(text).map_err(|e| SnapshotError::Decode {
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: &FsPath, format: SnapshotFormat) -> Result<(), SnapshotError> {
        let bytes = match format {
            SnapshotFormat::Binary => self.to_bytes()?,
            SnapshotFormat::Json => self.to_json()?.into_bytes(),
        };
        std::fs::write(path, &bytes).map_err(|source| SnapshotError::Io { source })?;
        tracing::info!(
            path = %path.display(),
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            bytes = bytes.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Load a snapshot, choosing the decoder from the file extension.
    pub fn load(path: &FsPath) -> Result<Self, SnapshotError> {
        let bytes = std::fs::read(path).map_err(|source| SnapshotError::Io { source })?;
        let snapshot = match SnapshotFormat::for_path(path) {
            SnapshotFormat::Binary => Self::from_bytes(&bytes)?,
            SnapshotFormat::Json => {
                let text = std::str::from_utf8(&bytes).map_err(|e| SnapshotError::Decode {
                    message: e.to_string(),
                })?;
                Self::from_json(text)?
            }
        };
        tracing::info!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

fn unresolved(kind: NodeKind, xref: &str) -> SnapshotError {
    SnapshotError::UnresolvedRecord {
        kind: kind.to_string(),
        xref: xref.to_string(),
    }
}

fn resolve(record: &NodeRecord, tree: &dyn TreeSource) -> Result<NodePayload, SnapshotError> {
    let xref = record.xref.as_str();
    let payload = match record.kind {
        NodeKind::Individual => tree.individual(xref).map(NodePayload::Individual),
        NodeKind::Family => tree.family(xref).map(NodePayload::Family),
        NodeKind::Note => tree.record(xref).map(NodePayload::Note),
        NodeKind::Source => tree.record(xref).map(NodePayload::Source),
        NodeKind::Repository => tree.record(xref).map(NodePayload::Repository),
        NodeKind::Event => Some(NodePayload::Event(EventData {
            event_type: record.event_type.clone().unwrap_or_default(),
            data: record.event_data.clone().unwrap_or_default(),
        })),
    };
    payload.ok_or_else(|| unresolved(record.kind, xref))
}

fn live_node(store: &GraphStore, raw: u32) -> Result<NodeId, SnapshotError> {
    NodeId::new(raw)
        .filter(|id| store.node(*id).is_some())
        .ok_or(SnapshotError::DanglingId { id: raw })
}

fn restore_store(snapshot: &GraphSnapshot, tree: &dyn TreeSource) -> Result<GraphStore, SnapshotError> {
    let mut store = GraphStore::new();

    let mut nodes: Vec<&NodeRecord> = snapshot.nodes.iter().collect();
    nodes.sort_by_key(|n| n.internal_id);
    for record in nodes {
        let id = NodeId::new(record.internal_id).ok_or(SnapshotError::DanglingId {
            id: record.internal_id,
        })?;
        let payload = resolve(record, tree)?;
        // pinning first makes insert_node reuse the saved ID
        store.xrefs.restore(id, &record.xref)?;
        store.insert_node(&record.xref, payload)?;
    }

    let mut edges: Vec<&EdgeRecord> = snapshot.edges.iter().collect();
    edges.sort_by_key(|e| e.id);
    for record in edges {
        let id = EdgeId::new(record.id).ok_or(SnapshotError::DanglingId { id: record.id })?;
        let from = live_node(&store, record.from_id)?;
        let to = live_node(&store, record.to_id)?;
        let family = record.family_id.map(|raw| live_node(&store, raw)).transpose()?;
        store.edge_keys.restore(id, &record.key)?;
        store.insert_edge(NewEdge {
            key: record.key.clone(),
            from,
            to,
            kind: record.kind,
            family,
            direction: record.direction,
            properties: record.properties.clone(),
        })?;
    }

    store.xrefs.reserve_up_to(snapshot.next_node_id);
    store.edge_keys.reserve_up_to(snapshot.next_edge_id);

    index_all(&mut store);
    Ok(store)
}

impl FamilyGraph {
    /// Capture the current structure under one read lock.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(&self.read())
    }

    /// Rebuild a graph from `snapshot`, resolving records through `tree`.
    ///
    /// Node and edge IDs come back exactly as saved. Indexes are rebuilt.
    pub fn from_snapshot(
        snapshot: &GraphSnapshot,
        tree: Arc<dyn TreeSource>,
        config: GraphConfig,
    ) -> Result<Self, SnapshotError> {
        let store = restore_store(snapshot, tree.as_ref())?;
        tracing::info!(
            nodes = store.node_count(),
            edges = store.edge_count(),
            "graph restored from snapshot"
        );
        let graph = Self::from_store(store, config, Some(tree));
        if let Some(metrics) = graph.metrics() {
            metrics.record_nodes_loaded(graph.node_count());
            metrics.record_edges_loaded(graph.edge_count());
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures;
    use crate::tree::{Family, Individual, MemoryTree};

    fn tree_with_events() -> MemoryTree {
        MemoryTree::new()
            .with_individual(
                Individual::new("@I1@")
                    .named("John /Smith/")
                    .sex("M")
                    .born("1 JAN 1900", "Boston")
                    .spouse_in("@F1@"),
            )
            .with_individual(Individual::new("@I2@").named("Mary /Jones/").sex("F").spouse_in("@F1@"))
            .with_family(
                Family::new("@F1@")
                    .husband("@I1@")
                    .wife("@I2@")
                    .event(EventData::new("MARR").with("place", "Salem")),
            )
    }

    fn restore(graph: &FamilyGraph, snapshot: &GraphSnapshot) -> FamilyGraph {
        let tree = graph.tree().cloned().expect("fixture graphs keep their tree");
        FamilyGraph::from_snapshot(snapshot, tree, GraphConfig::default()).unwrap()
    }

    #[test]
    fn capture_is_sorted_and_complete() {
        let graph = fixtures::nuclear_family();
        let snapshot = graph.snapshot();
        assert_eq!(snapshot.nodes.len(), graph.node_count());
        assert_eq!(snapshot.edges.len(), graph.edge_count());
        assert!(snapshot.nodes.windows(2).all(|w| w[0].internal_id < w[1].internal_id));
        assert!(snapshot.edges.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn restore_keeps_ids_and_relations() {
        let graph = fixtures::nuclear_family();
        let restored = restore(&graph, &graph.snapshot());
        for xref in ["@I1@", "@I2@", "@I3@", "@F1@"] {
            assert_eq!(restored.node_id(xref), graph.node_id(xref));
        }
        assert_eq!(restored.parents("@I3@").unwrap(), vec!["@I1@", "@I2@"]);
        assert_eq!(restored.spouses("@I1@").unwrap(), vec!["@I2@"]);
        assert_eq!(restored.read().indexes().indexed_count(), 3);
    }

    #[test]
    fn removed_ids_stay_vacant() {
        let graph = fixtures::nuclear_family();
        let before = graph.node_id("@I3@");
        graph.remove_node("@I2@").unwrap();
        let restored = restore(&graph, &graph.snapshot());
        assert!(!restored.contains("@I2@"));
        assert_eq!(restored.node_id("@I3@"), before);
        assert_eq!(restored.parents("@I3@").unwrap(), vec!["@I1@"]);
    }

    #[test]
    fn highest_removed_id_is_not_reissued() {
        let graph = fixtures::nuclear_family();
        let family = graph.node_id("@F1@").unwrap();
        assert_eq!(family, graph.read().nodes().map(|n| n.id()).max().unwrap());
        graph.remove_node("@F1@").unwrap();

        let snapshot = GraphSnapshot::from_bytes(&graph.snapshot().to_bytes().unwrap()).unwrap();
        let restored = restore(&graph, &snapshot);
        restored
            .add_node("@F9@", NodePayload::Family(Arc::new(Family::new("@F9@"))))
            .unwrap();
        let fresh = restored.node_id("@F9@").unwrap();
        assert!(fresh.get() > family.get(), "{fresh} reuses a retired id");
    }

    #[test]
    fn events_restore_inline() {
        let graph = fixtures::build(tree_with_events());
        let restored = restore(&graph, &graph.snapshot());
        let node = restored.node("@F1@_MARR_0").unwrap();
        let event = node.event().unwrap();
        assert_eq!(event.event_type, "MARR");
        assert_eq!(event.place(), Some("Salem"));
    }

    #[test]
    fn json_and_binary_agree() {
        let snapshot = fixtures::build(tree_with_events()).snapshot();
        let from_json = GraphSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        let from_bytes = GraphSnapshot::from_bytes(&snapshot.to_bytes().unwrap()).unwrap();
        assert_eq!(from_json, snapshot);
        assert_eq!(from_bytes, snapshot);
    }

    #[test]
    fn missing_record_is_reported() {
        let snapshot = fixtures::nuclear_family().snapshot();
        let partial = MemoryTree::new()
            .with_individual(Individual::new("@I1@").named("John /Smith/"))
            .with_individual(Individual::new("@I2@").named("Mary /Jones/"))
            .with_family(Family::new("@F1@"));
        let err = FamilyGraph::from_snapshot(&snapshot, Arc::new(partial), GraphConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::UnresolvedRecord { ref xref, .. } if xref == "@I3@"
        ));
    }

    #[test]
    fn dangling_edge_endpoint() {
        let graph = fixtures::nuclear_family();
        let mut snapshot = graph.snapshot();
        snapshot.edges[0].to_id = 999;
        let tree = graph.tree().cloned().unwrap();
        let err = FamilyGraph::from_snapshot(&snapshot, tree, GraphConfig::default()).unwrap_err();
        assert!(matches!(err, SnapshotError::DanglingId { id: 999 }));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            GraphSnapshot::from_bytes(&[0xff; 3]),
            Err(SnapshotError::Decode { .. })
        ));
        assert!(GraphSnapshot::from_json("{").is_err());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(SnapshotFormat::for_path(FsPath::new("g.json")), SnapshotFormat::Json);
        assert_eq!(SnapshotFormat::for_path(FsPath::new("g.bin")), SnapshotFormat::Binary);
        assert_eq!(SnapshotFormat::for_path(FsPath::new("g")), SnapshotFormat::Binary);
    }
}
