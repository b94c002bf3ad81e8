//! Graph walks: BFS/DFS visitors, shortest and bounded all-paths search, and
//! ancestor/descendant collection.
//!
//! Walks follow each node's out-list, plus the reverse of any bidirectional
//! edge. Every walk keeps a visited set, so cyclic pedigrees terminate.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::record::IndividualRecord;
use crate::xref::{EdgeId, NodeId};

use super::edge::{Path, PathKind, PathStep};
use super::node::Node;
use super::store::{FamilyGraph, GraphStore};
use super::GraphResult;

/// Walk order for lineage collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalOrder {
    #[default]
    BreadthFirst,
    DepthFirst,
}

/// Predicate over individual records, applied when lineage results are
/// materialized.
pub type IndividualFilter = Arc<dyn Fn(&dyn IndividualRecord) -> bool + Send + Sync>;

/// Options for ancestor and descendant collection.
#[derive(Clone, Default)]
pub struct LineageOptions {
    /// Generations to walk. Zero means unlimited.
    pub max_generations: usize,
    pub include_self: bool,
    /// Drops individuals from the result. The walk itself still passes
    /// through them.
    pub filter: Option<IndividualFilter>,
    pub order: TraversalOrder,
}

impl LineageOptions {
    pub fn generations(max_generations: usize) -> Self {
        Self {
            max_generations,
            ..Self::default()
        }
    }
}

impl fmt::Debug for LineageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineageOptions")
            .field("max_generations", &self.max_generations)
            .field("include_self", &self.include_self)
            .field("filter", &self.filter.is_some())
            .field("order", &self.order)
            .finish()
    }
}

/// An individual reached by a lineage walk. `depth` is the generation at
/// which it was first discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageEntry {
    pub id: NodeId,
    pub xref: String,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lineage {
    Ancestors,
    Descendants,
}

// ---------------------------------------------------------------------------
// Lock-held walks
// ---------------------------------------------------------------------------

impl GraphStore {
    /// Nodes reachable in one hop, with the edge used, deduplicated by edge.
    pub fn neighbors(&self, id: NodeId) -> Vec<(EdgeId, NodeId)> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(node.out_edges.len());
        for edge in node.out_edges.iter().filter_map(|e| self.edges.get(e)) {
            if seen.insert(edge.id) {
                if let Some(other) = edge.other(id) {
                    out.push((edge.id, other));
                }
            }
        }
        for edge in node.in_edges.iter().filter_map(|e| self.edges.get(e)) {
            if edge.is_bidirectional() && seen.insert(edge.id) {
                if let Some(other) = edge.other(id) {
                    out.push((edge.id, other));
                }
            }
        }
        out
    }

    /// Nodes with a walkable edge into `id`: the mirror of [`neighbors`](Self::neighbors).
    pub fn predecessors(&self, id: NodeId) -> Vec<(EdgeId, NodeId)> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(node.in_edges.len());
        for edge in node.in_edges.iter().filter_map(|e| self.edges.get(e)) {
            if seen.insert(edge.id) {
                if let Some(other) = edge.other(id) {
                    out.push((edge.id, other));
                }
            }
        }
        for edge in node.out_edges.iter().filter_map(|e| self.edges.get(e)) {
            if edge.is_bidirectional() && seen.insert(edge.id) {
                if let Some(other) = edge.other(id) {
                    out.push((edge.id, other));
                }
            }
        }
        out
    }

    /// Visit every reachable node once, breadth first. Returning `false`
    /// from `visit` stops the walk.
    pub fn bfs(&self, start: NodeId, mut visit: impl FnMut(&Node) -> bool) {
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !visit(node) {
                return;
            }
            for (_, next) in self.neighbors(id) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    /// Visit every reachable node once, depth first in preorder. Uses an
    /// explicit stack, so deep pedigrees cannot overflow the call stack.
    pub fn dfs(&self, start: NodeId, mut visit: impl FnMut(&Node) -> bool) {
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !visit(node) {
                return;
            }
            let next = self.neighbors(id);
            // reversed so the first neighbor is visited first
            for (_, n) in next.into_iter().rev() {
                if !visited.contains(&n) {
                    stack.push(n);
                }
            }
        }
    }

    /// Resolve node and edge IDs into a [`Path`].
    pub(crate) fn make_path(&self, nodes: Vec<NodeId>, edges: &[EdgeId]) -> Path {
        let xrefs = nodes
            .iter()
            .map(|id| self.xref_of(*id).unwrap_or_default().to_string())
            .collect();
        let steps: Vec<PathStep> = edges
            .iter()
            .filter_map(|id| self.edges.get(id))
            .map(|edge| PathStep {
                edge: edge.id,
                key: edge.key.clone(),
                kind: edge.kind,
            })
            .collect();
        let kind = PathKind::classify(steps.iter().map(|s| s.kind));
        Path {
            nodes,
            xrefs,
            steps,
            kind,
        }
    }

    /// Shortest path by bidirectional BFS, or `None` if `to` is unreachable.
    ///
    /// Both frontiers advance a whole level at a time; the first level that
    /// meets the other side yields the shortest path, ties going to the
    /// earliest discovery.
    pub fn shortest_path(&self, from: NodeId, to: NodeId) -> Option<Path> {
        if from == to {
            return Some(self.make_path(vec![from], &[]));
        }
        // node -> (previous node toward `from`, edge)
        let mut ahead: HashMap<NodeId, Option<(NodeId, EdgeId)>> = HashMap::from([(from, None)]);
        // node -> (next node toward `to`, edge)
        let mut behind: HashMap<NodeId, Option<(NodeId, EdgeId)>> = HashMap::from([(to, None)]);
        let mut front = vec![from];
        let mut back = vec![to];

        let meet = loop {
            if front.is_empty() || back.is_empty() {
                return None;
            }
            let forward = front.len() <= back.len();
            let (frontier, seen, other) = if forward {
                (&mut front, &mut ahead, &behind)
            } else {
                (&mut back, &mut behind, &ahead)
            };
            let mut next = Vec::new();
            let mut met = None;
            for &id in frontier.iter() {
                let hops = if forward {
                    self.neighbors(id)
                } else {
                    self.predecessors(id)
                };
                for (edge, n) in hops {
                    if seen.contains_key(&n) {
                        continue;
                    }
                    seen.insert(n, Some((id, edge)));
                    if met.is_none() && other.contains_key(&n) {
                        met = Some(n);
                    }
                    next.push(n);
                }
            }
            *frontier = next;
            if let Some(n) = met {
                break n;
            }
        };

        let mut nodes = vec![meet];
        let mut edges = Vec::new();
        let mut cursor = meet;
        while let Some(Some((prev, edge))) = ahead.get(&cursor) {
            nodes.push(*prev);
            edges.push(*edge);
            cursor = *prev;
        }
        nodes.reverse();
        edges.reverse();
        cursor = meet;
        while let Some(Some((next, edge))) = behind.get(&cursor) {
            nodes.push(*next);
            edges.push(*edge);
            cursor = *next;
        }
        Some(self.make_path(nodes, &edges))
    }

    /// Every simple path from `from` to `to` with at most `max_length` edges.
    ///
    /// The result grows exponentially with `max_length` on dense graphs.
    pub fn all_paths(&self, from: NodeId, to: NodeId, max_length: usize) -> Vec<Path> {
        if from == to {
            return vec![self.make_path(vec![from], &[])];
        }
        let mut out = Vec::new();
        let mut nodes = vec![from];
        let mut edges = Vec::new();
        let mut on_path = HashSet::from([from]);
        self.extend_paths(to, max_length, &mut nodes, &mut edges, &mut on_path, &mut out);
        out
    }

    fn extend_paths(
        &self,
        to: NodeId,
        max_length: usize,
        nodes: &mut Vec<NodeId>,
        edges: &mut Vec<EdgeId>,
        on_path: &mut HashSet<NodeId>,
        out: &mut Vec<Path>,
    ) {
        if edges.len() >= max_length {
            return;
        }
        let Some(&current) = nodes.last() else {
            return;
        };
        for (edge, next) in self.neighbors(current) {
            if on_path.contains(&next) {
                continue;
            }
            nodes.push(next);
            edges.push(edge);
            if next == to {
                out.push(self.make_path(nodes.clone(), edges));
            } else {
                on_path.insert(next);
                self.extend_paths(to, max_length, nodes, edges, on_path, out);
                on_path.remove(&next);
            }
            nodes.pop();
            edges.pop();
        }
    }

    /// Individuals one generation away in `direction`.
    fn lineage_step(&self, id: NodeId, direction: Lineage) -> Vec<NodeId> {
        match direction {
            Lineage::Ancestors => self.parents(id),
            Lineage::Descendants => self.children(id),
        }
    }

    /// Individuals reachable in `direction`, with first-discovery depth, in
    /// discovery order. The start is not included.
    pub(crate) fn lineage_depths(
        &self,
        start: NodeId,
        direction: Lineage,
        max_generations: usize,
        order: TraversalOrder,
    ) -> Vec<(NodeId, usize)> {
        let within = |depth: usize| max_generations == 0 || depth < max_generations;
        let mut visited = HashSet::from([start]);
        let mut out = Vec::new();
        match order {
            TraversalOrder::BreadthFirst => {
                let mut queue = VecDeque::from([(start, 0usize)]);
                while let Some((id, depth)) = queue.pop_front() {
                    if !within(depth) {
                        continue;
                    }
                    for next in self.lineage_step(id, direction) {
                        if visited.insert(next) {
                            out.push((next, depth + 1));
                            queue.push_back((next, depth + 1));
                        }
                    }
                }
            }
            TraversalOrder::DepthFirst => {
                let mut stack = vec![(start, 0usize)];
                while let Some((id, depth)) = stack.pop() {
                    if !within(depth) {
                        continue;
                    }
                    let next = self.lineage_step(id, direction);
                    for n in next.into_iter().rev() {
                        if visited.insert(n) {
                            out.push((n, depth + 1));
                            stack.push((n, depth + 1));
                        }
                    }
                }
            }
        }
        out
    }

    /// Lineage collection with options applied.
    pub(crate) fn lineage(&self, start: NodeId, direction: Lineage, options: &LineageOptions) -> Vec<LineageEntry> {
        let mut found = Vec::new();
        if options.include_self {
            found.push((start, 0));
        }
        found.extend(self.lineage_depths(start, direction, options.max_generations, options.order));
        found
            .into_iter()
            .filter(|(id, _)| match (&options.filter, self.individual_record(*id)) {
                (Some(keep), Some(record)) => keep(record.as_ref()),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter_map(|(id, depth)| {
                self.xref_of(id).map(|xref| LineageEntry {
                    id,
                    xref: xref.to_string(),
                    depth,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// XREF-facing API
// ---------------------------------------------------------------------------

impl FamilyGraph {
    /// Breadth-first visit from `start` under the read lock.
    ///
    /// The visitor must not call back into mutating graph methods.
    pub fn bfs(&self, start: &str, visit: impl FnMut(&Node) -> bool) -> GraphResult<()> {
        self.timed(|| {
            let store = self.read();
            let id = store.require_node(start)?;
            store.bfs(id, visit);
            Ok(())
        })
    }

    /// Depth-first visit from `start` under the read lock.
    pub fn dfs(&self, start: &str, visit: impl FnMut(&Node) -> bool) -> GraphResult<()> {
        self.timed(|| {
            let store = self.read();
            let id = store.require_node(start)?;
            store.dfs(id, visit);
            Ok(())
        })
    }

    /// XREFs one hop away from `xref`.
    pub fn neighbors(&self, xref: &str) -> GraphResult<Vec<String>> {
        let store = self.read();
        let id = store.require_node(xref)?;
        let ids: Vec<NodeId> = store.neighbors(id).into_iter().map(|(_, n)| n).collect();
        Ok(store.xrefs_for(&ids))
    }

    /// `Ok(None)` when both nodes exist but are not connected.
    pub fn shortest_path(&self, from: &str, to: &str) -> GraphResult<Option<Path>> {
        self.timed(|| {
            let store = self.read();
            let (a, b) = (store.require_node(from)?, store.require_node(to)?);
            Ok(store.shortest_path(a, b))
        })
    }

    pub fn all_paths(&self, from: &str, to: &str, max_length: usize) -> GraphResult<Vec<Path>> {
        self.timed(|| {
            let store = self.read();
            let (a, b) = (store.require_node(from)?, store.require_node(to)?);
            Ok(store.all_paths(a, b, max_length))
        })
    }

    pub fn ancestors(&self, xref: &str, options: &LineageOptions) -> GraphResult<Vec<LineageEntry>> {
        self.lineage(xref, Lineage::Ancestors, options)
    }

    pub fn descendants(&self, xref: &str, options: &LineageOptions) -> GraphResult<Vec<LineageEntry>> {
        self.lineage(xref, Lineage::Descendants, options)
    }

    fn lineage(&self, xref: &str, direction: Lineage, options: &LineageOptions) -> GraphResult<Vec<LineageEntry>> {
        self.timed(|| {
            let store = self.read();
            let id = store.require_individual(xref)?;
            Ok(store.lineage(id, direction, options))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::graph::edge::{EdgeKind, EdgeSpec};
    use crate::graph::fixtures;
    use crate::record::Record;

    fn xrefs(entries: &[LineageEntry]) -> Vec<&str> {
        let mut out: Vec<&str> = entries.iter().map(|e| e.xref.as_str()).collect();
        out.sort();
        out
    }

    #[test]
    fn bfs_visits_each_node_once() {
        let graph = fixtures::nuclear_family();
        let mut seen = Vec::new();
        graph
            .bfs("@I3@", |node| {
                seen.push(node.xref().to_string());
                true
            })
            .unwrap();
        assert_eq!(seen[0], "@I3@");
        let unique: HashSet<_> = seen.iter().collect();
        assert_eq!(unique.len(), seen.len());
        assert_eq!(seen.len(), graph.node_count());
    }

    #[test]
    fn visitor_can_stop_early() {
        let graph = fixtures::three_generations();
        let mut count = 0;
        graph
            .dfs("@I1@", |_| {
                count += 1;
                count < 2
            })
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn walks_reject_missing_start() {
        let graph = fixtures::nuclear_family();
        assert!(matches!(
            graph.bfs("@X@", |_| true),
            Err(GraphError::NodeNotFound { .. })
        ));
        assert!(matches!(
            graph.dfs("@X@", |_| true),
            Err(GraphError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn shortest_path_to_self_is_empty() {
        let graph = fixtures::nuclear_family();
        let path = graph.shortest_path("@I1@", "@I1@").unwrap().unwrap();
        assert_eq!(path.len(), 0);
        assert_eq!(path.xrefs, vec!["@I1@"]);
    }

    #[test]
    fn shortest_path_child_to_parent() {
        let graph = fixtures::nuclear_family();
        let path = graph.shortest_path("@I3@", "@I1@").unwrap().unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path.start(), Some("@I3@"));
        assert_eq!(path.end(), Some("@I1@"));
        assert_eq!(path.xrefs[1], "@F1@");
        let kinds: Vec<EdgeKind> = path.edge_kinds().collect();
        assert_eq!(kinds, vec![EdgeKind::Famc, EdgeKind::Husb]);
        assert_eq!(path.kind, PathKind::Mixed);
    }

    #[test]
    fn shortest_path_across_generations() {
        let graph = fixtures::three_generations();
        let path = graph.shortest_path("@I3@", "@I1@").unwrap().unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.generations(), 2);
    }

    #[test]
    fn unreachable_is_none_missing_is_error() {
        let graph = fixtures::nuclear_family();
        graph.remove_edge_incremental("@F1@_CHIL_@I3@_0").unwrap();
        assert!(graph.shortest_path("@I1@", "@I3@").unwrap().is_none());
        assert!(graph.shortest_path("@I1@", "@X@").is_err());
    }

    #[test]
    fn all_paths_respects_bound() {
        let graph = fixtures::nuclear_family();
        assert!(graph.all_paths("@I3@", "@I1@", 1).unwrap().is_empty());
        let paths = graph.all_paths("@I3@", "@I1@", 2).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths.iter().all(|p| p.len() <= 2));
        let longer = graph.all_paths("@I3@", "@I1@", 6).unwrap();
        assert!(longer.len() >= paths.len());
        for path in &longer {
            let unique: HashSet<_> = path.nodes.iter().collect();
            assert_eq!(unique.len(), path.nodes.len());
        }
    }

    #[test]
    fn all_paths_follows_bidirectional_links_once() {
        let graph = fixtures::nuclear_family();
        graph
            .add_edge(EdgeSpec::new("@I1@", EdgeKind::Spouse, "@I2@").bidirectional())
            .unwrap();
        assert_eq!(graph.all_paths("@I2@", "@I1@", 1).unwrap().len(), 1);
        assert_eq!(graph.all_paths("@I1@", "@I2@", 1).unwrap().len(), 1);
        assert!(graph.all_paths("@I1@", "@I2@", 0).unwrap().is_empty());
    }

    #[test]
    fn ancestors_honor_generation_limit() {
        let graph = fixtures::three_generations();
        let one = graph.ancestors("@I3@", &LineageOptions::generations(1)).unwrap();
        assert_eq!(xrefs(&one), vec!["@I2@"]);
        let two = graph.ancestors("@I3@", &LineageOptions::generations(2)).unwrap();
        assert_eq!(xrefs(&two), vec!["@I1@", "@I2@"]);
        let all = graph.ancestors("@I3@", &LineageOptions::default()).unwrap();
        assert_eq!(all.iter().find(|e| e.xref == "@I1@").map(|e| e.depth), Some(2));
    }

    #[test]
    fn descendants_with_self_and_filter() {
        let graph = fixtures::three_generations();
        let options = LineageOptions {
            include_self: true,
            filter: Some(Arc::new(|r: &dyn IndividualRecord| r.xref() != "@I2@")),
            ..LineageOptions::default()
        };
        // the filtered parent does not hide the grandchild
        let found = graph.descendants("@I1@", &options).unwrap();
        assert_eq!(xrefs(&found), vec!["@I1@", "@I3@"]);
    }

    #[test]
    fn depth_first_order_reaches_the_same_set() {
        let graph = fixtures::cousins();
        let bfs = graph.descendants("@I1@", &LineageOptions::default()).unwrap();
        let dfs = graph
            .descendants(
                "@I1@",
                &LineageOptions {
                    order: TraversalOrder::DepthFirst,
                    ..LineageOptions::default()
                },
            )
            .unwrap();
        assert_eq!(xrefs(&bfs), xrefs(&dfs));
        assert_eq!(xrefs(&bfs), vec!["@I2@", "@I3@", "@I4@", "@I5@"]);
    }

    #[test]
    fn lineage_terminates_on_cycles() {
        let graph = fixtures::cyclic();
        let ancestors = graph.ancestors("@I1@", &LineageOptions::default()).unwrap();
        let unique: HashSet<_> = ancestors.iter().map(|e| e.id).collect();
        assert_eq!(unique.len(), ancestors.len());
        assert!(!ancestors.is_empty());
    }

    #[test]
    fn lineage_requires_an_individual() {
        let graph = fixtures::nuclear_family();
        assert!(matches!(
            graph.ancestors("@F1@", &LineageOptions::default()),
            Err(GraphError::IndividualNotFound { .. })
        ));
    }
}
