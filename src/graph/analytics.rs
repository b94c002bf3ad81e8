//! Graph analytics: degree, centrality, components and shape measures.
//!
//! Centrality and components run over the kinship projection: an undirected
//! graph of individuals only, linked when they are spouses, parent and child,
//! or siblings in some family. Results are sorted by relevance (score desc,
//! size desc), ties by XREF.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graph::{NodeIndex, UnGraph};
use rayon::prelude::*;
use serde::Serialize;

use crate::xref::NodeId;

use super::node::NodeKind;
use super::store::{FamilyGraph, GraphStore};
use super::GraphResult;

// ---------------------------------------------------------------------------
// Kinship projection
// ---------------------------------------------------------------------------

/// Individuals and their direct kinship links as a petgraph graph.
pub struct Kinship {
    graph: UnGraph<NodeId, ()>,
    index: HashMap<NodeId, NodeIndex>,
    xrefs: Vec<String>,
}

impl Kinship {
    pub fn from_store(store: &GraphStore) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut index = HashMap::new();
        let mut xrefs = Vec::new();
        for id in store.ids_of(NodeKind::Individual) {
            index.insert(id, graph.add_node(id));
            xrefs.push(store.xref_of(id).unwrap_or_default().to_string());
        }

        let mut linked: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
        let mut join = |graph: &mut UnGraph<NodeId, ()>, a: NodeId, b: NodeId| {
            let (Some(&x), Some(&y)) = (index.get(&a), index.get(&b)) else {
                return;
            };
            if x != y && linked.insert((x.min(y), x.max(y))) {
                graph.add_edge(x, y, ());
            }
        };
        for family in store.ids_of(NodeKind::Family) {
            let spouses = store.family_spouses(family);
            let children = store.family_children(family);
            for (i, a) in spouses.iter().enumerate() {
                for b in &spouses[i + 1..] {
                    join(&mut graph, *a, *b);
                }
                for child in &children {
                    join(&mut graph, *a, *child);
                }
            }
            for (i, a) in children.iter().enumerate() {
                for b in &children[i + 1..] {
                    join(&mut graph, *a, *b);
                }
            }
        }
        Self { graph, index, xrefs }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn xref(&self, idx: NodeIndex) -> &str {
        self.xrefs.get(idx.index()).map_or("", String::as_str)
    }

    /// BFS from `start`: hop distance and BFS parent per node index.
    fn bfs(&self, start: NodeIndex) -> (Vec<Option<usize>>, Vec<Option<NodeIndex>>) {
        let n = self.graph.node_count();
        let mut distance = vec![None; n];
        let mut parent = vec![None; n];
        distance[start.index()] = Some(0);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            let Some(d) = distance[node.index()] else {
                continue;
            };
            for next in self.graph.neighbors(node) {
                if distance[next.index()].is_none() {
                    distance[next.index()] = Some(d + 1);
                    parent[next.index()] = Some(node);
                    queue.push_back(next);
                }
            }
        }
        (distance, parent)
    }
}

fn require_in(kinship: &Kinship, store: &GraphStore, xref: &str) -> GraphResult<NodeIndex> {
    let id = store.require_individual(xref)?;
    kinship
        .index
        .get(&id)
        .copied()
        .ok_or_else(|| crate::error::GraphError::IndividualNotFound {
            xref: xref.to_string(),
        })
}

fn by_score_desc(results: &mut [CentralityScore]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.xref.cmp(&b.xref))
    });
}

// ---------------------------------------------------------------------------
// Degree
// ---------------------------------------------------------------------------

/// Raw edge-list degree of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDegree {
    pub xref: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub total: usize,
}

pub fn degree(graph: &FamilyGraph, xref: &str) -> GraphResult<NodeDegree> {
    let node = graph.node(xref)?;
    Ok(NodeDegree {
        xref: xref.to_string(),
        in_degree: node.in_degree(),
        out_degree: node.out_degree(),
        total: node.in_degree() + node.out_degree(),
    })
}

/// A per-individual score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentralityScore {
    pub xref: String,
    pub score: f64,
}

/// Kinship links per individual divided by `n - 1`.
pub fn degree_centrality(graph: &FamilyGraph) -> Vec<CentralityScore> {
    let kinship = Kinship::from_store(&graph.read());
    let n = kinship.node_count();
    let scale = if n > 1 { (n - 1) as f64 } else { 1.0 };
    let mut results: Vec<CentralityScore> = kinship
        .graph
        .node_indices()
        .map(|idx| CentralityScore {
            xref: kinship.xref(idx).to_string(),
            score: kinship.graph.neighbors(idx).count() as f64 / scale,
        })
        .collect();
    by_score_desc(&mut results);
    results
}

// ---------------------------------------------------------------------------
// Betweenness and closeness
// ---------------------------------------------------------------------------

/// For every pair, one BFS shortest path; each individual scores the number
/// of those paths it lies strictly inside, normalized by `n(n-1)/2`.
pub fn betweenness_centrality(graph: &FamilyGraph) -> Vec<CentralityScore> {
    let kinship = Kinship::from_store(&graph.read());
    let n = kinship.node_count();
    if n == 0 {
        return Vec::new();
    }
    let counts = (0..n)
        .into_par_iter()
        .map(|s| {
            let mut local = vec![0.0f64; n];
            let (distance, parent) = kinship.bfs(NodeIndex::new(s));
            for t in s + 1..n {
                if distance[t].is_none() {
                    continue;
                }
                let mut cursor = parent[t];
                while let Some(node) = cursor {
                    if node.index() == s {
                        break;
                    }
                    local[node.index()] += 1.0;
                    cursor = parent[node.index()];
                }
            }
            local
        })
        .reduce(
            || vec![0.0f64; n],
            |mut acc, part| {
                for (a, p) in acc.iter_mut().zip(part) {
                    *a += p;
                }
                acc
            },
        );
    let pairs = (n * (n - 1)) as f64 / 2.0;
    let mut results: Vec<CentralityScore> = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| CentralityScore {
            xref: kinship.xref(NodeIndex::new(i)).to_string(),
            score: if pairs > 0.0 { count / pairs } else { 0.0 },
        })
        .collect();
    by_score_desc(&mut results);
    results
}

/// Individuals reached divided by the sum of distances to them. Isolated
/// individuals score zero.
pub fn closeness_centrality(graph: &FamilyGraph) -> Vec<CentralityScore> {
    let kinship = Kinship::from_store(&graph.read());
    let mut results: Vec<CentralityScore> = (0..kinship.node_count())
        .into_par_iter()
        .map(|i| {
            let (distance, _) = kinship.bfs(NodeIndex::new(i));
            let (reached, total) = distance
                .iter()
                .flatten()
                .filter(|d| **d > 0)
                .fold((0usize, 0usize), |(r, t), d| (r + 1, t + d));
            CentralityScore {
                xref: kinship.xref(NodeIndex::new(i)).to_string(),
                score: if total > 0 { reached as f64 / total as f64 } else { 0.0 },
            }
        })
        .collect();
    by_score_desc(&mut results);
    results
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// A set of individuals connected by kinship links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectedComponent {
    /// Position in the sorted result.
    pub id: usize,
    /// Member XREFs, sorted.
    pub members: Vec<String>,
    pub size: usize,
}

/// Connected components, largest first.
pub fn connected_components(graph: &FamilyGraph) -> Vec<ConnectedComponent> {
    let kinship = Kinship::from_store(&graph.read());
    // on an undirected graph the strongly connected components are the
    // connected components
    let mut groups: Vec<Vec<String>> = tarjan_scc(&kinship.graph)
        .into_iter()
        .map(|indices| {
            let mut members: Vec<String> = indices.iter().map(|i| kinship.xref(*i).to_string()).collect();
            members.sort();
            members
        })
        .collect();
    groups.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    groups
        .into_iter()
        .enumerate()
        .map(|(id, members)| ConnectedComponent {
            id,
            size: members.len(),
            members,
        })
        .collect()
}

/// The component around `xref`, walked at most `max_depth` links out and
/// capped at `max_size` members. Zero means no limit for either.
pub fn component_of(graph: &FamilyGraph, xref: &str, max_depth: usize, max_size: usize) -> GraphResult<Vec<String>> {
    let store = graph.read();
    let kinship = Kinship::from_store(&store);
    let start = require_in(&kinship, &store, xref)?;
    drop(store);

    let mut seen = HashSet::from([start]);
    let mut members = vec![kinship.xref(start).to_string()];
    let mut queue = VecDeque::from([(start, 0usize)]);
    'walk: while let Some((node, depth)) = queue.pop_front() {
        if max_depth != 0 && depth >= max_depth {
            continue;
        }
        for next in kinship.graph.neighbors(node) {
            if max_size != 0 && members.len() >= max_size {
                break 'walk;
            }
            if seen.insert(next) {
                members.push(kinship.xref(next).to_string());
                queue.push_back((next, depth + 1));
            }
        }
    }
    members.sort();
    Ok(members)
}

pub fn is_connected(graph: &FamilyGraph, a: &str, b: &str) -> GraphResult<bool> {
    let store = graph.read();
    let kinship = Kinship::from_store(&store);
    let x = require_in(&kinship, &store, a)?;
    let y = require_in(&kinship, &store, b)?;
    Ok(has_path_connecting(&kinship.graph, x, y, None))
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// Links divided by the `n(n-1)/2` possible links.
pub fn density(graph: &FamilyGraph) -> f64 {
    let kinship = Kinship::from_store(&graph.read());
    let n = kinship.node_count();
    if n < 2 {
        return 0.0;
    }
    kinship.link_count() as f64 / ((n * (n - 1)) as f64 / 2.0)
}

pub fn average_degree(graph: &FamilyGraph) -> f64 {
    let kinship = Kinship::from_store(&graph.read());
    match kinship.node_count() {
        0 => 0.0,
        n => 2.0 * kinship.link_count() as f64 / n as f64,
    }
}

/// Largest eccentricity within any component.
pub fn diameter(graph: &FamilyGraph) -> usize {
    let kinship = Kinship::from_store(&graph.read());
    (0..kinship.node_count())
        .into_par_iter()
        .map(|i| {
            let (distance, _) = kinship.bfs(NodeIndex::new(i));
            distance.into_iter().flatten().max().unwrap_or(0)
        })
        .max()
        .unwrap_or(0)
}

/// Whole-graph overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub individuals: usize,
    pub families: usize,
    pub kinship_links: usize,
    pub components: usize,
    pub largest_component: usize,
    pub density: f64,
    pub average_degree: f64,
    pub diameter: usize,
}

pub fn summary(graph: &FamilyGraph) -> GraphSummary {
    let components = connected_components(graph);
    let (nodes, edges, individuals, families, links) = {
        let store = graph.read();
        let kinship = Kinship::from_store(&store);
        (
            store.node_count(),
            store.edge_count(),
            store.count_of(NodeKind::Individual),
            store.count_of(NodeKind::Family),
            kinship.link_count(),
        )
    };
    GraphSummary {
        nodes,
        edges,
        individuals,
        families,
        kinship_links: links,
        components: components.len(),
        largest_component: components.first().map_or(0, |c| c.size),
        density: density(graph),
        average_degree: average_degree(graph),
        diameter: diameter(graph),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::GraphError;
    use crate::graph::fixtures;
    use crate::tree::Individual;

    #[test]
    fn projection_links_spouses_children_and_siblings() {
        let graph = fixtures::nuclear_family();
        let kinship = Kinship::from_store(&graph.read());
        assert_eq!(kinship.node_count(), 3);
        // husband-wife, husband-child, wife-child
        assert_eq!(kinship.link_count(), 3);
    }

    #[test]
    fn raw_degree() {
        let graph = fixtures::nuclear_family();
        let d = degree(&graph, "@F1@").unwrap();
        assert_eq!(d.out_degree, 3);
        assert_eq!(d.in_degree, 3);
        assert_eq!(d.total, 6);
        assert!(matches!(degree(&graph, "@X@"), Err(GraphError::NodeNotFound { .. })));
    }

    #[test]
    fn degree_centrality_hub_highest() {
        let graph = fixtures::cousins();
        let results = degree_centrality(&graph);
        // I2 and I3 each link to their father, each other and a child
        assert!(results[0].xref == "@I2@" || results[0].xref == "@I3@");
        assert!((results[0].score - 3.0 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn betweenness_favors_bridges() {
        let graph = fixtures::three_generations();
        let results = betweenness_centrality(&graph);
        assert_eq!(results[0].xref, "@I2@");
        // one of three pairs passes through I2
        assert!((results[0].score - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(results.iter().find(|r| r.xref == "@I1@").map(|r| r.score), Some(0.0));
    }

    #[test]
    fn closeness_of_chain() {
        let graph = fixtures::three_generations();
        let results = closeness_centrality(&graph);
        assert_eq!(results[0].xref, "@I2@");
        assert!((results[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn components_sorted_by_size() {
        let graph = fixtures::nuclear_family();
        graph
            .add_individual(Arc::new(Individual::new("@I9@").named("Lone /Wolf/")))
            .unwrap();
        let components = connected_components(&graph);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].members, vec!["@I1@", "@I2@", "@I3@"]);
        assert_eq!(components[1].size, 1);
        assert!(is_connected(&graph, "@I1@", "@I3@").unwrap());
        assert!(!is_connected(&graph, "@I1@", "@I9@").unwrap());
    }

    #[test]
    fn component_of_respects_limits() {
        let graph = fixtures::three_generations();
        assert_eq!(component_of(&graph, "@I1@", 0, 0).unwrap().len(), 3);
        assert_eq!(component_of(&graph, "@I1@", 1, 0).unwrap(), vec!["@I1@", "@I2@"]);
        assert_eq!(component_of(&graph, "@I1@", 0, 2).unwrap().len(), 2);
        assert!(component_of(&graph, "@F1@", 0, 0).is_err());
    }

    #[test]
    fn shape_measures() {
        let graph = fixtures::three_generations();
        assert!((density(&graph) - 2.0 / 3.0).abs() < 1e-9);
        assert!((average_degree(&graph) - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(diameter(&graph), 2);
        let summary = summary(&graph);
        assert_eq!(summary.components, 1);
        assert_eq!(summary.kinship_links, 2);
    }

    #[test]
    fn empty_graph_measures_are_zero() {
        let graph = FamilyGraph::default();
        assert!(betweenness_centrality(&graph).is_empty());
        assert_eq!(density(&graph), 0.0);
        assert_eq!(average_degree(&graph), 0.0);
        assert_eq!(diameter(&graph), 0);
        assert!(connected_components(&graph).is_empty());
    }
}
