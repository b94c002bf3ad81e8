//! Build a [`FamilyGraph`] from a [`TreeSource`] in three phases: nodes,
//! edges, then indexes.

use std::sync::Arc;
use std::time::Instant;

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::metrics::MetricsCollector;
use crate::record::{EventData, FamilyLink, FamilyRecord, IndividualRecord, Record, TreeSource};
use crate::xref::NodeId;

use super::edge::{EdgeKind, edge_key};
use super::index::IndividualFacts;
use super::mutation::NewEdge;
use super::node::{NodeKind, NodePayload};
use super::store::{FamilyGraph, GraphStore};
use super::GraphResult;

/// Builds graphs from trees.
pub struct GraphBuilder {
    config: GraphConfig,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

impl GraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    /// Use `metrics` instead of the default in-memory collector.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self, tree: Arc<dyn TreeSource>) -> GraphResult<FamilyGraph> {
        let started = Instant::now();
        let mut store = GraphStore::new();

        add_nodes(&mut store, tree.as_ref())?;
        tracing::info!(
            nodes = store.node_count(),
            individuals = store.count_of(NodeKind::Individual),
            families = store.count_of(NodeKind::Family),
            "graph build: nodes created"
        );

        add_family_edges(&mut store, tree.as_ref())?;
        add_reference_edges(&mut store, tree.as_ref())?;
        add_events(&mut store, tree.as_ref())?;
        warn_unreciprocated(&store, tree.as_ref());
        tracing::info!(edges = store.edge_count(), "graph build: edges created");

        index_all(&mut store);
        tracing::info!(
            indexed = store.indexes().indexed_count(),
            "graph build: indexes built"
        );

        let (nodes, edges) = (store.node_count(), store.edge_count());
        let mut graph = FamilyGraph::from_store(store, self.config, Some(tree));
        if let Some(metrics) = self.metrics {
            graph = graph.with_metrics(metrics);
        }
        let elapsed = started.elapsed();
        if let Some(metrics) = graph.metrics() {
            metrics.record_nodes_loaded(nodes);
            metrics.record_edges_loaded(edges);
            metrics.record_build(elapsed);
        }
        tracing::info!(nodes, edges, elapsed_ms = elapsed.as_millis() as u64, "graph built");
        Ok(graph)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Phase 1: nodes
// ---------------------------------------------------------------------------

fn add_nodes(store: &mut GraphStore, tree: &dyn TreeSource) -> GraphResult<()> {
    let mut payloads: Vec<(String, NodePayload)> = Vec::new();
    for record in tree.individuals() {
        payloads.push((record.xref().to_string(), NodePayload::Individual(record)));
    }
    for record in tree.families() {
        payloads.push((record.xref().to_string(), NodePayload::Family(record)));
    }
    for record in tree.notes() {
        payloads.push((record.xref().to_string(), NodePayload::Note(record)));
    }
    for record in tree.sources() {
        payloads.push((record.xref().to_string(), NodePayload::Source(record)));
    }
    for record in tree.repositories() {
        payloads.push((record.xref().to_string(), NodePayload::Repository(record)));
    }
    // stable: within a kind, XREF order; kinds keep the order above
    payloads.sort_by(|a, b| a.1.kind().cmp(&b.1.kind()).then_with(|| a.0.cmp(&b.0)));
    for (xref, payload) in payloads {
        store.insert_node(&xref, payload)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Phase 2: edges
// ---------------------------------------------------------------------------

/// Insert an edge, treating a duplicate as already done.
fn link(store: &mut GraphStore, edge: NewEdge) -> GraphResult<()> {
    match store.insert_edge(edge) {
        Ok(_) => Ok(()),
        Err(GraphError::DuplicateEdge { edge_id }) => {
            tracing::debug!(edge = edge_id.as_str(), "duplicate edge skipped");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn individual_id(store: &GraphStore, xref: &str) -> Option<NodeId> {
    store
        .node_by_xref(xref)
        .filter(|n| n.kind() == NodeKind::Individual)
        .map(|n| n.id())
}

fn add_family_edges(store: &mut GraphStore, tree: &dyn TreeSource) -> GraphResult<()> {
    let mut families = tree.families();
    families.sort_by(|a, b| a.xref().cmp(b.xref()));
    for family in families {
        let fam_xref = family.xref();
        let Some(fam) = store.id_of(fam_xref) else {
            continue;
        };
        let spouses = [
            (family.husband(), EdgeKind::Husb),
            (family.wife(), EdgeKind::Wife),
        ];
        for (spouse, kind) in spouses {
            let Some(spouse) = spouse else {
                continue;
            };
            let Some(person) = individual_id(store, &spouse) else {
                tracing::debug!(family = fam_xref, spouse = spouse.as_str(), "spouse not in tree, skipped");
                continue;
            };
            link(
                store,
                NewEdge::forward(edge_key(fam_xref, kind, &spouse), fam, person, kind, Some(fam)),
            )?;
            link(
                store,
                NewEdge::forward(
                    edge_key(&spouse, EdgeKind::Fams, fam_xref),
                    person,
                    fam,
                    EdgeKind::Fams,
                    Some(fam),
                ),
            )?;
        }
        for (i, child) in family.children().iter().enumerate() {
            let Some(person) = individual_id(store, child) else {
                tracing::debug!(family = fam_xref, child = child.as_str(), "child not in tree, skipped");
                continue;
            };
            let chil = format!("{}_{i}", edge_key(fam_xref, EdgeKind::Chil, child));
            let famc = format!("{}_{i}", edge_key(child, EdgeKind::Famc, fam_xref));
            link(store, NewEdge::forward(chil, fam, person, EdgeKind::Chil, Some(fam)))?;
            link(store, NewEdge::forward(famc, person, fam, EdgeKind::Famc, Some(fam)))?;
        }
    }
    Ok(())
}

/// A record's outgoing note, source and repository references.
struct References {
    xref: String,
    notes: Vec<String>,
    sources: Vec<String>,
    repository: Option<String>,
}

fn gather<R: Record + ?Sized>(out: &mut Vec<References>, records: Vec<Arc<R>>) {
    out.extend(records.into_iter().map(|r| References {
        xref: r.xref().to_string(),
        notes: r.note_refs(),
        sources: r.source_refs(),
        repository: r.repository_ref(),
    }));
}

fn add_reference_edges(store: &mut GraphStore, tree: &dyn TreeSource) -> GraphResult<()> {
    let mut records = Vec::new();
    gather(&mut records, tree.individuals());
    gather(&mut records, tree.families());
    gather(&mut records, tree.notes());
    gather(&mut records, tree.sources());
    gather(&mut records, tree.repositories());
    records.sort_by(|a, b| a.xref.cmp(&b.xref));

    for record in records {
        let Some(from) = store.id_of(&record.xref) else {
            continue;
        };
        let targets = record
            .notes
            .into_iter()
            .map(|x| (x, EdgeKind::Note, NodeKind::Note))
            .chain(record.sources.into_iter().map(|x| (x, EdgeKind::Sour, NodeKind::Source)))
            .chain(record.repository.map(|x| (x, EdgeKind::Repo, NodeKind::Repository)));
        for (target, kind, wanted) in targets {
            let Some(to) = store
                .node_by_xref(&target)
                .filter(|n| n.kind() == wanted)
                .map(|n| n.id())
            else {
                tracing::debug!(from = record.xref.as_str(), target = target.as_str(), "reference target missing, skipped");
                continue;
            };
            link(
                store,
                NewEdge::forward(edge_key(&record.xref, kind, &target), from, to, kind, None),
            )?;
        }
    }
    Ok(())
}

fn add_events(store: &mut GraphStore, tree: &dyn TreeSource) -> GraphResult<()> {
    let mut owners: Vec<(String, Vec<EventData>)> = Vec::new();
    for record in tree.individuals() {
        owners.push((record.xref().to_string(), record.events()));
    }
    for record in tree.families() {
        owners.push((record.xref().to_string(), record.events()));
    }
    owners.sort_by(|a, b| a.0.cmp(&b.0));

    for (owner_xref, events) in owners {
        let Some(owner) = store.id_of(&owner_xref) else {
            continue;
        };
        for (i, event) in events.into_iter().enumerate() {
            let xref = format!("{owner_xref}_{}_{i}", event.event_type);
            let event_id = store.insert_node(&xref, NodePayload::Event(event))?;
            link(
                store,
                NewEdge::forward(
                    edge_key(&owner_xref, EdgeKind::HasEvent, &xref),
                    owner,
                    event_id,
                    EdgeKind::HasEvent,
                    None,
                ),
            )?;
        }
    }
    Ok(())
}

/// Log individual-side family links the family record does not confirm.
fn warn_unreciprocated(store: &GraphStore, tree: &dyn TreeSource) {
    for person in tree.individuals() {
        let xref = person.xref();
        for family in person.family_links(FamilyLink::AsChild) {
            match tree.family(&family) {
                Some(record) if !record.children().iter().any(|c| c == xref) => {
                    tracing::warn!(individual = xref, family = family.as_str(), "FAMC link not reciprocated by family");
                }
                None if store.id_of(&family).is_none() => {
                    tracing::debug!(individual = xref, family = family.as_str(), "FAMC target missing");
                }
                _ => {}
            }
        }
        for family in person.family_links(FamilyLink::AsSpouse) {
            match tree.family(&family) {
                Some(record)
                    if record.husband().as_deref() != Some(xref) && record.wife().as_deref() != Some(xref) =>
                {
                    tracing::warn!(individual = xref, family = family.as_str(), "FAMS link not reciprocated by family");
                }
                None if store.id_of(&family).is_none() => {
                    tracing::debug!(individual = xref, family = family.as_str(), "FAMS target missing");
                }
                _ => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Phase 3: indexes
// ---------------------------------------------------------------------------

/// Index every individual in one pass, sorting birth dates once.
pub(crate) fn index_all(store: &mut GraphStore) {
    let facts: Vec<(NodeId, IndividualFacts)> = store
        .ids_of(NodeKind::Individual)
        .filter_map(|id| {
            let record: &Arc<dyn IndividualRecord> = store.individual_record(id)?;
            Some((
                id,
                IndividualFacts::from_record(record.as_ref(), store.has_children(id), store.has_spouse(id)),
            ))
        })
        .collect();
    store.indexes.clear();
    store.indexes.bulk_load(facts.iter().map(|(id, f)| (*id, f)));
}
