//! Node variants and their adjacency.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::record::{EventData, FamilyRecord, IndividualRecord, Record};
use crate::xref::{EdgeId, NodeId};

/// The six node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Individual,
    Family,
    Note,
    Source,
    Repository,
    Event,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Individual,
        NodeKind::Family,
        NodeKind::Note,
        NodeKind::Source,
        NodeKind::Repository,
        NodeKind::Event,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Family => "family",
            Self::Note => "note",
            Self::Source => "source",
            Self::Repository => "repository",
            Self::Event => "event",
        }
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a node carries. Persistent records stay owned by the tree; events
/// have no standalone record and keep their data inline.
#[derive(Clone)]
pub enum NodePayload {
    Individual(Arc<dyn IndividualRecord>),
    Family(Arc<dyn FamilyRecord>),
    Note(Arc<dyn Record>),
    Source(Arc<dyn Record>),
    Repository(Arc<dyn Record>),
    Event(EventData),
}

impl NodePayload {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Individual(_) => NodeKind::Individual,
            Self::Family(_) => NodeKind::Family,
            Self::Note(_) => NodeKind::Note,
            Self::Source(_) => NodeKind::Source,
            Self::Repository(_) => NodeKind::Repository,
            Self::Event(_) => NodeKind::Event,
        }
    }
}

impl fmt::Debug for NodePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Individual(r) => write!(f, "Individual({})", r.xref()),
            Self::Family(r) => write!(f, "Family({})", r.xref()),
            Self::Note(r) => write!(f, "Note({})", r.xref()),
            Self::Source(r) => write!(f, "Source({})", r.xref()),
            Self::Repository(r) => write!(f, "Repository({})", r.xref()),
            Self::Event(e) => write!(f, "Event({})", e.event_type),
        }
    }
}

/// Direct handles on a family's member edges, so spouse and child lookups
/// do not scan the whole out-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyEdges {
    pub husband: Option<EdgeId>,
    pub wife: Option<EdgeId>,
    pub children: Vec<EdgeId>,
}

/// An individual's `FAMC` and `FAMS` edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipEdges {
    pub as_child: Vec<EdgeId>,
    pub as_spouse: Vec<EdgeId>,
}

/// Kind-specific edge caches. Maintained by the edge primitives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EdgeCache {
    #[default]
    None,
    Family(FamilyEdges),
    Individual(MembershipEdges),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) xref: String,
    pub(crate) payload: NodePayload,
    pub(crate) out_edges: Vec<EdgeId>,
    pub(crate) in_edges: Vec<EdgeId>,
    pub(crate) cache: EdgeCache,
}

impl Node {
    pub(crate) fn new(id: NodeId, xref: String, payload: NodePayload) -> Self {
        let cache = match payload.kind() {
            NodeKind::Family => EdgeCache::Family(FamilyEdges::default()),
            NodeKind::Individual => EdgeCache::Individual(MembershipEdges::default()),
            _ => EdgeCache::None,
        };
        Self {
            id,
            xref,
            payload,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
            cache,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn xref(&self) -> &str {
        &self.xref
    }

    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    pub fn out_edges(&self) -> &[EdgeId] {
        &self.out_edges
    }

    pub fn in_edges(&self) -> &[EdgeId] {
        &self.in_edges
    }

    pub fn out_degree(&self) -> usize {
        self.out_edges.len()
    }

    pub fn in_degree(&self) -> usize {
        self.in_edges.len()
    }

    pub fn individual(&self) -> Option<&Arc<dyn IndividualRecord>> {
        match &self.payload {
            NodePayload::Individual(record) => Some(record),
            _ => None,
        }
    }

    pub fn family(&self) -> Option<&Arc<dyn FamilyRecord>> {
        match &self.payload {
            NodePayload::Family(record) => Some(record),
            _ => None,
        }
    }

    pub fn event(&self) -> Option<&EventData> {
        match &self.payload {
            NodePayload::Event(event) => Some(event),
            _ => None,
        }
    }

    pub fn family_edges(&self) -> Option<&FamilyEdges> {
        match &self.cache {
            EdgeCache::Family(edges) => Some(edges),
            _ => None,
        }
    }

    pub fn membership_edges(&self) -> Option<&MembershipEdges> {
        match &self.cache {
            EdgeCache::Individual(edges) => Some(edges),
            _ => None,
        }
    }

    pub(crate) fn family_edges_mut(&mut self) -> Option<&mut FamilyEdges> {
        match &mut self.cache {
            EdgeCache::Family(edges) => Some(edges),
            _ => None,
        }
    }

    pub(crate) fn membership_edges_mut(&mut self) -> Option<&mut MembershipEdges> {
        match &mut self.cache {
            EdgeCache::Individual(edges) => Some(edges),
            _ => None,
        }
    }
}

/// Remove the first occurrence of `id`, keeping the order of the rest.
pub(crate) fn remove_ordered(list: &mut Vec<EdgeId>, id: EdgeId) -> bool {
    match list.iter().position(|e| *e == id) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}

/// Remove the first occurrence of `id` by swapping in the last element.
pub(crate) fn remove_swap(list: &mut Vec<EdgeId>, id: EdgeId) -> bool {
    match list.iter().position(|e| *e == id) {
        Some(pos) => {
            list.swap_remove(pos);
            true
        }
        None => false,
    }
}
