//! Typed edges and paths.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::xref::{EdgeId, NodeId};

/// Semantic type of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    /// family → husband
    Husb,
    /// family → wife
    Wife,
    /// family → child
    Chil,
    /// individual → family they are a child in
    Famc,
    /// individual → family they are a spouse in
    Fams,
    Note,
    Sour,
    Repo,
    HasEvent,
    /// Derived individual → individual links, for callers that add them.
    Parent,
    Child,
    Spouse,
    Sibling,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Husb => "HUSB",
            Self::Wife => "WIFE",
            Self::Chil => "CHIL",
            Self::Famc => "FAMC",
            Self::Fams => "FAMS",
            Self::Note => "NOTE",
            Self::Sour => "SOUR",
            Self::Repo => "REPO",
            Self::HasEvent => "has_event",
            Self::Parent => "parent",
            Self::Child => "child",
            Self::Spouse => "spouse",
            Self::Sibling => "sibling",
        }
    }

    /// Kinds that count as descent along a path.
    pub fn is_blood(self) -> bool {
        matches!(
            self,
            Self::Famc | Self::Chil | Self::Parent | Self::Child | Self::Sibling
        )
    }

    pub fn is_marital(self) -> bool {
        matches!(self, Self::Fams | Self::Husb | Self::Wife | Self::Spouse)
    }

    /// `FAMC`/`CHIL` edges, one per generation crossed.
    pub fn is_generational(self) -> bool {
        matches!(self, Self::Famc | Self::Chil)
    }

    /// Family-side member kinds (`HUSB`, `WIFE`, `CHIL`).
    pub fn is_member(self) -> bool {
        matches!(self, Self::Husb | Self::Wife | Self::Chil)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    /// Mirrored into both endpoints' in- and out-lists.
    Bidirectional,
}

/// Value stored in an edge's property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

pub type Properties = BTreeMap<String, PropertyValue>;

/// A stored edge. Endpoints are internal IDs; the string key is its public ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub(crate) id: EdgeId,
    pub(crate) key: String,
    pub(crate) from: NodeId,
    pub(crate) to: NodeId,
    pub(crate) kind: EdgeKind,
    pub(crate) family: Option<NodeId>,
    pub(crate) direction: Direction,
    pub(crate) properties: Properties,
}

impl Edge {
    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn from(&self) -> NodeId {
        self.from
    }

    pub fn to(&self) -> NodeId {
        self.to
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    pub fn family(&self) -> Option<NodeId> {
        self.family
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn is_bidirectional(&self) -> bool {
        self.direction == Direction::Bidirectional
    }

    /// The endpoint on the far side of `node`, or `None` if `node` is not an
    /// endpoint.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.from == node {
            Some(self.to)
        } else if self.to == node {
            Some(self.from)
        } else {
            None
        }
    }

    /// The family this edge belongs to: the back-reference if set, otherwise
    /// whichever endpoint is the family for member and membership kinds.
    pub(crate) fn family_node(&self) -> NodeId {
        match (self.family, self.kind) {
            (Some(family), _) => family,
            (None, EdgeKind::Husb | EdgeKind::Wife | EdgeKind::Chil) => self.from,
            _ => self.to,
        }
    }
}

/// Build the conventional edge ID `{from}_{TYPE}_{to}`.
pub fn edge_key(from: &str, kind: EdgeKind, to: &str) -> String {
    format!("{from}_{}_{to}", kind.as_str())
}

/// A caller-supplied edge, addressed by XREF.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    pub key: String,
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    pub family: Option<String>,
    pub direction: Direction,
    pub properties: Properties,
}

impl EdgeSpec {
    /// An edge with the conventional `{from}_{TYPE}_{to}` key.
    pub fn new(from: impl Into<String>, kind: EdgeKind, to: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        Self {
            key: edge_key(&from, kind, &to),
            from,
            to,
            kind,
            family: None,
            direction: Direction::Forward,
            properties: Properties::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn bidirectional(mut self) -> Self {
        self.direction = Direction::Bidirectional;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathKind {
    Blood,
    Marital,
    Mixed,
}

impl PathKind {
    /// Classify a path by the kinds of its edges. Paths with neither blood
    /// nor marital edges (including empty ones) count as blood.
    pub fn classify(kinds: impl IntoIterator<Item = EdgeKind>) -> Self {
        let (mut blood, mut marital) = (false, false);
        for kind in kinds {
            blood |= kind.is_blood();
            marital |= kind.is_marital();
        }
        match (blood, marital) {
            (true, true) => Self::Mixed,
            (false, true) => Self::Marital,
            _ => Self::Blood,
        }
    }
}

/// One hop of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub edge: EdgeId,
    pub key: String,
    pub kind: EdgeKind,
}

/// An ordered walk through the graph, resolved while the read lock was held
/// so it stays meaningful after the lock is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    pub xrefs: Vec<String>,
    pub steps: Vec<PathStep>,
    pub kind: PathKind,
}

impl Path {
    /// Number of edges. Zero for a path from a node to itself.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn start(&self) -> Option<&str> {
        self.xrefs.first().map(String::as_str)
    }

    pub fn end(&self) -> Option<&str> {
        self.xrefs.last().map(String::as_str)
    }

    /// How many generations the path crosses (`FAMC`/`CHIL` hops).
    pub fn generations(&self) -> usize {
        self.steps.iter().filter(|s| s.kind.is_generational()).count()
    }

    pub fn edge_kinds(&self) -> impl Iterator<Item = EdgeKind> + '_ {
        self.steps.iter().map(|s| s.kind)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, xref) in self.xrefs.iter().enumerate() {
            if i > 0 {
                write!(f, " -{}-> ", self.steps[i - 1].kind)?;
            }
            f.write_str(xref)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventional_keys() {
        assert_eq!(edge_key("@F1@", EdgeKind::Husb, "@I1@"), "@F1@_HUSB_@I1@");
        let spec = EdgeSpec::new("@I1@", EdgeKind::Fams, "@F1@").with_family("@F1@");
        assert_eq!(spec.key, "@I1@_FAMS_@F1@");
        assert_eq!(spec.family.as_deref(), Some("@F1@"));
        assert_eq!(spec.direction, Direction::Forward);
    }

    #[test]
    fn path_kind_classification() {
        assert_eq!(
            PathKind::classify([EdgeKind::Famc, EdgeKind::Husb]),
            PathKind::Mixed
        );
        assert_eq!(
            PathKind::classify([EdgeKind::Fams, EdgeKind::Wife]),
            PathKind::Marital
        );
        assert_eq!(
            PathKind::classify([EdgeKind::Famc, EdgeKind::Chil]),
            PathKind::Blood
        );
        assert_eq!(PathKind::classify(Vec::<EdgeKind>::new()), PathKind::Blood);
        assert_eq!(PathKind::classify([EdgeKind::Note]), PathKind::Blood);
    }

    #[test]
    fn other_endpoint() {
        let a = NodeId::new(1).unwrap();
        let b = NodeId::new(2).unwrap();
        let edge = Edge {
            id: EdgeId::new(1).unwrap(),
            key: "k".into(),
            from: a,
            to: b,
            kind: EdgeKind::Spouse,
            family: None,
            direction: Direction::Bidirectional,
            properties: Properties::new(),
        };
        assert_eq!(edge.other(a), Some(b));
        assert_eq!(edge.other(b), Some(a));
        assert_eq!(edge.other(NodeId::new(3).unwrap()), None);
        assert!(edge.is_bidirectional());
    }

    #[test]
    fn property_conversions() {
        let spec = EdgeSpec::new("a", EdgeKind::Spouse, "b")
            .with_property("since", 1901_i64)
            .with_property("source", "census");
        assert_eq!(spec.properties.get("since"), Some(&PropertyValue::Int(1901)));
        assert_eq!(
            spec.properties.get("source"),
            Some(&PropertyValue::Text("census".into()))
        );
    }
}
