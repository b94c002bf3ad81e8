//! Parents, children, siblings and spouses, derived from edges on every call.
//!
//! Nothing here is stored: `FAMC → family → HUSB/WIFE` gives parents,
//! `FAMS → family → CHIL` gives children, shared `FAMC` families give
//! siblings, and shared `FAMS` families give spouses. The family edge caches
//! make each hop a direct lookup.

use super::edge::EdgeKind;
use super::store::GraphStore;
use crate::xref::{EdgeId, NodeId};

fn push_unique(out: &mut Vec<NodeId>, id: NodeId) {
    if !out.contains(&id) {
        out.push(id);
    }
}

impl GraphStore {
    fn edge_target(&self, edge: EdgeId) -> Option<NodeId> {
        self.edges.get(&edge).map(|e| e.to)
    }

    /// Families in which `id` is a child, in edge order, deduplicated.
    pub fn families_as_child(&self, id: NodeId) -> Vec<NodeId> {
        self.memberships(id, EdgeKind::Famc)
    }

    /// Families in which `id` is a spouse, in edge order, deduplicated.
    pub fn families_as_spouse(&self, id: NodeId) -> Vec<NodeId> {
        self.memberships(id, EdgeKind::Fams)
    }

    fn memberships(&self, id: NodeId, kind: EdgeKind) -> Vec<NodeId> {
        let Some(cache) = self.nodes.get(&id).and_then(|n| n.membership_edges()) else {
            return Vec::new();
        };
        let list = if kind == EdgeKind::Famc {
            &cache.as_child
        } else {
            &cache.as_spouse
        };
        let mut out = Vec::with_capacity(list.len());
        for edge in list.iter().filter_map(|e| self.edges.get(e)) {
            let family = edge.family_node();
            if self.nodes.contains_key(&family) {
                push_unique(&mut out, family);
            }
        }
        out
    }

    pub fn family_husband(&self, family: NodeId) -> Option<NodeId> {
        self.nodes
            .get(&family)
            .and_then(|n| n.family_edges())
            .and_then(|f| f.husband)
            .and_then(|e| self.edge_target(e))
    }

    pub fn family_wife(&self, family: NodeId) -> Option<NodeId> {
        self.nodes
            .get(&family)
            .and_then(|n| n.family_edges())
            .and_then(|f| f.wife)
            .and_then(|e| self.edge_target(e))
    }

    /// Children of a family. Order is not significant: child-edge removal
    /// swaps with the last entry.
    pub fn family_children(&self, family: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(cache) = self.nodes.get(&family).and_then(|n| n.family_edges()) {
            for child in cache.children.iter().filter_map(|e| self.edge_target(*e)) {
                push_unique(&mut out, child);
            }
        }
        out
    }

    /// Husband then wife from the slots, then any further `HUSB`/`WIFE`
    /// targets in out-edge order.
    pub fn family_spouses(&self, family: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(2);
        for spouse in [self.family_husband(family), self.family_wife(family)]
            .into_iter()
            .flatten()
        {
            push_unique(&mut out, spouse);
        }
        let Some(node) = self.nodes.get(&family) else {
            return out;
        };
        for edge in node.out_edges.iter().filter_map(|e| self.edges.get(e)) {
            if matches!(edge.kind, EdgeKind::Husb | EdgeKind::Wife) && self.nodes.contains_key(&edge.to) {
                push_unique(&mut out, edge.to);
            }
        }
        out
    }

    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for family in self.families_as_child(id) {
            for parent in self.family_spouses(family) {
                push_unique(&mut out, parent);
            }
        }
        out
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for family in self.families_as_spouse(id) {
            for child in self.family_children(family) {
                push_unique(&mut out, child);
            }
        }
        out
    }

    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for family in self.families_as_child(id) {
            for sibling in self.family_children(family) {
                if sibling != id {
                    push_unique(&mut out, sibling);
                }
            }
        }
        out
    }

    pub fn spouses(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for family in self.families_as_spouse(id) {
            for spouse in self.family_spouses(family) {
                if spouse != id {
                    push_unique(&mut out, spouse);
                }
            }
        }
        out
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.families_as_spouse(id)
            .into_iter()
            .any(|f| !self.family_children(f).is_empty())
    }

    pub fn has_spouse(&self, id: NodeId) -> bool {
        self.families_as_spouse(id)
            .into_iter()
            .any(|f| self.family_spouses(f).iter().any(|s| *s != id))
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::fixtures;

    #[test]
    fn nuclear_family_relations() {
        let graph = fixtures::nuclear_family();
        let store = graph.read();
        let id = |x: &str| store.id_of(x).unwrap();

        let mut parents = store.xrefs_for(&store.parents(id("@I3@")));
        parents.sort();
        assert_eq!(parents, vec!["@I1@", "@I2@"]);
        assert_eq!(store.xrefs_for(&store.children(id("@I1@"))), vec!["@I3@"]);
        assert_eq!(store.xrefs_for(&store.spouses(id("@I1@"))), vec!["@I2@"]);
        assert!(store.siblings(id("@I3@")).is_empty());
        assert!(store.has_children(id("@I2@")));
        assert!(store.has_spouse(id("@I2@")));
        assert!(!store.has_children(id("@I3@")));
    }

    #[test]
    fn siblings_share_a_family() {
        let graph = fixtures::cousins();
        let store = graph.read();
        let id = |x: &str| store.id_of(x).unwrap();
        assert_eq!(store.xrefs_for(&store.siblings(id("@I2@"))), vec!["@I3@"]);
        assert_eq!(store.xrefs_for(&store.parents(id("@I4@"))), vec!["@I2@"]);
    }

    #[test]
    fn non_individuals_have_no_relatives() {
        let graph = fixtures::nuclear_family();
        let store = graph.read();
        let family = store.id_of("@F1@").unwrap();
        assert!(store.parents(family).is_empty());
        assert!(store.families_as_child(family).is_empty());
    }
}
