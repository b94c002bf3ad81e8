//! Property tests over generated pedigrees.
//!
//! Each pedigree starts from one patriarch; every blood member of a
//! generation marries an outsider and has `fanout` children.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;

use gedgraph::tree::{Family, Individual, MemoryTree};
use gedgraph::{FamilyGraph, GraphBuilder, GraphConfig};

#[derive(Default)]
struct Pedigree {
    people: BTreeMap<String, Individual>,
    families: Vec<Family>,
    persons: usize,
}

impl Pedigree {
    fn person(&mut self, sex: &str) -> String {
        self.persons += 1;
        let xref = format!("@I{}@", self.persons);
        let person = Individual::new(&xref)
            .named(format!("Person{} /Gen/", self.persons))
            .sex(sex);
        self.people.insert(xref.clone(), person);
        xref
    }

    fn edit(&mut self, xref: &str, f: impl FnOnce(Individual) -> Individual) {
        if let Some(person) = self.people.remove(xref) {
            self.people.insert(xref.to_string(), f(person));
        }
    }

    fn family(&mut self, husband: &str, wife: &str, children: &[String]) {
        let xref = format!("@F{}@", self.families.len() + 1);
        self.edit(husband, |p| p.spouse_in(&xref));
        self.edit(wife, |p| p.spouse_in(&xref));
        let mut family = Family::new(&xref).husband(husband).wife(wife);
        for child in children {
            self.edit(child, |p| p.child_of(&xref));
            family = family.child(child);
        }
        self.families.push(family);
    }
}

/// The tree plus its blood members grouped by generation.
fn pedigree(fanouts: &[usize]) -> (MemoryTree, Vec<Vec<String>>) {
    let mut p = Pedigree::default();
    let root = p.person("M");
    let mut generations = vec![vec![root]];
    for &fanout in fanouts {
        let mut next = Vec::new();
        for parent in generations.last().cloned().unwrap_or_default() {
            let spouse = p.person("F");
            let children: Vec<String> = (0..fanout).map(|_| p.person("M")).collect();
            p.family(&parent, &spouse, &children);
            next.extend(children);
        }
        generations.push(next);
    }

    let mut tree = MemoryTree::new();
    for person in p.people.into_values() {
        tree.insert_individual(person);
    }
    for family in p.families {
        tree.insert_family(family);
    }
    (tree, generations)
}

fn build(tree: MemoryTree) -> FamilyGraph {
    GraphBuilder::new(GraphConfig::default()).build(Arc::new(tree)).unwrap()
}

fn fanouts() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..=3, 1..=3)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn parent_and_child_links_agree(fanouts in fanouts()) {
        let (tree, _) = pedigree(&fanouts);
        let graph = build(tree);
        for xref in graph.xrefs_of(gedgraph::graph::NodeKind::Individual) {
            for parent in graph.parents(&xref).unwrap() {
                prop_assert!(graph.children(&parent).unwrap().contains(&xref));
            }
            for sibling in graph.siblings(&xref).unwrap() {
                prop_assert!(graph.siblings(&sibling).unwrap().contains(&xref));
            }
        }
    }

    #[test]
    fn descendant_depth_is_generation(fanouts in fanouts()) {
        let (tree, generations) = pedigree(&fanouts);
        let graph = build(tree);
        let root = &generations[0][0];
        let entries = graph.query().individual(root).descendants().execute_with_depths().unwrap();
        let blood: usize = generations.iter().skip(1).map(Vec::len).sum();
        prop_assert_eq!(entries.len(), blood);
        for (depth, members) in generations.iter().enumerate().skip(1) {
            for member in members {
                prop_assert!(entries.iter().any(|e| &e.xref == member && e.depth == depth));
            }
        }
    }

    #[test]
    fn same_generation_kin_are_siblings_or_cousins(
        fanouts in fanouts(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let (tree, generations) = pedigree(&fanouts);
        let graph = build(tree);
        let last = generations.last().unwrap();
        let (x, y) = (a.get(last), b.get(last));
        prop_assume!(x != y);

        let result = graph.calculate_relationship(x, y).unwrap();
        let label = result.relationship.unwrap_or_default();
        prop_assert!(label == "sibling" || label.ends_with("cousin"), "unexpected label {}", label);
        prop_assert_eq!(result.removal, 0);
    }

    #[test]
    fn shortest_path_is_never_longer(
        fanouts in fanouts(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let (tree, _) = pedigree(&fanouts);
        let graph = build(tree);
        let xrefs = graph.xrefs_of(gedgraph::graph::NodeKind::Individual);
        let (x, y) = (a.get(&xrefs), b.get(&xrefs));

        let shortest = graph.shortest_path(x, y).unwrap();
        prop_assert!(shortest.is_some(), "pedigree is connected");
        let shortest = shortest.unwrap();
        prop_assert_eq!(shortest.xrefs.first(), Some(x));
        prop_assert_eq!(shortest.xrefs.last(), Some(y));
        for path in graph.all_paths(x, y, 12).unwrap() {
            prop_assert!(path.len() >= shortest.len());
        }
    }

    #[test]
    fn snapshot_restores_structure(fanouts in fanouts()) {
        let (tree, _) = pedigree(&fanouts);
        let tree = Arc::new(tree);
        let graph = GraphBuilder::default().build(tree.clone()).unwrap();
        let bytes = graph.snapshot().to_bytes().unwrap();
        let snapshot = gedgraph::GraphSnapshot::from_bytes(&bytes).unwrap();
        let restored = FamilyGraph::from_snapshot(&snapshot, tree, GraphConfig::default()).unwrap();

        prop_assert_eq!(restored.node_count(), graph.node_count());
        prop_assert_eq!(restored.edge_count(), graph.edge_count());
        for xref in graph.xrefs_of(gedgraph::graph::NodeKind::Individual) {
            prop_assert_eq!(restored.node_id(&xref), graph.node_id(&xref));
            prop_assert_eq!(restored.parents(&xref).unwrap(), graph.parents(&xref).unwrap());
        }
    }
}
