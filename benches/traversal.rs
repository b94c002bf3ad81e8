//! Benchmarks for graph build, traversal and relationship queries.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gedgraph::graph::analytics;
use gedgraph::tree::{Family, Individual, MemoryTree};
use gedgraph::{FamilyGraph, GraphBuilder};

/// A seeded pedigree: each blood member marries an outsider and has one to
/// four children, for `generations` generations.
fn pedigree(generations: usize) -> (MemoryTree, Vec<Vec<String>>) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut tree = MemoryTree::new();
    let mut persons = 0usize;
    let mut families = 0usize;
    let next_xref = |prefix: char, counter: &mut usize| {
        *counter += 1;
        format!("@{prefix}{counter}@")
    };

    let root = next_xref('I', &mut persons);
    let mut pending = vec![Individual::new(&root).named("Root /Line/").sex("M")];
    let mut levels = vec![vec![root]];

    for _ in 0..generations {
        let mut next_level = Vec::new();
        let mut next_pending = Vec::new();
        for parent in pending.drain(..) {
            let family = next_xref('F', &mut families);
            let spouse = next_xref('I', &mut persons);
            tree.insert_individual(parent.clone().spouse_in(&family));
            tree.insert_individual(
                Individual::new(&spouse)
                    .named(format!("Spouse{persons} /Other/"))
                    .sex("F")
                    .spouse_in(&family),
            );
            let mut record = Family::new(&family).husband(&parent.xref).wife(&spouse);
            for _ in 0..rng.gen_range(1..=4) {
                let child = next_xref('I', &mut persons);
                record = record.child(&child);
                next_pending.push(
                    Individual::new(&child)
                        .named(format!("Child{persons} /Line/"))
                        .sex("M")
                        .born(format!("{}", 1800 + persons % 200), "Leeds, Yorkshire, England")
                        .child_of(&family),
                );
                next_level.push(child);
            }
            tree.insert_family(record);
        }
        pending = next_pending;
        levels.push(next_level);
    }
    for leaf in pending {
        tree.insert_individual(leaf);
    }
    (tree, levels)
}

fn graph(generations: usize) -> (FamilyGraph, Vec<Vec<String>>) {
    let (tree, levels) = pedigree(generations);
    let graph = GraphBuilder::default().build(Arc::new(tree)).unwrap();
    (graph, levels)
}

fn bench_build(c: &mut Criterion) {
    let (tree, _) = pedigree(6);
    let tree = Arc::new(tree);
    c.bench_function("build_6_generations", |bench| {
        bench.iter(|| black_box(GraphBuilder::default().build(tree.clone()).unwrap()))
    });
}

fn bench_lineage(c: &mut Criterion) {
    let (graph, levels) = graph(6);
    let root = levels[0][0].clone();
    let leaf = levels.last().and_then(|l| l.last()).cloned().unwrap();

    c.bench_function("descendants_of_root", |bench| {
        bench.iter(|| black_box(graph.query().individual(&root).descendants().count().unwrap()))
    });
    c.bench_function("ancestors_of_leaf", |bench| {
        bench.iter(|| black_box(graph.query().individual(&leaf).ancestors().count().unwrap()))
    });
}

fn bench_paths(c: &mut Criterion) {
    let (graph, levels) = graph(6);
    let last = levels.last().unwrap();
    let (a, b) = (last[0].clone(), last[last.len() - 1].clone());

    c.bench_function("shortest_path_leaf_to_leaf", |bench| {
        bench.iter(|| black_box(graph.shortest_path(&a, &b).unwrap()))
    });
    c.bench_function("relationship_leaf_to_leaf", |bench| {
        bench.iter(|| black_box(graph.calculate_relationship(&a, &b).unwrap()))
    });
}

fn bench_filters(c: &mut Criterion) {
    let (graph, _) = graph(6);
    c.bench_function("filter_name_and_place", |bench| {
        bench.iter(|| {
            black_box(
                graph
                    .query()
                    .filter()
                    .name_contains("line")
                    .birth_place("leeds")
                    .count(),
            )
        })
    });
}

fn bench_analytics(c: &mut Criterion) {
    let (graph, _) = graph(4);
    c.bench_function("betweenness_4_generations", |bench| {
        bench.iter(|| black_box(analytics::betweenness_centrality(&graph)))
    });
}

criterion_group!(benches, bench_build, bench_lineage, bench_paths, bench_filters, bench_analytics);
criterion_main!(benches);
