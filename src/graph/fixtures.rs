//! Small trees shared by the unit tests.

use std::sync::Arc;

use crate::tree::{Family, Individual, MemoryTree};

use super::builder::GraphBuilder;
use super::store::FamilyGraph;

fn person(xref: &str, name: &str, sex: &str) -> Individual {
    Individual::new(xref).named(name).sex(sex)
}

pub(crate) fn build(tree: MemoryTree) -> FamilyGraph {
    GraphBuilder::default()
        .build(Arc::new(tree))
        .expect("fixture tree builds")
}

/// I1 (husband) and I2 (wife) in F1 with one child, I3.
pub(crate) fn nuclear_family() -> FamilyGraph {
    build(
        MemoryTree::new()
            .with_individual(person("@I1@", "John /Smith/", "M").spouse_in("@F1@"))
            .with_individual(person("@I2@", "Mary /Jones/", "F").spouse_in("@F1@"))
            .with_individual(person("@I3@", "Tom /Smith/", "M").child_of("@F1@"))
            .with_family(Family::new("@F1@").husband("@I1@").wife("@I2@").child("@I3@")),
    )
}

/// I1 → F1 → I2 → F2 → I3, one parent per family.
pub(crate) fn three_generations() -> FamilyGraph {
    build(
        MemoryTree::new()
            .with_individual(person("@I1@", "Adam /Old/", "M").spouse_in("@F1@"))
            .with_individual(person("@I2@", "Bert /Old/", "M").child_of("@F1@").spouse_in("@F2@"))
            .with_individual(person("@I3@", "Carl /Old/", "M").child_of("@F2@"))
            .with_family(Family::new("@F1@").husband("@I1@").child("@I2@"))
            .with_family(Family::new("@F2@").husband("@I2@").child("@I3@")),
    )
}

fn cousins_tree() -> MemoryTree {
    MemoryTree::new()
        .with_individual(person("@I1@", "Gus /Root/", "M").spouse_in("@F1@"))
        .with_individual(person("@I2@", "Hal /Root/", "M").child_of("@F1@").spouse_in("@F2@"))
        .with_individual(person("@I3@", "Ian /Root/", "M").child_of("@F1@").spouse_in("@F3@"))
        .with_individual(person("@I4@", "Jim /Root/", "M").child_of("@F2@"))
        .with_individual(person("@I5@", "Kim /Root/", "F").child_of("@F3@"))
        .with_family(Family::new("@F1@").husband("@I1@").child("@I2@").child("@I3@"))
        .with_family(Family::new("@F2@").husband("@I2@").child("@I4@"))
        .with_family(Family::new("@F3@").husband("@I3@").child("@I5@"))
}

/// Grandfather I1; his sons I2 and I3; their children I4 and I5.
pub(crate) fn cousins() -> FamilyGraph {
    build(cousins_tree())
}

/// [`cousins`] with grandmother I0 as wife in F1.
pub(crate) fn cousins_with_both_grandparents() -> FamilyGraph {
    let mut tree = cousins_tree().with_individual(person("@I0@", "Ada /Root/", "F").spouse_in("@F1@"));
    tree.insert_family(
        Family::new("@F1@")
            .husband("@I1@")
            .wife("@I0@")
            .child("@I2@")
            .child("@I3@"),
    );
    build(tree)
}

/// I1 and I2 are each recorded as the other's parent.
pub(crate) fn cyclic() -> FamilyGraph {
    build(
        MemoryTree::new()
            .with_individual(person("@I1@", "Loop /One/", "M").child_of("@F1@").spouse_in("@F2@"))
            .with_individual(person("@I2@", "Loop /Two/", "M").child_of("@F2@").spouse_in("@F1@"))
            .with_family(Family::new("@F1@").husband("@I2@").child("@I1@"))
            .with_family(Family::new("@F2@").husband("@I1@").child("@I2@")),
    )
}
