//! Relationship classification between two individuals.
//!
//! Labels describe what the second individual is to the first: for
//! `calculate_relationship(child, father)` the label is `parent`.
//!
//! The calculation takes the read lock once per step (shortest path, all
//! paths, ancestor sets, common ancestors). A mutation landing between steps
//! can therefore produce a result mixing two graph generations; callers that
//! need a consistent answer must not mutate concurrently.

use std::collections::HashMap;

use crate::record::IndividualRecord;
use crate::xref::NodeId;

use super::edge::{Path, PathKind};
use super::store::{FamilyGraph, GraphStore};
use super::traverse::{Lineage, TraversalOrder};
use super::GraphResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipClass {
    /// Parent, child, sibling or spouse.
    Direct,
    Ancestral,
    Descendant,
    /// Cousins, aunts and uncles, nieces and nephews.
    Collateral,
}

/// An ancestor shared by two individuals, with its generation distance from
/// each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonAncestor {
    pub id: NodeId,
    pub xref: String,
    pub from_depth: usize,
    pub to_depth: usize,
}

impl CommonAncestor {
    pub fn combined_depth(&self) -> usize {
        self.from_depth + self.to_depth
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipResult {
    /// Unset when no relationship could be named, e.g. no common ancestor.
    pub relationship: Option<String>,
    pub class: Option<RelationshipClass>,
    pub degree: usize,
    pub removal: usize,
    pub path: Option<Path>,
    pub all_paths: Vec<Path>,
    pub common_ancestor: Option<CommonAncestor>,
    pub is_direct: bool,
    pub is_ancestral: bool,
    pub is_descendant: bool,
    pub is_collateral: bool,
}

impl RelationshipResult {
    pub fn is_blood(&self) -> bool {
        self.path
            .as_ref()
            .is_some_and(|p| p.kind != PathKind::Marital)
    }

    pub fn is_marital(&self) -> bool {
        self.path
            .as_ref()
            .is_some_and(|p| p.kind != PathKind::Blood)
    }
}

impl GraphStore {
    /// Every ancestor of `id` with its BFS generation depth.
    pub(crate) fn ancestor_depths(&self, id: NodeId) -> HashMap<NodeId, usize> {
        self.lineage_depths(id, Lineage::Ancestors, 0, TraversalOrder::BreadthFirst)
            .into_iter()
            .collect()
    }

    /// Ancestors shared by `a` and `b`, sorted by XREF.
    pub fn common_ancestors(&self, a: NodeId, b: NodeId) -> Vec<CommonAncestor> {
        let from = self.ancestor_depths(a);
        let to = self.ancestor_depths(b);
        let mut shared: Vec<CommonAncestor> = from
            .iter()
            .filter_map(|(id, from_depth)| {
                let to_depth = *to.get(id)?;
                Some(CommonAncestor {
                    id: *id,
                    xref: self.xref_of(*id)?.to_string(),
                    from_depth: *from_depth,
                    to_depth,
                })
            })
            .collect();
        shared.sort_by(|x, y| x.xref.cmp(&y.xref));
        shared
    }

    /// The shared ancestor with the smallest combined depth. Ties go to the
    /// lexicographically smallest XREF.
    pub fn lowest_common_ancestor(&self, a: NodeId, b: NodeId) -> Option<CommonAncestor> {
        self.common_ancestors(a, b)
            .into_iter()
            .min_by_key(CommonAncestor::combined_depth)
    }

    /// `to`'s direct relation to `from`, if any.
    fn direct_relation(&self, from: NodeId, to: NodeId) -> Option<&'static str> {
        if self.parents(from).contains(&to) {
            Some("parent")
        } else if self.children(from).contains(&to) {
            Some("child")
        } else if self.siblings(from).contains(&to) {
            Some("sibling")
        } else if self.spouses(from).contains(&to) {
            Some("spouse")
        } else {
            None
        }
    }

    fn sex_of(&self, id: NodeId) -> String {
        self.individual_record(id)
            .map(|r| r.sex().trim().to_uppercase())
            .unwrap_or_default()
    }
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn removed(removal: usize) -> String {
    match removal {
        1 => "once removed".to_string(),
        n => format!("{n} times removed"),
    }
}

/// Name a collateral relation. `to_is_older` says whether `to` sits nearer
/// the common ancestor; `to_sex` picks uncle/aunt and nephew/niece.
pub(crate) fn collateral_name(degree: usize, removal: usize, to_is_older: bool, to_sex: &str) -> String {
    match (degree, removal) {
        (0, 0) => "sibling".to_string(),
        (0, r) => {
            let base = match (to_is_older, to_sex) {
                (true, "M") => "uncle",
                (true, "F") => "aunt",
                (true, _) => "aunt/uncle",
                (false, "M") => "nephew",
                (false, "F") => "niece",
                (false, _) => "niece/nephew",
            };
            format!("{}{base}", "great-".repeat(r - 1))
        }
        (1, 0) => "cousin".to_string(),
        (1, r) => format!("cousin {}", removed(r)),
        (d, 0) => format!("{} cousin", ordinal(d)),
        (d, r) => format!("{} cousin {}", ordinal(d), removed(r)),
    }
}

impl FamilyGraph {
    pub fn common_ancestors(&self, a: &str, b: &str) -> GraphResult<Vec<CommonAncestor>> {
        self.timed(|| {
            let store = self.read();
            let (x, y) = (store.require_individual(a)?, store.require_individual(b)?);
            Ok(store.common_ancestors(x, y))
        })
    }

    pub fn lowest_common_ancestor(&self, a: &str, b: &str) -> GraphResult<Option<CommonAncestor>> {
        self.timed(|| {
            let store = self.read();
            let (x, y) = (store.require_individual(a)?, store.require_individual(b)?);
            Ok(store.lowest_common_ancestor(x, y))
        })
    }

    /// Classify what `to` is to `from`.
    pub fn calculate_relationship(&self, from: &str, to: &str) -> GraphResult<RelationshipResult> {
        self.timed(|| {
            let (a, b) = {
                let store = self.read();
                (store.require_individual(from)?, store.require_individual(to)?)
            };
            let path = self.read().shortest_path(a, b);
            let all_paths = self
                .read()
                .all_paths(a, b, self.config().relationship_max_path_length);
            let mut result = RelationshipResult {
                path,
                all_paths,
                ..RelationshipResult::default()
            };
            if a == b {
                result.relationship = Some("self".to_string());
                return Ok(result);
            }

            let direct = self.read().direct_relation(a, b);
            result.is_direct = direct.is_some();
            result.is_ancestral = self.read().ancestor_depths(a).contains_key(&b);
            result.is_descendant = self.read().ancestor_depths(b).contains_key(&a);
            result.is_collateral = !result.is_direct && !result.is_ancestral && !result.is_descendant;

            if let Some(name) = direct {
                result.class = Some(RelationshipClass::Direct);
                result.relationship = Some(name.to_string());
            } else if result.is_ancestral || result.is_descendant {
                result.class = Some(if result.is_ancestral {
                    RelationshipClass::Ancestral
                } else {
                    RelationshipClass::Descendant
                });
                result.relationship = Some(if result.is_ancestral { "ancestor" } else { "descendant" }.to_string());
                result.degree = result.path.as_ref().map_or(0, Path::generations);
            } else {
                result.class = Some(RelationshipClass::Collateral);
                let lca = self.read().lowest_common_ancestor(a, b);
                if let Some(lca) = lca {
                    result.removal = lca.from_depth.abs_diff(lca.to_depth);
                    // an LCA at depth zero means one is the other's ancestor
                    if let Some(degree) = lca.from_depth.min(lca.to_depth).checked_sub(1) {
                        result.degree = degree;
                        let sex = self.read().sex_of(b);
                        result.relationship = Some(collateral_name(
                            degree,
                            result.removal,
                            lca.to_depth < lca.from_depth,
                            &sex,
                        ));
                    }
                    result.common_ancestor = Some(lca);
                }
            }
            Ok(result)
        })
    }
}
