//! Index-backed individual filters.

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::graph::index::{FilterIndexes, Flag};
use crate::graph::traverse::IndividualFilter;
use crate::graph::{FamilyGraph, NodeKind};
use crate::record::{IndividualRecord, Record};
use crate::xref::NodeId;

/// Conjunction of index lookups plus an optional predicate.
///
/// Each criterion narrows the candidate set by intersecting with one index
/// lookup; with no criteria every individual is a candidate. Results are
/// sorted by XREF.
#[derive(Clone)]
pub struct FilterQuery<'g> {
    graph: &'g FamilyGraph,
    name_contains: Option<String>,
    name_exact: Option<String>,
    name_prefix: Option<String>,
    sex: Option<String>,
    birth_place: Option<String>,
    born: Option<RangeInclusive<NaiveDate>>,
    flags: Vec<(Flag, bool)>,
    predicate: Option<IndividualFilter>,
}

impl<'g> FilterQuery<'g> {
    pub(crate) fn new(graph: &'g FamilyGraph) -> Self {
        Self {
            graph,
            name_contains: None,
            name_exact: None,
            name_prefix: None,
            sex: None,
            birth_place: None,
            born: None,
            flags: Vec::new(),
            predicate: None,
        }
    }

    /// Case-insensitive substring of the full name or one of its words.
    pub fn name_contains(mut self, pattern: &str) -> Self {
        self.name_contains = Some(pattern.to_string());
        self
    }

    /// The full name or one of its words, case-insensitively.
    pub fn name_exact(mut self, name: &str) -> Self {
        self.name_exact = Some(name.to_string());
        self
    }

    pub fn name_prefix(mut self, prefix: &str) -> Self {
        self.name_prefix = Some(prefix.to_string());
        self
    }

    pub fn sex(mut self, sex: &str) -> Self {
        self.sex = Some(sex.to_string());
        self
    }

    pub fn birth_place(mut self, pattern: &str) -> Self {
        self.birth_place = Some(pattern.to_string());
        self
    }

    /// Birth date within `range`, inclusive. Individuals without a parseable
    /// birth date never match.
    pub fn born_between(mut self, range: RangeInclusive<NaiveDate>) -> Self {
        self.born = Some(range);
        self
    }

    pub fn living(self, value: bool) -> Self {
        self.flag(Flag::Living, value)
    }

    pub fn has_children(self, value: bool) -> Self {
        self.flag(Flag::HasChildren, value)
    }

    pub fn has_spouse(self, value: bool) -> Self {
        self.flag(Flag::HasSpouse, value)
    }

    fn flag(mut self, flag: Flag, value: bool) -> Self {
        self.flags.retain(|(f, _)| *f != flag);
        self.flags.push((flag, value));
        self
    }

    /// Custom predicate, applied after the index lookups.
    pub fn matching(mut self, f: impl Fn(&dyn IndividualRecord) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(f));
        self
    }

    fn lookups(&self, indexes: &FilterIndexes) -> Vec<Vec<NodeId>> {
        let mut out = Vec::new();
        if let Some(p) = &self.name_contains {
            out.push(indexes.find_by_name(p));
        }
        if let Some(n) = &self.name_exact {
            out.push(indexes.find_by_name_exact(n));
        }
        if let Some(p) = &self.name_prefix {
            out.push(indexes.find_by_name_prefix(p));
        }
        if let Some(s) = &self.sex {
            out.push(indexes.find_by_sex(s));
        }
        if let Some(p) = &self.birth_place {
            out.push(indexes.find_by_birth_place(p));
        }
        if let Some(range) = &self.born {
            out.push(indexes.find_by_birth_date(range.clone()));
        }
        for (flag, value) in &self.flags {
            out.push(indexes.with_flag(*flag, *value));
        }
        out
    }

    pub fn execute(&self) -> Vec<Arc<dyn IndividualRecord>> {
        let records = self.graph.timed(|| Ok(self.run())).unwrap_or_default();
        tracing::debug!(matches = records.len(), "filter query");
        records
    }

    fn run(&self) -> Vec<Arc<dyn IndividualRecord>> {
        let store = self.graph.read();

        let mut lookups = self.lookups(store.indexes()).into_iter();
        let mut candidates: HashSet<NodeId> = match lookups.next() {
            Some(first) => first.into_iter().collect(),
            None => store.ids_of(NodeKind::Individual).collect(),
        };
        for ids in lookups {
            if candidates.is_empty() {
                break;
            }
            let ids: HashSet<NodeId> = ids.into_iter().collect();
            candidates.retain(|id| ids.contains(id));
        }

        let mut records: Vec<Arc<dyn IndividualRecord>> = candidates
            .into_iter()
            .filter_map(|id| store.individual_record(id).cloned())
            .filter(|r| self.predicate.as_ref().map_or(true, |p| p(r.as_ref())))
            .collect();
        records.sort_by(|a, b| a.xref().cmp(b.xref()));
        records
    }

    pub fn count(&self) -> usize {
        self.execute().len()
    }

    pub fn xrefs(&self) -> Vec<String> {
        self.execute().iter().map(|r| r.xref().to_string()).collect()
    }
}
