//! Secondary indexes over individuals.
//!
//! Name and birth-place strings are folded to lowercase and indexed under the
//! full string plus every word longer than two characters. Sex is indexed
//! uppercase. Birth dates live in a chronologically sorted list, and three
//! boolean maps answer has-children, has-spouse and living lookups.
//!
//! Every key an individual was filed under is remembered, so removal touches
//! only that individual's buckets and drops any bucket it leaves empty.

use std::collections::{BTreeSet, HashMap};
use std::ops::RangeInclusive;

use chrono::NaiveDate;

use crate::record::IndividualRecord;
use crate::xref::NodeId;

/// Words this short are not indexed on their own.
const MIN_TOKEN_CHARS: usize = 3;

/// The indexed facts about one individual.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndividualFacts {
    pub name: String,
    pub birth_place: String,
    pub sex: String,
    pub birth_date: Option<NaiveDate>,
    /// Death date string is empty.
    pub living: bool,
    pub has_children: bool,
    pub has_spouse: bool,
}

impl IndividualFacts {
    /// Read the record fields. Relation flags come from the graph, not the
    /// record, so the caller supplies them.
    pub fn from_record(record: &dyn IndividualRecord, has_children: bool, has_spouse: bool) -> Self {
        Self {
            name: record.name(),
            birth_place: record.birth_place(),
            sex: record.sex(),
            birth_date: record.birth_date(),
            living: record.death_date().is_empty(),
            has_children,
            has_spouse,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct FiledKeys {
    names: BTreeSet<String>,
    places: BTreeSet<String>,
    sex: Option<String>,
    birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterIndexes {
    names: HashMap<String, Vec<NodeId>>,
    places: HashMap<String, Vec<NodeId>>,
    sexes: HashMap<String, Vec<NodeId>>,
    birth_dates: Vec<(NodeId, NaiveDate)>,
    has_children: HashMap<NodeId, bool>,
    has_spouse: HashMap<NodeId, bool>,
    living: HashMap<NodeId, bool>,
    filed: HashMap<NodeId, FiledKeys>,
}

/// Lowercased full string plus its whitespace-separated words longer than
/// two characters.
pub fn tokens(value: &str) -> BTreeSet<String> {
    split_tokens(value, char::is_whitespace)
}

/// Like [`tokens`], but commas also separate words, so `"Leeds, Yorkshire"`
/// files under `leeds` and `yorkshire`.
pub fn place_tokens(value: &str) -> BTreeSet<String> {
    split_tokens(value, |c: char| c.is_whitespace() || c == ',')
}

fn split_tokens(value: &str, separator: impl Fn(char) -> bool) -> BTreeSet<String> {
    let folded = value.trim().to_lowercase();
    let mut out = BTreeSet::new();
    if folded.is_empty() {
        return out;
    }
    for word in folded.split(separator) {
        if word.chars().count() >= MIN_TOKEN_CHARS {
            out.insert(word.to_string());
        }
    }
    out.insert(folded);
    out
}

fn file(bucket: &mut HashMap<String, Vec<NodeId>>, key: &str, id: NodeId) {
    let ids = bucket.entry(key.to_string()).or_default();
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn unfile(bucket: &mut HashMap<String, Vec<NodeId>>, key: &str, id: NodeId) {
    if let Some(ids) = bucket.get_mut(key) {
        ids.retain(|other| *other != id);
        if ids.is_empty() {
            bucket.remove(key);
        }
    }
}

fn sorted(ids: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

impl FilterIndexes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one individual, keeping the birth-date list sorted. Any previous
    /// entry for `id` is replaced.
    pub fn insert(&mut self, id: NodeId, facts: &IndividualFacts) {
        self.file_keys(id, facts);
        if let Some(date) = facts.birth_date {
            let at = self.birth_dates.partition_point(|(_, d)| *d <= date);
            self.birth_dates.insert(at, (id, date));
        }
    }

    /// Index many individuals at once, sorting the birth-date list a single
    /// time at the end.
    pub fn bulk_load<'a>(&mut self, entries: impl IntoIterator<Item = (NodeId, &'a IndividualFacts)>) {
        for (id, facts) in entries {
            self.file_keys(id, facts);
            if let Some(date) = facts.birth_date {
                self.birth_dates.push((id, date));
            }
        }
        self.birth_dates.sort_by_key(|(id, date)| (*date, *id));
    }

    fn file_keys(&mut self, id: NodeId, facts: &IndividualFacts) {
        if self.filed.contains_key(&id) {
            self.remove(id);
        }
        let mut keys = FiledKeys {
            names: tokens(&facts.name),
            places: place_tokens(&facts.birth_place),
            sex: None,
            birth_date: facts.birth_date,
        };
        for key in &keys.names {
            file(&mut self.names, key, id);
        }
        for key in &keys.places {
            file(&mut self.places, key, id);
        }
        let sex = facts.sex.trim().to_uppercase();
        if !sex.is_empty() {
            file(&mut self.sexes, &sex, id);
            keys.sex = Some(sex);
        }
        self.has_children.insert(id, facts.has_children);
        self.has_spouse.insert(id, facts.has_spouse);
        self.living.insert(id, facts.living);
        self.filed.insert(id, keys);
    }

    /// Purge `id` from every structure. Returns whether it was indexed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(keys) = self.filed.remove(&id) else {
            return false;
        };
        for key in &keys.names {
            unfile(&mut self.names, key, id);
        }
        for key in &keys.places {
            unfile(&mut self.places, key, id);
        }
        if let Some(sex) = &keys.sex {
            unfile(&mut self.sexes, sex, id);
        }
        if keys.birth_date.is_some() {
            self.birth_dates.retain(|(other, _)| *other != id);
        }
        self.has_children.remove(&id);
        self.has_spouse.remove(&id);
        self.living.remove(&id);
        true
    }

    /// Refresh the relation flags after an edge mutation. No-op for
    /// individuals that are not indexed.
    pub fn set_relation_flags(&mut self, id: NodeId, has_children: bool, has_spouse: bool) {
        if self.filed.contains_key(&id) {
            self.has_children.insert(id, has_children);
            self.has_spouse.insert(id, has_spouse);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // ---- Lookups ----

    /// Individuals whose name key contains `pattern` (case-insensitive).
    pub fn find_by_name(&self, pattern: &str) -> Vec<NodeId> {
        let needle = pattern.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        sorted(
            self.names
                .iter()
                .filter(|(key, _)| key.contains(&needle))
                .flat_map(|(_, ids)| ids.iter().copied()),
        )
    }

    /// Individuals whose full name or one of its words equals `name`.
    pub fn find_by_name_exact(&self, name: &str) -> Vec<NodeId> {
        let key = name.trim().to_lowercase();
        self.names.get(&key).map(|ids| sorted(ids.iter().copied())).unwrap_or_default()
    }

    pub fn find_by_name_prefix(&self, prefix: &str) -> Vec<NodeId> {
        let needle = prefix.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        sorted(
            self.names
                .iter()
                .filter(|(key, _)| key.starts_with(&needle))
                .flat_map(|(_, ids)| ids.iter().copied()),
        )
    }

    /// Individuals whose birth-place key contains `pattern`.
    pub fn find_by_birth_place(&self, pattern: &str) -> Vec<NodeId> {
        let needle = pattern.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        sorted(
            self.places
                .iter()
                .filter(|(key, _)| key.contains(&needle))
                .flat_map(|(_, ids)| ids.iter().copied()),
        )
    }

    pub fn find_by_sex(&self, sex: &str) -> Vec<NodeId> {
        self.sexes
            .get(&sex.trim().to_uppercase())
            .map(|ids| sorted(ids.iter().copied()))
            .unwrap_or_default()
    }

    /// Individuals born within `range`, in chronological order.
    pub fn find_by_birth_date(&self, range: RangeInclusive<NaiveDate>) -> Vec<NodeId> {
        let start = self.birth_dates.partition_point(|(_, d)| d < range.start());
        let end = self.birth_dates.partition_point(|(_, d)| d <= range.end());
        if start >= end {
            return Vec::new();
        }
        self.birth_dates[start..end].iter().map(|(id, _)| *id).collect()
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.has_children.get(&id).copied().unwrap_or(false)
    }

    pub fn has_spouse(&self, id: NodeId) -> bool {
        self.has_spouse.get(&id).copied().unwrap_or(false)
    }

    pub fn is_living(&self, id: NodeId) -> bool {
        self.living.get(&id).copied().unwrap_or(false)
    }

    /// All indexed individuals matching a boolean flag.
    pub fn with_flag(&self, flag: Flag, value: bool) -> Vec<NodeId> {
        let map = match flag {
            Flag::HasChildren => &self.has_children,
            Flag::HasSpouse => &self.has_spouse,
            Flag::Living => &self.living,
        };
        sorted(map.iter().filter(|(_, v)| **v == value).map(|(id, _)| *id))
    }

    // ---- Introspection ----

    pub fn indexed_count(&self) -> usize {
        self.filed.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.filed.contains_key(&id)
    }

    pub fn name_key_count(&self) -> usize {
        self.names.len()
    }

    pub fn place_key_count(&self) -> usize {
        self.places.len()
    }

    /// Whether `id` appears in any bucket or map.
    pub fn references(&self, id: NodeId) -> bool {
        self.filed.contains_key(&id)
            || self.names.values().any(|ids| ids.contains(&id))
            || self.places.values().any(|ids| ids.contains(&id))
            || self.sexes.values().any(|ids| ids.contains(&id))
            || self.birth_dates.iter().any(|(other, _)| *other == id)
            || self.has_children.contains_key(&id)
            || self.has_spouse.contains_key(&id)
            || self.living.contains_key(&id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    HasChildren,
    HasSpouse,
    Living,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> NodeId {
        NodeId::new(raw).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn facts(name: &str, place: &str, sex: &str, born: Option<NaiveDate>) -> IndividualFacts {
        IndividualFacts {
            name: name.into(),
            birth_place: place.into(),
            sex: sex.into(),
            birth_date: born,
            living: true,
            has_children: false,
            has_spouse: false,
        }
    }

    #[test]
    fn tokenizer_skips_short_words() {
        let t = tokens("Jo de Smith");
        assert!(t.contains("jo de smith"));
        assert!(t.contains("smith"));
        assert!(!t.contains("jo"));
        assert!(!t.contains("de"));
        assert!(tokens("   ").is_empty());
    }

    #[test]
    fn only_places_split_on_commas() {
        assert!(tokens("Smith,John").contains("smith,john"));
        assert!(!tokens("Smith,John").contains("smith"));
        let t = place_tokens("Leeds,Yorkshire, England");
        assert!(t.contains("leeds"));
        assert!(t.contains("yorkshire"));
        assert!(t.contains("england"));
    }

    #[test]
    fn name_lookups() {
        let mut idx = FilterIndexes::new();
        idx.insert(id(1), &facts("John Smith", "", "M", None));
        idx.insert(id(2), &facts("Johanna Smithers", "", "f", None));

        assert_eq!(idx.find_by_name("smith"), vec![id(1), id(2)]);
        assert_eq!(idx.find_by_name_exact("SMITH"), vec![id(1)]);
        assert_eq!(idx.find_by_name_exact("john smith"), vec![id(1)]);
        assert_eq!(idx.find_by_name_prefix("joh"), vec![id(1), id(2)]);
        assert_eq!(idx.find_by_sex("F"), vec![id(2)]);
        assert!(idx.find_by_name("").is_empty());
    }

    #[test]
    fn birth_dates_stay_sorted_on_insert() {
        let mut idx = FilterIndexes::new();
        idx.insert(id(1), &facts("A", "", "", date(1900, 1, 1)));
        idx.insert(id(2), &facts("B", "", "", date(1850, 6, 1)));
        idx.insert(id(3), &facts("C", "", "", date(1875, 3, 3)));

        let all = idx.find_by_birth_date(NaiveDate::MIN..=NaiveDate::MAX);
        assert_eq!(all, vec![id(2), id(3), id(1)]);

        let range = date(1850, 1, 1).unwrap()..=date(1880, 1, 1).unwrap();
        assert_eq!(idx.find_by_birth_date(range), vec![id(2), id(3)]);
    }

    #[test]
    fn bulk_load_sorts_once() {
        let a = facts("A", "", "", date(1990, 1, 1));
        let b = facts("B", "", "", date(1980, 1, 1));
        let mut idx = FilterIndexes::new();
        idx.bulk_load([(id(1), &a), (id(2), &b)]);
        assert_eq!(
            idx.find_by_birth_date(NaiveDate::MIN..=NaiveDate::MAX),
            vec![id(2), id(1)]
        );
        assert_eq!(idx.indexed_count(), 2);
    }

    #[test]
    fn removal_purges_and_drops_empty_buckets() {
        let mut idx = FilterIndexes::new();
        idx.insert(id(1), &facts("Zebulon Quartermaine", "Ypsilanti, Michigan", "M", date(1901, 1, 1)));
        idx.insert(id(2), &facts("Ann Quartermaine", "Detroit, Michigan", "F", None));
        let keys_before = idx.name_key_count();

        assert!(idx.remove(id(1)));
        assert!(!idx.references(id(1)));
        assert!(idx.find_by_name("zebulon").is_empty());
        assert!(idx.name_key_count() < keys_before);
        assert!(idx.find_by_birth_place("ypsilanti").is_empty());
        assert_eq!(idx.find_by_birth_place("michigan"), vec![id(2)]);
        assert!(idx.find_by_sex("M").is_empty());
        assert!(!idx.remove(id(1)));
    }

    #[test]
    fn flags_and_living() {
        let mut idx = FilterIndexes::new();
        let mut dead = facts("Old Timer", "", "M", None);
        dead.living = false;
        idx.insert(id(1), &dead);
        idx.insert(id(2), &facts("Young One", "", "F", None));

        assert!(!idx.is_living(id(1)));
        assert!(idx.is_living(id(2)));
        assert_eq!(idx.with_flag(Flag::Living, true), vec![id(2)]);

        idx.set_relation_flags(id(1), true, true);
        assert!(idx.has_children(id(1)));
        assert!(idx.has_spouse(id(1)));
        // not indexed: ignored
        idx.set_relation_flags(id(9), true, true);
        assert!(!idx.has_children(id(9)));
    }

    #[test]
    fn reinsert_replaces_previous_entry() {
        let mut idx = FilterIndexes::new();
        idx.insert(id(1), &facts("Mary Jones", "", "F", date(1800, 1, 1)));
        idx.insert(id(1), &facts("Mary Brown", "", "F", date(1800, 1, 1)));
        assert!(idx.find_by_name("jones").is_empty());
        assert_eq!(idx.find_by_name("brown"), vec![id(1)]);
        assert_eq!(
            idx.find_by_birth_date(NaiveDate::MIN..=NaiveDate::MAX).len(),
            1
        );
    }
}
