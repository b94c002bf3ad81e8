//! An in-memory, serde-loadable [`TreeSource`].
//!
//! `MemoryTree` is what the CLI loads from a JSON tree document, and what the
//! tests and benches build fixtures with. A real GEDCOM parser would provide
//! its own `TreeSource` implementation instead.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::record::{EventData, FamilyLink, FamilyRecord, IndividualRecord, Record, TreeSource};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Individual {
    pub xref: String,
    /// GEDCOM-style name with the surname in slashes, e.g. `John /Smith/`.
    pub name: String,
    pub given: Option<String>,
    pub surname: Option<String>,
    pub sex: String,
    pub birth_date: String,
    pub birth_place: String,
    pub death_date: String,
    pub death_place: String,
    pub famc: Vec<String>,
    pub fams: Vec<String>,
    pub notes: Vec<String>,
    pub sources: Vec<String>,
    pub events: Vec<EventData>,
}

impl Individual {
    pub fn new(xref: impl Into<String>) -> Self {
        Self {
            xref: xref.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn sex(mut self, sex: impl Into<String>) -> Self {
        self.sex = sex.into();
        self
    }

    pub fn born(mut self, date: impl Into<String>, place: impl Into<String>) -> Self {
        self.birth_date = date.into();
        self.birth_place = place.into();
        self
    }

    pub fn died(mut self, date: impl Into<String>, place: impl Into<String>) -> Self {
        self.death_date = date.into();
        self.death_place = place.into();
        self
    }

    pub fn child_of(mut self, family: impl Into<String>) -> Self {
        self.famc.push(family.into());
        self
    }

    pub fn spouse_in(mut self, family: impl Into<String>) -> Self {
        self.fams.push(family.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn event(mut self, event: EventData) -> Self {
        self.events.push(event);
        self
    }

    fn name_parts(&self) -> (String, String) {
        let mut parts = self.name.splitn(3, '/');
        let given = parts.next().unwrap_or_default().trim().to_string();
        let surname = parts.next().unwrap_or_default().trim().to_string();
        (given, surname)
    }
}

impl Record for Individual {
    fn xref(&self) -> &str {
        &self.xref
    }

    fn note_refs(&self) -> Vec<String> {
        self.notes.clone()
    }

    fn source_refs(&self) -> Vec<String> {
        self.sources.clone()
    }
}

impl IndividualRecord for Individual {
    fn given_name(&self) -> String {
        self.given.clone().unwrap_or_else(|| self.name_parts().0)
    }

    fn surname(&self) -> String {
        self.surname.clone().unwrap_or_else(|| self.name_parts().1)
    }

    fn name(&self) -> String {
        self.name
            .replace('/', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn sex(&self) -> String {
        self.sex.clone()
    }

    fn birth_place(&self) -> String {
        self.birth_place.clone()
    }

    fn birth_date(&self) -> Option<NaiveDate> {
        parse_gedcom_date(&self.birth_date)
    }

    fn death_date(&self) -> String {
        self.death_date.clone()
    }

    fn death_place(&self) -> String {
        self.death_place.clone()
    }

    fn events(&self) -> Vec<EventData> {
        self.events.clone()
    }

    fn family_links(&self, link: FamilyLink) -> Vec<String> {
        match link {
            FamilyLink::AsChild => self.famc.clone(),
            FamilyLink::AsSpouse => self.fams.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Family {
    pub xref: String,
    pub husband: Option<String>,
    pub wife: Option<String>,
    pub children: Vec<String>,
    pub marriage_place: String,
    pub divorce_place: String,
    pub notes: Vec<String>,
    pub sources: Vec<String>,
    pub events: Vec<EventData>,
}

impl Family {
    pub fn new(xref: impl Into<String>) -> Self {
        Self {
            xref: xref.into(),
            ..Self::default()
        }
    }

    pub fn husband(mut self, xref: impl Into<String>) -> Self {
        self.husband = Some(xref.into());
        self
    }

    pub fn wife(mut self, xref: impl Into<String>) -> Self {
        self.wife = Some(xref.into());
        self
    }

    pub fn child(mut self, xref: impl Into<String>) -> Self {
        self.children.push(xref.into());
        self
    }

    pub fn married_in(mut self, place: impl Into<String>) -> Self {
        self.marriage_place = place.into();
        self
    }

    pub fn event(mut self, event: EventData) -> Self {
        self.events.push(event);
        self
    }
}

impl Record for Family {
    fn xref(&self) -> &str {
        &self.xref
    }

    fn note_refs(&self) -> Vec<String> {
        self.notes.clone()
    }

    fn source_refs(&self) -> Vec<String> {
        self.sources.clone()
    }
}

impl FamilyRecord for Family {
    fn husband(&self) -> Option<String> {
        self.husband.clone()
    }

    fn wife(&self) -> Option<String> {
        self.wife.clone()
    }

    fn children(&self) -> Vec<String> {
        self.children.clone()
    }

    fn marriage_place(&self) -> String {
        self.marriage_place.clone()
    }

    fn divorce_place(&self) -> String {
        self.divorce_place.clone()
    }

    fn events(&self) -> Vec<EventData> {
        self.events.clone()
    }
}

/// A note, source, or repository record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericRecord {
    pub xref: String,
    /// Note text, source title, or repository name.
    pub text: String,
    pub notes: Vec<String>,
    pub sources: Vec<String>,
    pub repository: Option<String>,
}

impl GenericRecord {
    pub fn new(xref: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            xref: xref.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn in_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }
}

impl Record for GenericRecord {
    fn xref(&self) -> &str {
        &self.xref
    }

    fn note_refs(&self) -> Vec<String> {
        self.notes.clone()
    }

    fn source_refs(&self) -> Vec<String> {
        self.sources.clone()
    }

    fn repository_ref(&self) -> Option<String> {
        self.repository.clone()
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// On-disk JSON layout of a tree document.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeDocument {
    pub individuals: Vec<Individual>,
    pub families: Vec<Family>,
    pub notes: Vec<GenericRecord>,
    pub sources: Vec<GenericRecord>,
    pub repositories: Vec<GenericRecord>,
}

/// A tree held entirely in memory, keyed by XREF.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    individuals: BTreeMap<String, Arc<Individual>>,
    families: BTreeMap<String, Arc<Family>>,
    notes: BTreeMap<String, Arc<GenericRecord>>,
    sources: BTreeMap<String, Arc<GenericRecord>>,
    repositories: BTreeMap<String, Arc<GenericRecord>>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_individual(mut self, individual: Individual) -> Self {
        self.insert_individual(individual);
        self
    }

    pub fn with_family(mut self, family: Family) -> Self {
        self.insert_family(family);
        self
    }

    pub fn with_note(mut self, note: GenericRecord) -> Self {
        self.notes.insert(note.xref.clone(), Arc::new(note));
        self
    }

    pub fn with_source(mut self, source: GenericRecord) -> Self {
        self.sources.insert(source.xref.clone(), Arc::new(source));
        self
    }

    pub fn with_repository(mut self, repository: GenericRecord) -> Self {
        self.repositories
            .insert(repository.xref.clone(), Arc::new(repository));
        self
    }

    pub fn insert_individual(&mut self, individual: Individual) {
        self.individuals
            .insert(individual.xref.clone(), Arc::new(individual));
    }

    pub fn insert_family(&mut self, family: Family) {
        self.families.insert(family.xref.clone(), Arc::new(family));
    }

    /// Drop an individual from the tree. Used to simulate a document that no
    /// longer matches a saved snapshot.
    pub fn remove_individual(&mut self, xref: &str) -> bool {
        self.individuals.remove(xref).is_some()
    }

    pub fn individual_count(&self) -> usize {
        self.individuals.len()
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    pub fn from_document(document: TreeDocument) -> Self {
        let mut tree = Self::new();
        for individual in document.individuals {
            tree.insert_individual(individual);
        }
        for family in document.families {
            tree.insert_family(family);
        }
        for note in document.notes {
            tree.notes.insert(note.xref.clone(), Arc::new(note));
        }
        for source in document.sources {
            tree.sources.insert(source.xref.clone(), Arc::new(source));
        }
        for repository in document.repositories {
            tree.repositories
                .insert(repository.xref.clone(), Arc::new(repository));
        }
        tree
    }

    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        let document: TreeDocument =
            serde_json::from_str(json).map_err(|e| TreeError::Parse {
                message: e.to_string(),
            })?;
        Ok(Self::from_document(document))
    }

    pub fn load(path: &Path) -> Result<Self, TreeError> {
        let json = std::fs::read_to_string(path).map_err(|source| TreeError::Io { source })?;
        Self::from_json(&json)
    }
}

fn erase<T: Record + 'static>(map: &BTreeMap<String, Arc<T>>) -> Vec<Arc<dyn Record>> {
    map.values()
        .map(|r| Arc::clone(r) as Arc<dyn Record>)
        .collect()
}

impl TreeSource for MemoryTree {
    fn individuals(&self) -> Vec<Arc<dyn IndividualRecord>> {
        self.individuals
            .values()
            .map(|r| Arc::clone(r) as Arc<dyn IndividualRecord>)
            .collect()
    }

    fn families(&self) -> Vec<Arc<dyn FamilyRecord>> {
        self.families
            .values()
            .map(|r| Arc::clone(r) as Arc<dyn FamilyRecord>)
            .collect()
    }

    fn notes(&self) -> Vec<Arc<dyn Record>> {
        erase(&self.notes)
    }

    fn sources(&self) -> Vec<Arc<dyn Record>> {
        erase(&self.sources)
    }

    fn repositories(&self) -> Vec<Arc<dyn Record>> {
        erase(&self.repositories)
    }

    fn individual(&self, xref: &str) -> Option<Arc<dyn IndividualRecord>> {
        self.individuals
            .get(xref)
            .map(|r| Arc::clone(r) as Arc<dyn IndividualRecord>)
    }

    fn family(&self, xref: &str) -> Option<Arc<dyn FamilyRecord>> {
        self.families
            .get(xref)
            .map(|r| Arc::clone(r) as Arc<dyn FamilyRecord>)
    }

    fn record(&self, xref: &str) -> Option<Arc<dyn Record>> {
        self.notes
            .get(xref)
            .or_else(|| self.sources.get(xref))
            .or_else(|| self.repositories.get(xref))
            .map(|r| Arc::clone(r) as Arc<dyn Record>)
    }
}

// ---------------------------------------------------------------------------
// Date phrases
// ---------------------------------------------------------------------------

const QUALIFIERS: &[&str] = &["ABT", "ABOUT", "EST", "CAL", "BEF", "AFT", "INT", "TO"];

const MONTHS: &[&str] = &[
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Parse a GEDCOM date phrase to the earliest calendar date it can denote.
///
/// Handles `1 JAN 1900`, `JAN 1900`, `1900`, approximation qualifiers, and
/// ranges (`BET x AND y`, `FROM x TO y`) by taking the first date.
pub fn parse_gedcom_date(raw: &str) -> Option<NaiveDate> {
    let upper = raw.trim().to_ascii_uppercase();
    let mut tokens: Vec<&str> = upper.split_whitespace().collect();

    if matches!(tokens.first(), Some(&"BET") | Some(&"FROM")) {
        tokens.remove(0);
        if let Some(end) = tokens.iter().position(|t| *t == "AND" || *t == "TO") {
            tokens.truncate(end);
        }
    }
    tokens.retain(|t| !QUALIFIERS.contains(t));
    if let Some(phrase) = tokens.iter().position(|t| t.starts_with('(')) {
        tokens.truncate(phrase);
    }

    match tokens.as_slice() {
        [day, month, year] => {
            NaiveDate::from_ymd_opt(parse_year(year)?, month_number(month)?, day.parse().ok()?)
        }
        [month, year] => NaiveDate::from_ymd_opt(parse_year(year)?, month_number(month)?, 1),
        [year] => NaiveDate::from_ymd_opt(parse_year(year)?, 1, 1),
        _ => None,
    }
}

fn parse_year(token: &str) -> Option<i32> {
    // dual dating: "1731/32"
    token.split('/').next()?.parse().ok()
}

fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == token)
        .and_then(|i| u32::try_from(i + 1).ok())
}
