//! Whole-tree collections: names, places and events.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::graph::{FamilyGraph, NodeKind};
use crate::record::{EventData, FamilyRecord, IndividualRecord, Record};

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameUniqueBy {
    #[default]
    FullName,
    Given,
    Surname,
}

/// Names of every individual, deduplicated by the chosen key.
#[derive(Clone, Copy)]
pub struct NameCollection<'g> {
    graph: &'g FamilyGraph,
    unique_by: NameUniqueBy,
}

impl<'g> NameCollection<'g> {
    pub(crate) fn new(graph: &'g FamilyGraph) -> Self {
        Self {
            graph,
            unique_by: NameUniqueBy::default(),
        }
    }

    pub fn unique_by(mut self, key: NameUniqueBy) -> Self {
        self.unique_by = key;
        self
    }

    fn key(&self, record: &dyn IndividualRecord) -> String {
        match self.unique_by {
            NameUniqueBy::FullName => record.name(),
            NameUniqueBy::Given => record.given_name(),
            NameUniqueBy::Surname => record.surname(),
        }
    }

    /// Every non-empty key, one per individual, in XREF order.
    fn keys(&self) -> Vec<String> {
        self.graph
            .individuals()
            .iter()
            .map(|r| self.key(r.as_ref()))
            .filter(|k| !k.trim().is_empty())
            .collect()
    }

    /// Distinct keys in first-seen order.
    pub fn execute(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.keys().into_iter().filter(|k| seen.insert(k.clone())).collect()
    }

    pub fn count(&self) -> usize {
        self.execute().len()
    }

    /// The `n` most frequent keys with their counts; ties alphabetical.
    pub fn most_common(&self, n: usize) -> Vec<(String, usize)> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for key in self.keys() {
            *counts.entry(key).or_insert(0) += 1;
        }
        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

// ---------------------------------------------------------------------------
// Places
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceUniqueBy {
    #[default]
    FullString,
    City,
    State,
    Country,
    CityState,
}

const COUNTRY_HINTS: [&str; 11] = [
    "USA",
    "US",
    "UNITED STATES",
    "UK",
    "UNITED KINGDOM",
    "CANADA",
    "AUSTRALIA",
    "FRANCE",
    "GERMANY",
    "ITALY",
    "SPAIN",
];

/// A GEDCOM place split into its jurisdictions, most specific first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPlace {
    pub city: String,
    pub county: String,
    pub state: String,
    pub country: String,
    pub components: Vec<String>,
}

impl ParsedPlace {
    /// Split on commas. One part is a city; two are city plus state, or
    /// city plus country when the second looks like a country; three are
    /// city, state, country; four or more are city, county, state, country.
    pub fn parse(place: &str) -> Option<Self> {
        let components: Vec<String> = place
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        let part = |i: usize| components.get(i).cloned().unwrap_or_default();
        let mut parsed = Self {
            city: part(0),
            ..Self::default()
        };
        match components.len() {
            0 => return None,
            1 => {}
            2 => {
                let upper = components[1].to_uppercase();
                if COUNTRY_HINTS.iter().any(|hint| upper.contains(hint)) {
                    parsed.country = part(1);
                } else {
                    parsed.state = part(1);
                }
            }
            3 => {
                parsed.state = part(1);
                parsed.country = part(2);
            }
            _ => {
                parsed.county = part(1);
                parsed.state = part(2);
                parsed.country = part(3);
            }
        }
        parsed.components = components;
        Some(parsed)
    }
}

/// Places mentioned anywhere in the tree, deduplicated by the chosen key.
///
/// Marriage places include divorce places.
#[derive(Clone, Copy)]
pub struct PlaceCollection<'g> {
    graph: &'g FamilyGraph,
    unique_by: PlaceUniqueBy,
    birth: bool,
    death: bool,
    marriage: bool,
    events: bool,
}

impl<'g> PlaceCollection<'g> {
    pub(crate) fn new(graph: &'g FamilyGraph) -> Self {
        Self {
            graph,
            unique_by: PlaceUniqueBy::default(),
            birth: true,
            death: true,
            marriage: true,
            events: true,
        }
    }

    pub fn unique_by(mut self, key: PlaceUniqueBy) -> Self {
        self.unique_by = key;
        self
    }

    pub fn birth(mut self, include: bool) -> Self {
        self.birth = include;
        self
    }

    pub fn death(mut self, include: bool) -> Self {
        self.death = include;
        self
    }

    pub fn marriage(mut self, include: bool) -> Self {
        self.marriage = include;
        self
    }

    pub fn events(mut self, include: bool) -> Self {
        self.events = include;
        self
    }

    /// Raw place strings, each once.
    pub fn all(&self) -> BTreeSet<String> {
        let mut places = BTreeSet::new();
        let mut add = |place: &str| {
            let place = place.trim();
            if !place.is_empty() {
                places.insert(place.to_string());
            }
        };
        let event_places = |events: Vec<EventData>| -> Vec<String> {
            events.iter().filter_map(|e| e.place().map(str::to_string)).collect()
        };

        for record in self.graph.individuals() {
            if self.birth {
                add(&record.birth_place());
            }
            if self.death {
                add(&record.death_place());
            }
            if self.events {
                event_places(record.events()).iter().for_each(|p| add(p));
            }
        }
        for record in self.graph.families() {
            if self.marriage {
                add(&record.marriage_place());
                add(&record.divorce_place());
            }
            if self.events {
                event_places(record.events()).iter().for_each(|p| add(p));
            }
        }
        places
    }

    fn key(&self, place: &str) -> String {
        let Some(parsed) = (self.unique_by != PlaceUniqueBy::FullString)
            .then(|| ParsedPlace::parse(place))
            .flatten()
        else {
            return place.to_string();
        };
        match self.unique_by {
            PlaceUniqueBy::City => parsed.city,
            PlaceUniqueBy::State => parsed.state,
            PlaceUniqueBy::Country => parsed.country,
            PlaceUniqueBy::CityState if parsed.state.is_empty() => parsed.city,
            PlaceUniqueBy::CityState => format!("{}, {}", parsed.city, parsed.state),
            PlaceUniqueBy::FullString => place.to_string(),
        }
    }

    /// Distinct non-empty keys, sorted.
    pub fn execute(&self) -> Vec<String> {
        self.all()
            .iter()
            .map(|p| self.key(p))
            .filter(|k| !k.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.execute().len()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// An event with the record that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    pub owner: String,
    pub owner_kind: NodeKind,
    pub event: EventData,
}

type EventPredicate = Arc<dyn Fn(&EventInfo) -> bool + Send + Sync>;

/// Events of individuals and families, in owner XREF order.
#[derive(Clone)]
pub struct EventCollection<'g> {
    graph: &'g FamilyGraph,
    individuals: bool,
    families: bool,
    types: Vec<String>,
    predicate: Option<EventPredicate>,
}

impl<'g> EventCollection<'g> {
    pub(crate) fn new(graph: &'g FamilyGraph) -> Self {
        Self {
            graph,
            individuals: true,
            families: true,
            types: Vec::new(),
            predicate: None,
        }
    }

    pub fn from_individuals(mut self) -> Self {
        self.individuals = true;
        self.families = false;
        self
    }

    pub fn from_families(mut self) -> Self {
        self.families = true;
        self.individuals = false;
        self
    }

    /// Keep events of this type. Repeat to allow several types.
    pub fn of_type(mut self, event_type: &str) -> Self {
        self.types.push(event_type.to_uppercase());
        self
    }

    pub fn matching(mut self, f: impl Fn(&EventInfo) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(f));
        self
    }

    fn admits(&self, info: &EventInfo) -> bool {
        (self.types.is_empty() || self.types.iter().any(|t| t.eq_ignore_ascii_case(&info.event.event_type)))
            && self.predicate.as_ref().map_or(true, |p| p(info))
    }

    pub fn execute(&self) -> Vec<EventInfo> {
        let mut out = Vec::new();
        let mut push = |owner: &str, owner_kind: NodeKind, events: Vec<EventData>| {
            for event in events {
                let info = EventInfo {
                    owner: owner.to_string(),
                    owner_kind,
                    event,
                };
                if self.admits(&info) {
                    out.push(info);
                }
            }
        };
        if self.individuals {
            for record in self.graph.individuals() {
                push(record.xref(), NodeKind::Individual, record.events());
            }
        }
        if self.families {
            for record in self.graph.families() {
                push(record.xref(), NodeKind::Family, record.events());
            }
        }
        out
    }

    pub fn count(&self) -> usize {
        self.execute().len()
    }

    /// Distinct event types among the matching events, sorted.
    pub fn types(&self) -> Vec<String> {
        self.execute()
            .into_iter()
            .map(|e| e.event.event_type)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
