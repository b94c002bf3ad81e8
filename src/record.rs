//! The record accessor interface the graph consumes.
//!
//! Records are owned by the source tree (typically a GEDCOM parser's output).
//! The graph holds them behind `Arc<dyn ...>` and reads them only through the
//! narrow traits below, so any tree implementation can be plugged in.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which side of a family an individual's link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilyLink {
    /// `FAMC`: the family in which the individual is a child.
    AsChild,
    /// `FAMS`: the family in which the individual is a spouse.
    AsSpouse,
}

impl FamilyLink {
    pub fn tag(self) -> &'static str {
        match self {
            Self::AsChild => "FAMC",
            Self::AsSpouse => "FAMS",
        }
    }
}

/// An event attached to a record. Event nodes own this data inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    /// GEDCOM event tag, e.g. `BIRT`, `MARR`, `RESI`.
    pub event_type: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl EventData {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn date(&self) -> Option<&str> {
        self.data.get("date").map(String::as_str)
    }

    pub fn place(&self) -> Option<&str> {
        self.data.get("place").map(String::as_str)
    }
}

/// Accessors shared by every record kind.
pub trait Record: Send + Sync {
    fn xref(&self) -> &str;

    /// XREFs of `NOTE` records referenced by this record.
    fn note_refs(&self) -> Vec<String> {
        Vec::new()
    }

    /// XREFs of `SOUR` records cited by this record.
    fn source_refs(&self) -> Vec<String> {
        Vec::new()
    }

    /// The `REPO` this record points at (sources only).
    fn repository_ref(&self) -> Option<String> {
        None
    }
}

pub trait IndividualRecord: Record {
    fn given_name(&self) -> String;
    fn surname(&self) -> String;
    /// Display name without GEDCOM surname slashes.
    fn name(&self) -> String;
    fn sex(&self) -> String;
    fn birth_place(&self) -> String;
    /// Earliest calendar date the birth date phrase can denote.
    fn birth_date(&self) -> Option<NaiveDate>;
    /// Raw death date phrase; empty means the individual is treated as living.
    fn death_date(&self) -> String;
    fn death_place(&self) -> String;
    fn events(&self) -> Vec<EventData>;
    /// Family XREFs from the individual's own `FAMC`/`FAMS` lines.
    fn family_links(&self, link: FamilyLink) -> Vec<String>;
}

pub trait FamilyRecord: Record {
    fn husband(&self) -> Option<String>;
    fn wife(&self) -> Option<String>;
    fn children(&self) -> Vec<String>;
    fn marriage_place(&self) -> String;
    fn divorce_place(&self) -> String;
    fn events(&self) -> Vec<EventData>;
}

/// A parsed document the graph can be built from.
pub trait TreeSource: Send + Sync {
    fn individuals(&self) -> Vec<Arc<dyn IndividualRecord>>;
    fn families(&self) -> Vec<Arc<dyn FamilyRecord>>;
    fn notes(&self) -> Vec<Arc<dyn Record>>;
    fn sources(&self) -> Vec<Arc<dyn Record>>;
    fn repositories(&self) -> Vec<Arc<dyn Record>>;

    fn individual(&self, xref: &str) -> Option<Arc<dyn IndividualRecord>>;
    fn family(&self, xref: &str) -> Option<Arc<dyn FamilyRecord>>;
    /// Point lookup for notes, sources and repositories.
    fn record(&self, xref: &str) -> Option<Arc<dyn Record>>;
}
