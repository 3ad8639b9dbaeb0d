use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Core types for the family relationship engine

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub u64);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PersonId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
    #[default]
    #[serde(rename = "x")]
    Unknown,
}

impl Gender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "not stored",
        }
    }
}

/// A date of which any part may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartialDate {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u8>,
    #[serde(default)]
    pub day: Option<u8>,
}

impl PartialDate {
    pub fn year(year: i32) -> Self {
        Self {
            year: Some(year),
            month: None,
            day: None,
        }
    }

    pub fn ymd(year: i32, month: u8, day: u8) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            day: Some(day),
        }
    }

    /// Calendar date, only when all three parts are known and valid
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        match (self.year, self.month, self.day) {
            (Some(year), Some(month), Some(day)) => {
                NaiveDate::from_ymd_opt(year, u32::from(month), u32::from(day))
            }
            _ => None,
        }
    }
}

/// Sort key derived from a birth fact with a known year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BirthKey {
    pub year: i32,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    #[serde(default)]
    pub first_names: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub married_name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub births: Vec<PartialDate>,
    #[serde(default)]
    pub deaths: Vec<PartialDate>,
    /// Deceased, but the moment of death is not known
    #[serde(default)]
    pub death_unconfirmed: bool,
    /// Private people only expose first names and last name
    #[serde(default)]
    pub private: bool,
}

impl Person {
    pub fn new(id: impl Into<PersonId>, first_names: &str, last_name: &str) -> Self {
        Self {
            id: id.into(),
            first_names: first_names.to_string(),
            given_name: String::new(),
            last_name: last_name.to_string(),
            married_name: String::new(),
            gender: Gender::Unknown,
            births: Vec::new(),
            deaths: Vec::new(),
            death_unconfirmed: false,
            private: false,
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn born(mut self, date: PartialDate) -> Self {
        self.births.push(date);
        self
    }

    pub fn died(mut self, date: PartialDate) -> Self {
        self.deaths.push(date);
        self
    }

    /// Full name as shown in the tree and in relation listings
    pub fn full_name(&self) -> String {
        if self.private {
            return format!("{} {}", self.first_names, self.last_name)
                .trim()
                .to_string();
        }

        let mut value = self.first_names.clone();
        if !self.given_name.is_empty() {
            value.push_str(&format!(" ({})", self.given_name));
        }
        if !self.married_name.is_empty() {
            value.push_str(&format!(" {} - {}", self.married_name, self.last_name));
        } else {
            value.push_str(&format!(" {}", self.last_name));
        }
        value.trim().to_string()
    }

    pub fn birth_year(&self) -> Option<i32> {
        self.births.iter().filter_map(|date| date.year).min()
    }

    pub fn death_year(&self) -> Option<i32> {
        self.deaths.iter().filter_map(|date| date.year).min()
    }

    /// Earliest birth fact that carries a year
    pub fn birth_key(&self) -> Option<BirthKey> {
        self.births
            .iter()
            .filter_map(|date| {
                date.year.map(|year| BirthKey {
                    year,
                    month: date.month,
                    day: date.day,
                })
            })
            .min()
    }

    /// "1900 - 1980", "1900", "1900 - " or "- 1980"
    pub fn lifespan(&self) -> String {
        let mut lifespan = String::new();
        if let Some(year) = self.birth_year() {
            lifespan.push_str(&year.to_string());
        }
        let death_year = self.death_year();
        if death_year.is_some() || self.death_unconfirmed {
            lifespan.push_str(" - ");
        }
        if let Some(year) = death_year {
            lifespan.push_str(&year.to_string());
        }
        lifespan
    }

    /// Full name followed by the lifespan, if any
    pub fn display_name(&self) -> String {
        let lifespan = self.lifespan();
        if lifespan.is_empty() {
            self.full_name()
        } else {
            format!("{} ({})", self.full_name(), lifespan.trim())
        }
    }

    pub fn age_at_death(&self) -> Option<i32> {
        let birth = self.births.iter().filter_map(PartialDate::to_naive_date).min();
        let death = self.deaths.iter().filter_map(PartialDate::to_naive_date).min();

        if let (Some(birth), Some(death)) = (birth, death) {
            let mut age = death.year() - birth.year();
            if (death.month(), death.day()) < (birth.month(), birth.day()) {
                age -= 1;
            }
            return Some(age);
        }

        match (self.birth_year(), self.death_year()) {
            (Some(born), Some(died)) => Some(died - born),
            _ => None,
        }
    }

    pub fn belongs_to_family(&self, surname: &str) -> bool {
        let surname = surname.trim();
        !surname.is_empty()
            && (self.last_name.eq_ignore_ascii_case(surname)
                || self.married_name.eq_ignore_ascii_case(surname))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Parent,
    Partner,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Parent => write!(f, "parent"),
            EdgeKind::Partner => write!(f, "partner"),
        }
    }
}

/// Stored relation: `up` is parent (or partner) of `down`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationEdge {
    pub up: PersonId,
    pub down: PersonId,
    #[serde(rename = "type", default = "default_edge_kind")]
    pub kind: EdgeKind,
}

fn default_edge_kind() -> EdgeKind {
    EdgeKind::Parent
}

impl RelationEdge {
    pub fn parent(up: impl Into<PersonId>, down: impl Into<PersonId>) -> Self {
        Self {
            up: up.into(),
            down: down.into(),
            kind: EdgeKind::Parent,
        }
    }

    pub fn partner(a: impl Into<PersonId>, b: impl Into<PersonId>) -> Self {
        Self {
            up: a.into(),
            down: b.into(),
            kind: EdgeKind::Partner,
        }
    }

    /// Partner edges are stored lowest id first
    pub fn canonical(&self) -> Self {
        match self.kind {
            EdgeKind::Partner if self.down < self.up => Self {
                up: self.down,
                down: self.up,
                kind: self.kind,
            },
            _ => *self,
        }
    }

    pub fn is_self_relation(&self) -> bool {
        self.up == self.down
    }
}

/// Identity of an explicitly stored edge inside a relation store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub usize);

/// Relation of a person to the queried person.
///
/// The declaration order is the classification priority: when a person
/// matches more than one kind, the earliest variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Parent,
    Child,
    Partner,
    Sibling,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationKind::Parent => "parent",
            RelationKind::Child => "child",
            RelationKind::Partner => "partner",
            RelationKind::Sibling => "sibling",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRelation {
    pub person: PersonId,
    pub kind: RelationKind,
    pub ordering_key: Option<BirthKey>,
    /// Stored edge backing this relation; inferred relations have none
    pub relation: Option<EdgeId>,
    /// First configured family surname the relative belongs to
    pub family: Option<String>,
}
