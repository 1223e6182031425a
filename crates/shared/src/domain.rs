use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(SessionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Event,
    Workshop,
}

/// Inclusive team-size range as written in the catalog: `"1"` or `"2-5"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeamSizeRange {
    min: u32,
    max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeamSizeParseError {
    #[error("team size is empty")]
    Empty,
    #[error("team size bound '{0}' is not a positive integer")]
    InvalidBound(String),
    #[error("team size range {min}-{max} is inverted")]
    Inverted { min: u32, max: u32 },
}

impl TeamSizeRange {
    pub fn new(min: u32, max: u32) -> Result<Self, TeamSizeParseError> {
        if min == 0 {
            return Err(TeamSizeParseError::InvalidBound(min.to_string()));
        }
        if min > max {
            return Err(TeamSizeParseError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn fixed(size: u32) -> Result<Self, TeamSizeParseError> {
        Self::new(size, size)
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn contains(&self, count: u32) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

fn parse_bound(raw: &str) -> Result<u32, TeamSizeParseError> {
    let raw = raw.trim();
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(TeamSizeParseError::InvalidBound(raw.to_string())),
    }
}

impl FromStr for TeamSizeRange {
    type Err = TeamSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TeamSizeParseError::Empty);
        }
        match s.split_once(|c: char| c == '-' || c == '\u{2013}') {
            Some((lo, hi)) => Self::new(parse_bound(lo)?, parse_bound(hi)?),
            None => Self::fixed(parse_bound(s)?),
        }
    }
}

impl fmt::Display for TeamSizeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

impl Serialize for TeamSizeRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TeamSizeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Catalog assets carry the fee either as a number or as a numeric string.
fn deserialize_fee<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFee {
        Number(u64),
        Text(String),
    }

    match RawFee::deserialize(deserializer)? {
        RawFee::Number(value) => Ok(value),
        RawFee::Text(text) => text
            .trim()
            .parse::<u64>()
            .map_err(|_| de::Error::custom(format!("invalid registration fee '{text}'"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub name: String,
    pub date: String,
    pub venue: String,
    pub team_size: TeamSizeRange,
    #[serde(deserialize_with = "deserialize_fee")]
    pub registration_fee: u64,
    pub about: String,
    #[serde(default)]
    pub highlights: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub naac_grade: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub convener: String,
    pub faculty_coordinator: String,
    pub student_coordinator: String,
    #[serde(skip_deserializing, default = "default_kind")]
    pub kind: EventKind,
}

fn default_kind() -> EventKind {
    EventKind::Event
}

impl EventRecord {
    pub fn naac_grade_or_default(&self) -> &str {
        self.naac_grade.as_deref().unwrap_or("A+")
    }

    /// Saturates; catalogs whose fee overflows at the maximum team size are rejected on load.
    pub fn total_fee(&self, participant_count: u32) -> u64 {
        self.registration_fee
            .saturating_mul(u64::from(participant_count))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParticipantField {
    Name,
    Email,
    Phone,
    College,
    CollegeId,
}

impl ParticipantField {
    pub const ALL: [ParticipantField; 5] = [
        ParticipantField::Name,
        ParticipantField::Email,
        ParticipantField::Phone,
        ParticipantField::College,
        ParticipantField::CollegeId,
    ];
}

impl fmt::Display for ParticipantField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParticipantField::Name => "name",
            ParticipantField::Email => "email",
            ParticipantField::Phone => "phone",
            ParticipantField::College => "college",
            ParticipantField::CollegeId => "collegeId",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub college: String,
    pub college_id: String,
}

impl ParticipantForm {
    pub fn field(&self, field: ParticipantField) -> &str {
        match field {
            ParticipantField::Name => &self.name,
            ParticipantField::Email => &self.email,
            ParticipantField::Phone => &self.phone,
            ParticipantField::College => &self.college,
            ParticipantField::CollegeId => &self.college_id,
        }
    }

    pub fn set_field(&mut self, field: ParticipantField, value: impl Into<String>) {
        let slot = match field {
            ParticipantField::Name => &mut self.name,
            ParticipantField::Email => &mut self.email,
            ParticipantField::Phone => &mut self.phone,
            ParticipantField::College => &mut self.college,
            ParticipantField::CollegeId => &mut self.college_id,
        };
        *slot = value.into();
    }

    /// Fields that are blank after trimming, in form order.
    pub fn blank_fields(&self) -> Vec<ParticipantField> {
        ParticipantField::ALL
            .into_iter()
            .filter(|field| self.field(*field).trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Name,
    Email,
    Phone,
    Message,
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContactField::Name => "name",
            ContactField::Email => "email",
            ContactField::Phone => "phone",
            ContactField::Message => "message",
        };
        f.write_str(label)
    }
}
