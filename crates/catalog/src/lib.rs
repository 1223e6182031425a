use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use shared::{
    domain::{EventKind, EventRecord, TeamSizeRange},
    error::ValidationError,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("event '{0}' not found")]
    NotFound(String),
    #[error("duplicate event name '{0}' in catalog")]
    DuplicateName(String),
    #[error("event '{event}' is missing required field '{field}'")]
    MissingField { event: String, field: &'static str },
    #[error("event '{event}' fee of {fee} overflows for a team of {team_size}")]
    FeeOverflow { event: String, fee: u64, team_size: u32 },
    #[error("failed to parse {kind:?} catalog: {message}")]
    Parse { kind: EventKind, message: String },
}

/// Read-only, ordered list of events followed by workshops.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    records: Vec<Arc<EventRecord>>,
}

impl EventCatalog {
    pub fn new(records: Vec<EventRecord>) -> std::result::Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for record in &records {
            validate_record(record)?;
            if !seen.insert(record.name.clone()) {
                return Err(CatalogError::DuplicateName(record.name.clone()));
            }
        }

        Ok(Self {
            records: records.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn from_sources(
        events_json: &str,
        workshops_json: &str,
    ) -> std::result::Result<Self, CatalogError> {
        let mut records = parse_records(events_json, EventKind::Event)?;
        records.extend(parse_records(workshops_json, EventKind::Workshop)?);
        Self::new(records)
    }

    pub fn load(events_path: &Path, workshops_path: &Path) -> Result<Self> {
        let events = fs::read_to_string(events_path).with_context(|| {
            format!("failed to read event catalog '{}'", events_path.display())
        })?;
        let workshops = fs::read_to_string(workshops_path).with_context(|| {
            format!(
                "failed to read workshop catalog '{}'",
                workshops_path.display()
            )
        })?;

        let catalog = Self::from_sources(&events, &workshops)?;
        info!(
            events = catalog.events().count(),
            workshops = catalog.workshops().count(),
            "catalog: loaded"
        );
        Ok(catalog)
    }

    pub fn find_by_name(&self, name: &str) -> std::result::Result<&Arc<EventRecord>, CatalogError> {
        self.records
            .iter()
            .find(|record| record.name == name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    pub fn list_excluding(&self, name: &str) -> Vec<&Arc<EventRecord>> {
        self.records
            .iter()
            .filter(|record| record.name != name)
            .collect()
    }

    pub fn events(&self) -> impl Iterator<Item = &Arc<EventRecord>> {
        self.of_kind(EventKind::Event)
    }

    pub fn workshops(&self) -> impl Iterator<Item = &Arc<EventRecord>> {
        self.of_kind(EventKind::Workshop)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EventRecord>> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &Arc<EventRecord>> {
        self.records.iter().filter(move |record| record.kind == kind)
    }
}

fn parse_records(
    raw: &str,
    kind: EventKind,
) -> std::result::Result<Vec<EventRecord>, CatalogError> {
    let mut records: Vec<EventRecord> =
        serde_json::from_str(raw).map_err(|e| CatalogError::Parse {
            kind,
            message: e.to_string(),
        })?;
    for record in &mut records {
        record.kind = kind;
    }
    Ok(records)
}

fn validate_record(record: &EventRecord) -> std::result::Result<(), CatalogError> {
    let required = [
        ("name", record.name.as_str()),
        ("date", record.date.as_str()),
        ("venue", record.venue.as_str()),
        ("about", record.about.as_str()),
        ("convener", record.convener.as_str()),
        ("facultyCoordinator", record.faculty_coordinator.as_str()),
        ("studentCoordinator", record.student_coordinator.as_str()),
    ];

    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(CatalogError::MissingField {
                event: record.name.clone(),
                field,
            });
        }
    }

    let team_size = record.team_size.max();
    if record
        .registration_fee
        .checked_mul(u64::from(team_size))
        .is_none()
    {
        return Err(CatalogError::FeeOverflow {
            event: record.name.clone(),
            fee: record.registration_fee,
            team_size,
        });
    }
    Ok(())
}

/// Per-event minimum participant counts, keyed by exact event name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ParticipantRules {
    minimums: HashMap<String, u32>,
}

impl Default for ParticipantRules {
    fn default() -> Self {
        Self::from_minimums([("Intellect Summit".to_string(), 2)])
    }
}

impl ParticipantRules {
    pub fn none() -> Self {
        Self {
            minimums: HashMap::new(),
        }
    }

    pub fn from_minimums(minimums: impl IntoIterator<Item = (String, u32)>) -> Self {
        Self {
            minimums: minimums.into_iter().collect(),
        }
    }

    pub fn minimum_for(&self, event_name: &str) -> Option<u32> {
        self.minimums.get(event_name).copied()
    }

    /// Team-size bounds after applying any override; an override above the
    /// catalog maximum leaves the event unregistrable.
    pub fn effective_bounds(
        &self,
        event: &EventRecord,
    ) -> std::result::Result<TeamSizeRange, ValidationError> {
        let range = event.team_size;
        let minimum = self
            .minimum_for(&event.name)
            .map_or(range.min(), |minimum| minimum.max(range.min()));

        TeamSizeRange::new(minimum, range.max()).map_err(|_| ValidationError::InvalidBounds {
            event: event.name.clone(),
            minimum,
            max: range.max(),
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
