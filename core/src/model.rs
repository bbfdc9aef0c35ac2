// Campus data model
//
// Wire records returned by the backend and the derived types the diagram
// works with.

use crate::palette::{ColorToken, SourcePalette};
use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Bucket for buildings the backend reports without a faculty
pub const OTHER_FACULTY: &str = "Other";

/// Energy source identity: the lowercased source name
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SourceId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<SourceId> for String {
    fn from(value: SourceId) -> Self {
        value.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Wire records
// =============================================================================

/// Energy source as listed by the backend catalog
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnergySourceRecord {
    pub name: String,
    #[serde(default)]
    pub cost_per_kwh: Option<f64>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub priority: Option<i32>,
}

/// Building as listed by the backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildingRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub faculty_id: Option<i64>,
    #[serde(default)]
    pub faculty_name: Option<String>,
    #[serde(default)]
    pub active_sources: Vec<String>,
}

// =============================================================================
// Catalog and hierarchy
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergySource {
    pub id: SourceId,
    pub label: String,
    pub color: ColorToken,
    pub cost_per_kwh: Option<f64>,
}

impl EnergySource {
    pub fn from_record(record: &EnergySourceRecord, palette: &SourcePalette) -> Self {
        let id = SourceId::new(&record.name);
        let color = palette.color_for(&id);
        Self {
            id,
            label: record.name.clone(),
            color,
            cost_per_kwh: record.cost_per_kwh,
        }
    }
}

/// Build the source catalog from backend records. Names that collide once
/// lowercased keep their first occurrence.
pub fn source_catalog(records: &[EnergySourceRecord], palette: &SourcePalette) -> Vec<EnergySource> {
    let mut catalog: Vec<EnergySource> = Vec::with_capacity(records.len());
    for record in records {
        let source = EnergySource::from_record(record, palette);
        if source.id.as_str().is_empty() || catalog.iter().any(|s| s.id == source.id) {
            continue;
        }
        catalog.push(source);
    }
    catalog
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: i64,
    pub name: String,
    pub faculty_name: String,
    /// Deduplicated, in the order the backend first reported each source
    pub active_sources: Vec<SourceId>,
}

impl Building {
    pub fn new<S: AsRef<str>>(
        id: i64,
        name: impl Into<String>,
        faculty_name: impl Into<String>,
        active_sources: &[S],
    ) -> Self {
        let mut sources: Vec<SourceId> = Vec::with_capacity(active_sources.len());
        for raw in active_sources {
            let source = SourceId::new(raw);
            if source.as_str().is_empty() || sources.contains(&source) {
                continue;
            }
            sources.push(source);
        }
        Self {
            id,
            name: name.into(),
            faculty_name: faculty_name.into(),
            active_sources: sources,
        }
    }

    pub fn from_record(record: &BuildingRecord) -> Self {
        Self::new(
            record.id,
            record.name.clone(),
            record.faculty_name.clone().unwrap_or_default(),
            &record.active_sources,
        )
    }

    /// Faculty grouping key, `"Other"` when the faculty name is blank
    pub fn faculty_key(&self) -> &str {
        let name = self.faculty_name.trim();
        if name.is_empty() {
            OTHER_FACULTY
        } else {
            name
        }
    }

    pub fn has_source(&self, source: &SourceId) -> bool {
        self.active_sources.contains(source)
    }
}

/// Buildings of one faculty plus the union of their active sources
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FacultyGroup {
    pub name: String,
    pub buildings: Vec<Building>,
    pub sources: BTreeSet<SourceId>,
}

impl FacultyGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Faculty groups keyed by name, in order of first appearance
pub type FacultyGroups = IndexMap<String, FacultyGroup>;

// =============================================================================
// Energy flow snapshot
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyFlowSnapshot {
    pub building_id: i64,
    pub building_name: String,
    pub total_load: f64,
    /// Rated building capacity in kW, when the backend reports one
    #[serde(default)]
    pub max_capacity: Option<f64>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub floors: Vec<Floor>,
}

impl EnergyFlowSnapshot {
    /// Building load level; `None` without a rated capacity
    pub fn load_level(&self) -> Option<LoadLevel> {
        LoadLevel::against_capacity(self.total_load, self.max_capacity)
    }

    pub fn room_count(&self) -> usize {
        self.floors.iter().map(|f| f.rooms.len()).sum()
    }

    pub fn floor(&self, index: usize) -> Option<&Floor> {
        self.floors.get(index)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub floor_id: i64,
    pub floor_number: i32,
    pub total_load: f64,
    /// Rated floor capacity in kW
    #[serde(default)]
    pub max_capacity: Option<f64>,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

impl Floor {
    pub fn load_level(&self) -> Option<LoadLevel> {
        LoadLevel::against_capacity(self.total_load, self.max_capacity)
    }

    pub fn occupied_rooms(&self) -> usize {
        self.rooms.iter().filter(|r| r.occupancy).count()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: i64,
    pub room_name: String,
    pub room_type: String,
    /// Seats, not power
    pub capacity: u32,
    pub total_load: f64,
    pub occupancy: bool,
    pub energy_source: SourceId,
    #[serde(default)]
    pub optimized: bool,
    /// Tariff of the supplying source per kWh
    #[serde(default)]
    pub energy_source_cost: Option<f64>,
}

impl Room {
    /// Running cost per hour at the current load
    pub fn hourly_cost(&self) -> Option<f64> {
        self.energy_source_cost.map(|cost| self.total_load * cost)
    }
}

/// Accepts RFC 3339 or a naive ISO timestamp, which is taken as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

// =============================================================================
// Derived summaries
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingLoad {
    pub id: i64,
    pub name: String,
    pub load: f64,
}

/// Total load across all buildings of one faculty
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacultyAggregate {
    pub name: String,
    pub total_load: f64,
    pub buildings: Vec<BuildingLoad>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampusSummary {
    pub faculty_count: usize,
    pub building_count: usize,
    pub source_count: usize,
    /// Buildings reporting no active source at all
    pub unpowered_buildings: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadLevel {
    Low,
    Medium,
    High,
}

impl LoadLevel {
    /// Classify load against capacity: under 30% low, under 70% medium
    pub fn classify(load: f64, capacity: f64) -> Self {
        let percent = if capacity > 0.0 {
            load / capacity * 100.0
        } else {
            0.0
        };
        if percent < 30.0 {
            LoadLevel::Low
        } else if percent < 70.0 {
            LoadLevel::Medium
        } else {
            LoadLevel::High
        }
    }

    /// Classify only when a positive kW capacity is known
    pub fn against_capacity(load: f64, capacity: Option<f64>) -> Option<Self> {
        capacity
            .filter(|c| c.is_finite() && *c > 0.0)
            .map(|c| Self::classify(load, c))
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadLevel::Low => "LOW",
            LoadLevel::Medium => "MED",
            LoadLevel::High => "HIGH",
        }
    }
}
