//! Shared fixtures for campus flow tests

#![allow(dead_code)]

use campus_flow_core::model::{BuildingRecord, EnergySourceRecord, Floor, Room};
use campus_flow_core::{Building, EnergyFlowSnapshot, EnergySource, SourcePalette};
use chrono::Utc;

pub fn source_record(name: &str, cost: f64) -> EnergySourceRecord {
    EnergySourceRecord {
        name: name.to_string(),
        cost_per_kwh: Some(cost),
        is_available: Some(true),
        priority: None,
    }
}

pub fn catalog_records() -> Vec<EnergySourceRecord> {
    vec![
        source_record("grid", 8.0),
        source_record("solar", 4.0),
        source_record("diesel", 16.0),
    ]
}

pub fn catalog(names: &[&str]) -> Vec<EnergySource> {
    let palette = SourcePalette::default();
    names
        .iter()
        .map(|n| EnergySource::from_record(&source_record(n, 1.0), &palette))
        .collect()
}

pub fn building_record(id: i64, name: &str, faculty: Option<&str>, sources: &[&str]) -> BuildingRecord {
    BuildingRecord {
        id,
        name: name.to_string(),
        faculty_id: None,
        faculty_name: faculty.map(str::to_string),
        active_sources: sources.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn building(id: i64, faculty: &str, sources: &[&str]) -> Building {
    Building::new(id, format!("Building {}", id), faculty, sources)
}

/// Snapshot with two floors splitting `total_load` evenly
pub fn snapshot(building_id: i64, total_load: f64) -> EnergyFlowSnapshot {
    let half = total_load / 2.0;
    let floor = |floor_id: i64, number: i32| Floor {
        floor_id,
        floor_number: number,
        total_load: half,
        max_capacity: Some(100.0),
        rooms: vec![Room {
            room_id: floor_id * 10,
            room_name: format!("Room {}", floor_id * 10),
            room_type: "classroom".to_string(),
            capacity: 30,
            total_load: half,
            occupancy: number == 0,
            energy_source: "grid".into(),
            optimized: false,
            energy_source_cost: Some(8.0),
        }],
    };
    EnergyFlowSnapshot {
        building_id,
        building_name: format!("Building {}", building_id),
        total_load,
        max_capacity: Some(200.0),
        timestamp: Utc::now(),
        floors: vec![floor(building_id * 100, 0), floor(building_id * 100 + 1, 1)],
    }
}

pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x2 - x1).hypot(y2 - y1)
}
