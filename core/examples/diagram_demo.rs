// Diagram demonstration example
//
// Runs the energy-flow diagram against an in-memory campus, switches between
// a building and a faculty selection and prints the resulting layout.

use campus_flow_core::{
    diagram::{LinkKind, NodeKind},
    model::{BuildingRecord, EnergySourceRecord, Floor, Room},
    telemetry::{init_tracing, MetricsCollector},
    CampusDataSource, DiagramConfig, EnergyFlowDiagram, EnergyFlowSnapshot, StaticDataSource,
};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::info;

fn source(name: &str, cost: f64) -> EnergySourceRecord {
    EnergySourceRecord {
        name: name.to_string(),
        cost_per_kwh: Some(cost),
        is_available: Some(true),
        priority: None,
    }
}

fn building(id: i64, name: &str, faculty: &str, sources: &[&str]) -> BuildingRecord {
    BuildingRecord {
        id,
        name: name.to_string(),
        faculty_id: None,
        faculty_name: Some(faculty.to_string()),
        active_sources: sources.iter().map(|s| s.to_string()).collect(),
    }
}

fn snapshot(building_id: i64, name: &str, loads: &[f64]) -> EnergyFlowSnapshot {
    let floors: Vec<Floor> = loads
        .iter()
        .enumerate()
        .map(|(i, &load)| Floor {
            floor_id: building_id * 10 + i as i64,
            floor_number: i as i32,
            total_load: load,
            max_capacity: Some(40.0),
            rooms: vec![Room {
                room_id: building_id * 100 + i as i64,
                room_name: format!("{}{:02}", i, 1),
                room_type: "lecture".to_string(),
                capacity: 80,
                total_load: load,
                occupancy: load > 5.0,
                energy_source: "grid".into(),
                optimized: false,
                energy_source_cost: Some(8.0),
            }],
        })
        .collect();
    EnergyFlowSnapshot {
        building_id,
        building_name: name.to_string(),
        total_load: loads.iter().sum(),
        max_capacity: Some(40.0 * loads.len() as f64),
        timestamp: chrono::Utc::now(),
        floors,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing("info,campus_flow_core=debug");

    let campus = Arc::new(StaticDataSource::new(
        vec![source("grid", 8.0), source("solar", 4.0), source("diesel", 16.0)],
        vec![
            building(1, "Engineering Hall", "Engineering", &["grid", "solar"]),
            building(2, "Workshop", "Engineering", &["grid", "diesel"]),
            building(3, "Library", "Humanities", &["solar"]),
            building(4, "Student Center", "Services", &["grid", "solar", "diesel"]),
        ],
    ));
    campus.set_snapshot(snapshot(1, "Engineering Hall", &[12.0, 8.5])).await;
    campus.set_snapshot(snapshot(2, "Workshop", &[22.0])).await;
    campus.set_snapshot(snapshot(3, "Library", &[4.0, 3.5, 2.0])).await;
    campus.set_snapshot(snapshot(4, "Student Center", &[15.0, 6.0])).await;

    let config = DiagramConfig {
        poll_interval_ms: 1_000,
        ..DiagramConfig::default()
    };
    let shared: Arc<dyn CampusDataSource> = campus.clone();
    let mut diagram = EnergyFlowDiagram::bootstrap(shared, config).await?;

    let metrics = MetricsCollector::new();
    let recorder = metrics.spawn_recorder(diagram.subscribe());

    diagram.resize(1600.0, 900.0);
    let summary = diagram.summary();
    info!(
        "Campus: {} faculties, {} buildings, {} sources",
        summary.faculty_count, summary.building_count, summary.source_count
    );

    // Building selection
    diagram.select_building(1).await;
    sleep(Duration::from_millis(2_500)).await;

    let layout = diagram.render();
    for node in layout.nodes_of(NodeKind::Faculty) {
        info!("{:<28} ({:>7.1}, {:>7.1})", node.id, node.x, node.y);
    }
    for link in layout.links_of(LinkKind::Secondary).filter(|l| l.active) {
        info!("active {} -> {}", link.id, link.color);
    }

    if let Some(snapshot) = diagram.detail().await.snapshot {
        info!(
            "{}: {:.1} kW over {} floors",
            snapshot.building_name,
            snapshot.total_load,
            snapshot.floors.len()
        );
    }

    // Faculty selection replaces the building selection
    diagram.select_faculty("Engineering").await;
    sleep(Duration::from_millis(1_500)).await;
    if let Some(aggregate) = diagram.detail().await.aggregate {
        info!(
            "{}: {:.1} kW across {} buildings",
            aggregate.name,
            aggregate.total_load,
            aggregate.buildings.len()
        );
    }

    // A failing building fails the whole faculty; the last aggregate stays
    campus.set_failing(2, true).await;
    sleep(Duration::from_millis(1_100)).await;
    let detail = diagram.detail().await;
    info!(
        "After failure: aggregate kept = {}, error = {:?}",
        detail.aggregate.is_some(),
        detail.last_error
    );

    diagram.teardown();
    metrics.print_metrics().await;
    recorder.abort();

    Ok(())
}
