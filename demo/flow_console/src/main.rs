mod config;
use campus_flow_core::diagram::{LinkKind, NodeKind};
use campus_flow_core::model::LoadLevel;
use campus_flow_core::telemetry::MetricsCollector;
use campus_flow_core::{CampusDataSource, EnergyFlowDiagram, HttpDataSource};
use config::{FlowConsoleConfig, InitialSelection};
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,campus_flow_core=info,flow_console=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = FlowConsoleConfig::load();
    info!(
        target: "flow_console",
        backend = %cfg.diagram.backend.base_url,
        poll_ms = cfg.diagram.poll_interval_ms,
        "Starting flow console"
    );

    let source: Arc<dyn CampusDataSource> =
        Arc::new(HttpDataSource::with_config(cfg.diagram.backend.clone()));
    let mut diagram = match EnergyFlowDiagram::bootstrap(source, cfg.diagram.clone()).await {
        Ok(diagram) => diagram,
        Err(e) => {
            error!(target: "flow_console", error = %e, "Could not load campus data");
            return Err(e.into());
        }
    };

    let metrics = MetricsCollector::new();
    let recorder = metrics.spawn_recorder(diagram.subscribe());

    diagram.resize(cfg.width, cfg.height);

    let summary = diagram.summary();
    info!(
        target: "flow_console",
        faculties = summary.faculty_count,
        buildings = summary.building_count,
        sources = summary.source_count,
        unpowered = summary.unpowered_buildings,
        "Campus loaded"
    );

    match &cfg.select {
        InitialSelection::Building(id) => {
            if !diagram.select_building(*id).await {
                warn!(target: "flow_console", building_id = id, "Initial building not selected");
            }
        }
        InitialSelection::Faculty(name) => {
            diagram.select_faculty(name).await;
        }
        InitialSelection::None => {}
    }

    let mut ticker = interval(Duration::from_millis(cfg.render_every_ms.max(100)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!(target: "flow_console", "Shutting down");
                break;
            }
            _ = ticker.tick() => {
                print_frame(&diagram).await;
            }
        }
    }

    diagram.teardown();
    metrics.print_metrics().await;
    recorder.abort();
    Ok(())
}

async fn print_frame(diagram: &EnergyFlowDiagram) {
    let layout = diagram.render();
    let active = layout.links.iter().filter(|l| l.active).count();
    info!(
        target: "flow_console",
        nodes = layout.nodes.len(),
        primary = layout.links_of(LinkKind::Primary).count(),
        secondary = layout.links_of(LinkKind::Secondary).count(),
        active,
        "Layout"
    );
    for node in layout.nodes_of(NodeKind::Faculty) {
        info!(target: "flow_console", "  {:<32} ({:>7.1}, {:>7.1})", node.id, node.x, node.y);
    }

    let detail = diagram.detail().await;
    if detail.is_loading() {
        info!(target: "flow_console", "Loading...");
    }
    if let Some(err) = &detail.last_error {
        warn!(target: "flow_console", error = %err, "Last refresh failed");
    }
    if let Some(snapshot) = &detail.snapshot {
        let tab = diagram.view_state().active_floor_tab();
        info!(
            target: "flow_console",
            "{} | {:.2} kW {} | {} rooms | updated {}",
            snapshot.building_name,
            snapshot.total_load,
            level_label(snapshot.load_level()),
            snapshot.room_count(),
            snapshot.timestamp.format("%H:%M:%S")
        );
        if let Some(floor) = snapshot.floor(tab) {
            info!(
                target: "flow_console",
                " Floor {} | {:.2} kW {}",
                floor.floor_number,
                floor.total_load,
                level_label(floor.load_level())
            );
            for room in &floor.rooms {
                info!(
                    target: "flow_console",
                    "  {:<12} {:>6.2} kW {:>3} seats {} {}",
                    room.room_name,
                    room.total_load,
                    room.capacity,
                    room.energy_source,
                    room.hourly_cost()
                        .map(|c| format!("{:.2}/h", c))
                        .unwrap_or_default()
                );
            }
        }
    }
    if let Some(aggregate) = &detail.aggregate {
        info!(
            target: "flow_console",
            "{} | {:.2} kW across {} buildings",
            aggregate.name,
            aggregate.total_load,
            aggregate.buildings.len()
        );
        for b in &aggregate.buildings {
            info!(target: "flow_console", "  {:<24} {:>8.2} kW", b.name, b.load);
        }
    }
}

/// Load level needs a rated kW capacity; seat counts do not qualify
fn level_label(level: Option<LoadLevel>) -> &'static str {
    level.map(|l| l.label()).unwrap_or("-")
}
