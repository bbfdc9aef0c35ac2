// Campus Flow Core Library
// Energy-flow radial diagram: aggregation, layout and live refresh

pub mod aggregator;
pub mod data_source;
pub mod diagram;
pub mod model;
pub mod palette;
pub mod refresh;
pub mod selection;
pub mod telemetry;

// Export core types
pub use aggregator::{aggregate_faculty, campus_summary, group_by_faculty};
pub use data_source::{CampusDataSource, HttpDataSource, StaticDataSource};
pub use diagram::{compute_layout, DiagramConfig, EnergyFlowDiagram, Layout, LayoutConfig, Viewport};
pub use model::{
    source_catalog, Building, CampusSummary, EnergyFlowSnapshot, EnergySource, FacultyAggregate,
    FacultyGroup, FacultyGroups, SourceId,
};
pub use palette::{ColorToken, SourcePalette};
pub use refresh::{DetailState, LiveRefreshController};
pub use selection::{Selection, SelectionKey, ViewState};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CampusFlowError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Faculty aggregate failed: {0}")]
    Aggregate(String),

    #[error("Poll failed: {0}")]
    Poll(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CampusFlowError>;
