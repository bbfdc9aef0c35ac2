// Diagram module - live energy-flow radial diagram
//
// Layout engine, viewport tracking, event fan-out and the view host tying
// them to the selection state and live refresh.

mod event_stream;
mod layout;
mod view;
mod viewport;

pub use event_stream::{DiagramEvent, DiagramEventType, EventBroadcaster};
pub use layout::{
    building_node_id, compute_layout, faculty_node_id, source_node_id, Layout, LayoutLink,
    LayoutNode, LinkKind, NodeDetail, NodeKind, Viewport,
};
pub use view::EnergyFlowDiagram;
pub use viewport::ViewportObserver;

use crate::data_source::HttpSourceConfig;
use crate::palette::SourcePalette;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::Duration;

/// Geometry constants for the radial layout
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Width reserved for an open detail panel
    pub sidebar_width: f64,
    pub faculty_ring_ratio: f64,
    /// Radius of each faculty's building orbit, relative to the short side
    pub building_ring_ratio: f64,
    pub source_pitch: f64,
    pub faculty_start_angle: f64,
    /// Total arc the buildings of one faculty fan across (radians)
    pub building_arc: f64,
    pub link_offset_step: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sidebar_width: 450.0,
            faculty_ring_ratio: 0.30,
            building_ring_ratio: 0.19,
            source_pitch: 120.0,
            faculty_start_angle: -PI / 4.0,
            building_arc: PI / 1.4,
            link_offset_step: 4.0,
        }
    }
}

/// Diagram configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagramConfig {
    pub poll_interval_ms: u64,
    pub backend: HttpSourceConfig,
    pub layout: LayoutConfig,
    pub palette: SourcePalette,
    /// Select the first building once the catalog is loaded
    pub auto_select_first: bool,
    pub event_capacity: usize,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            backend: HttpSourceConfig::default(),
            layout: LayoutConfig::default(),
            palette: SourcePalette::default(),
            auto_select_first: false,
            event_capacity: 256,
        }
    }
}

impl DiagramConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = std::env::var("CAMPUS_FLOW_BACKEND_URL")
            .ok()
            .filter(|s| !s.is_empty())
        {
            config.backend.base_url = url;
        }
        config.backend.timeout_ms = std::env::var("CAMPUS_FLOW_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.backend.timeout_ms);
        config.poll_interval_ms = std::env::var("CAMPUS_FLOW_POLL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(config.poll_interval_ms);
        config.auto_select_first = std::env::var("CAMPUS_FLOW_AUTO_SELECT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.auto_select_first);
        config
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
