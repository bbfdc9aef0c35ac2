use std::collections::HashMap;
use std::fs;
use std::path::Path;

use campus_flow_core::{ColorToken, DiagramConfig};

/// What to select once the catalog is loaded
#[derive(Clone, Debug, PartialEq)]
pub enum InitialSelection {
    None,
    Building(i64),
    Faculty(String),
}

/// Configuration for the flow console
#[derive(Clone, Debug)]
pub struct FlowConsoleConfig {
    pub diagram: DiagramConfig,
    /// Simulated canvas size
    pub width: f64,
    pub height: f64,
    pub select: InitialSelection,
    /// How often the console prints the layout and detail panel
    pub render_every_ms: u64,
}

impl Default for FlowConsoleConfig {
    fn default() -> Self {
        // DiagramConfig::from_env already honors the CAMPUS_FLOW_* variables
        let select = match (
            std::env::var("FLOW_CONSOLE_BUILDING")
                .ok()
                .and_then(|v| v.parse::<i64>().ok()),
            std::env::var("FLOW_CONSOLE_FACULTY")
                .ok()
                .filter(|s| !s.is_empty()),
        ) {
            (Some(id), _) => InitialSelection::Building(id),
            (None, Some(name)) => InitialSelection::Faculty(name),
            (None, None) => InitialSelection::None,
        };

        Self {
            diagram: DiagramConfig::from_env(),
            width: 1600.0,
            height: 900.0,
            select,
            render_every_ms: std::env::var("FLOW_CONSOLE_RENDER_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5_000),
        }
    }
}

impl FlowConsoleConfig {
    /// Load configuration from a TOML file (path via FLOW_CONSOLE_CONFIG or ./flow_console.toml),
    /// overlaying values onto defaults and env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path =
            std::env::var("FLOW_CONSOLE_CONFIG").unwrap_or_else(|_| "flow_console.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "flow_console", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => Self::from_toml_str(&s, default.clone()).unwrap_or_else(|e| {
                tracing::warn!(target: "flow_console", error = %e, "Failed to parse TOML; using defaults");
                default
            }),
            Err(e) => {
                tracing::warn!(target: "flow_console", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    fn from_toml_str(raw: &str, base: Self) -> Result<Self, toml::de::Error> {
        toml::from_str::<FlowConsoleToml>(raw).map(|t| t.overlay(base))
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct FlowConsoleToml {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub render_every_ms: Option<u64>,
    pub select_building: Option<i64>,
    pub select_faculty: Option<String>,
    pub backend: Option<BackendToml>,
    pub refresh: Option<RefreshToml>,
    pub palette: Option<PaletteToml>,
}

impl FlowConsoleToml {
    fn overlay(self, mut base: FlowConsoleConfig) -> FlowConsoleConfig {
        if let Some(v) = self.width.filter(|w| *w > 0.0) {
            base.width = v;
        }
        if let Some(v) = self.height.filter(|h| *h > 0.0) {
            base.height = v;
        }
        if let Some(v) = self.render_every_ms {
            base.render_every_ms = v.max(100);
        }
        if let Some(id) = self.select_building {
            base.select = InitialSelection::Building(id);
        } else if let Some(name) = self.select_faculty.filter(|s| !s.is_empty()) {
            base.select = InitialSelection::Faculty(name);
        }
        if let Some(b) = self.backend {
            b.apply(&mut base.diagram);
        }
        if let Some(r) = self.refresh {
            r.apply(&mut base.diagram);
        }
        if let Some(p) = self.palette {
            p.apply(&mut base.diagram);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct BackendToml {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}
impl BackendToml {
    fn apply(self, d: &mut DiagramConfig) {
        if let Some(v) = self.base_url.filter(|s| !s.is_empty()) {
            d.backend.base_url = v;
        }
        if let Some(v) = self.timeout_ms {
            d.backend.timeout_ms = v;
        }
        if let Some(v) = self.user_agent {
            d.backend.user_agent = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct RefreshToml {
    pub poll_interval_ms: Option<u64>,
    pub auto_select_first: Option<bool>,
    pub event_capacity: Option<usize>,
}
impl RefreshToml {
    fn apply(self, d: &mut DiagramConfig) {
        if let Some(v) = self.poll_interval_ms.filter(|ms| *ms > 0) {
            d.poll_interval_ms = v;
        }
        if let Some(v) = self.auto_select_first {
            d.auto_select_first = v;
        }
        if let Some(v) = self.event_capacity.filter(|c| *c > 0) {
            d.event_capacity = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct PaletteToml {
    pub fallback: Option<String>,
    pub colors: Option<HashMap<String, String>>,
}
impl PaletteToml {
    fn apply(self, d: &mut DiagramConfig) {
        if let Some(v) = self.fallback {
            d.palette.set_fallback(ColorToken::new(v));
        }
        for (source, color) in self.colors.unwrap_or_default() {
            d.palette.insert(source, ColorToken::new(color));
        }
    }
}
