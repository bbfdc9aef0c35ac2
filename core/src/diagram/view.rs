// Energy-flow diagram view
//
// Host-side owner of the catalog, the faculty grouping, the viewport, the
// selection state and the refresh timer.

use crate::aggregator::{campus_summary, group_by_faculty};
use crate::data_source::CampusDataSource;
use crate::diagram::event_stream::{DiagramEvent, EventBroadcaster};
use crate::diagram::layout::{compute_layout, Layout, Viewport};
use crate::diagram::viewport::ViewportObserver;
use crate::diagram::DiagramConfig;
use crate::model::{source_catalog, Building, CampusSummary, EnergySource, FacultyGroups};
use crate::refresh::{DetailState, LiveRefreshController};
use crate::selection::{Selection, ViewState};
use crate::{CampusFlowError, Result};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, error, info, warn};

pub struct EnergyFlowDiagram {
    config: DiagramConfig,
    source: Arc<dyn CampusDataSource>,
    sources: Vec<EnergySource>,
    buildings: Arc<RwLock<Vec<Building>>>,
    groups: FacultyGroups,
    view: ViewState,
    viewport: Option<ViewportObserver>,
    refresh: LiveRefreshController,
    broadcaster: EventBroadcaster,
}

impl EnergyFlowDiagram {
    /// Load the source catalog and building list.
    ///
    /// Either query failing is terminal: no partial diagram is built.
    pub async fn bootstrap(
        source: Arc<dyn CampusDataSource>,
        config: DiagramConfig,
    ) -> Result<Self> {
        let (source_records, building_records) =
            tokio::try_join!(source.get_energy_sources(), source.get_buildings()).map_err(|e| {
                error!(target: "diagram", error = %e, "Failed to load campus catalog");
                CampusFlowError::Bootstrap(e.to_string())
            })?;

        let sources = source_catalog(&source_records, &config.palette);
        for source in sources.iter().filter(|s| !config.palette.is_known(&s.id)) {
            debug!(target: "diagram", source = %source.id, "No palette color; using fallback");
        }
        let buildings: Vec<Building> = building_records.iter().map(Building::from_record).collect();
        let groups = group_by_faculty(&buildings);
        let first_building = buildings.first().map(|b| b.id);

        info!(
            target: "diagram",
            sources = sources.len(),
            faculties = groups.len(),
            buildings = buildings.len(),
            "Campus catalog loaded"
        );

        // broadcast::channel rejects a zero capacity
        let broadcaster = EventBroadcaster::new(config.event_capacity.max(1));
        let buildings = Arc::new(RwLock::new(buildings));
        let refresh = LiveRefreshController::new(
            Arc::clone(&source),
            Arc::clone(&buildings),
            config.poll_interval(),
            broadcaster.clone(),
        );

        let mut diagram = Self {
            config,
            source,
            sources,
            buildings,
            groups,
            view: ViewState::new(),
            viewport: Some(ViewportObserver::new()),
            refresh,
            broadcaster,
        };

        if diagram.config.auto_select_first {
            if let Some(id) = first_building {
                diagram.select_building(id).await;
            }
        }

        Ok(diagram)
    }

    // =========================================================================
    // Viewport
    // =========================================================================

    /// Report a new canvas size. Ignored after teardown.
    pub fn resize(&self, width: f64, height: f64) -> bool {
        self.viewport
            .as_ref()
            .is_some_and(|observer| observer.resize(width, height))
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
            .as_ref()
            .map(ViewportObserver::current)
            .unwrap_or_default()
    }

    pub fn watch_viewport(&self) -> Option<watch::Receiver<Viewport>> {
        self.viewport.as_ref().map(ViewportObserver::subscribe)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select a building and start polling its snapshot. Unknown ids are
    /// rejected.
    pub async fn select_building(&mut self, id: i64) -> bool {
        if !self.buildings.read().await.iter().any(|b| b.id == id) {
            warn!(target: "diagram", building_id = id, "Ignoring selection of unknown building");
            return false;
        }
        if !self.view.select_building(id) {
            return false;
        }
        self.refresh.track(self.view.selection()).await;
        true
    }

    /// Select a faculty and start polling its aggregate
    pub async fn select_faculty(&mut self, name: &str) -> bool {
        if !self.view.select_faculty(name) {
            return false;
        }
        self.refresh.track(self.view.selection()).await;
        true
    }

    pub async fn close(&mut self) -> bool {
        if !self.view.close() {
            return false;
        }
        self.refresh.track(self.view.selection()).await;
        true
    }

    /// Switch the floor tab of the building panel
    pub async fn select_floor_tab(&mut self, index: usize) -> usize {
        let floors = self
            .refresh
            .detail()
            .await
            .snapshot
            .map(|s| s.floors.len())
            .unwrap_or(0);
        self.view.select_floor_tab(index, floors)
    }

    pub fn selection(&self) -> &Selection {
        self.view.selection()
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Compute the layout for the current viewport and selection
    pub fn render(&self) -> Layout {
        compute_layout(
            self.viewport(),
            self.view.is_panel_open(),
            &self.sources,
            &self.groups,
            self.view.selected_building(),
            &self.config.layout,
            &self.config.palette,
        )
    }

    /// Re-fetch the building list and regroup. On failure the previous list
    /// stays in place. A selected building that no longer exists is closed.
    pub async fn reload_buildings(&mut self) -> Result<()> {
        let records = self.source.get_buildings().await.map_err(|e| {
            warn!(target: "diagram", error = %e, "Building reload failed; keeping previous list");
            e
        })?;
        let buildings: Vec<Building> = records.iter().map(Building::from_record).collect();
        let orphaned = self
            .view
            .selected_building()
            .filter(|id| !buildings.iter().any(|b| b.id == *id));
        self.groups = group_by_faculty(&buildings);
        *self.buildings.write().await = buildings;

        if let Some(id) = orphaned {
            info!(target: "diagram", building_id = id, "Selected building removed; closing panel");
            self.close().await;
        }
        Ok(())
    }

    pub async fn detail(&self) -> DetailState {
        self.refresh.detail().await
    }

    pub fn sources(&self) -> &[EnergySource] {
        &self.sources
    }

    pub fn groups(&self) -> &FacultyGroups {
        &self.groups
    }

    pub fn summary(&self) -> CampusSummary {
        campus_summary(&self.groups, self.sources.len())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DiagramEvent> {
        self.broadcaster.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.refresh.is_polling()
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Stop the refresh timer and release the viewport observer
    pub fn teardown(&mut self) {
        self.refresh.stop();
        if let Some(observer) = self.viewport.take() {
            info!(
                target: "diagram",
                listeners = observer.listener_count(),
                "Diagram torn down"
            );
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.viewport.is_none()
    }
}

impl Drop for EnergyFlowDiagram {
    fn drop(&mut self) {
        self.teardown();
    }
}
