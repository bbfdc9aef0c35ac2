// Campus Data Source
//
// Read-only query surface the diagram consumes: buildings, the energy source
// catalog and per-building energy-flow snapshots.
use crate::model::{BuildingRecord, EnergyFlowSnapshot, EnergySourceRecord};
use crate::{CampusFlowError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[async_trait]
pub trait CampusDataSource: Send + Sync {
    async fn get_buildings(&self) -> Result<Vec<BuildingRecord>>;

    /// Catalog order defines the left-to-right source row
    async fn get_energy_sources(&self) -> Result<Vec<EnergySourceRecord>>;

    async fn get_building_energy_flow(&self, building_id: i64) -> Result<EnergyFlowSnapshot>;
}

/// Configuration for the HTTP data source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    /// API root, e.g. `http://localhost:5000/api`
    pub base_url: String,
    /// Timeout for API requests in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_ms: 10_000,
            user_agent: "campus-flow/0.1".to_string(),
        }
    }
}

/// Response envelope used by every backend endpoint
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    fn into_data(self, path: &str) -> Result<T> {
        if self.status != "success" {
            return Err(CampusFlowError::Backend(
                self.message
                    .unwrap_or_else(|| format!("{} returned status '{}'", path, self.status)),
            ));
        }
        self.data
            .ok_or_else(|| CampusFlowError::Backend(format!("{} returned no data", path)))
    }
}

pub struct HttpDataSource {
    config: HttpSourceConfig,
    http_client: reqwest::Client,
}

impl HttpDataSource {
    pub fn new() -> Self {
        Self::with_config(HttpSourceConfig::default())
    }

    pub fn with_config(config: HttpSourceConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Join the API root and an endpoint path with exactly one slash
    fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint_url(path);
        debug!(target: "data_source", url = %url, "Fetching");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            warn!(target: "data_source", error = %e, path = %path, "Request failed");
            CampusFlowError::Network(format!("{}: {}", path, e))
        })?;

        check_status(response.status(), path)?;

        let body = response.text().await.map_err(|e| {
            warn!(target: "data_source", error = %e, path = %path, "Failed to read response body");
            CampusFlowError::Network(format!("{}: {}", path, e))
        })?;

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)?;
        envelope.into_data(path)
    }
}

fn check_status(status: reqwest::StatusCode, path: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    warn!(target: "data_source", status = %status, path = %path, "Backend returned error");
    Err(CampusFlowError::Backend(format!(
        "{} returned status: {}",
        path, status
    )))
}

impl Default for HttpDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CampusDataSource for HttpDataSource {
    async fn get_buildings(&self) -> Result<Vec<BuildingRecord>> {
        self.fetch("/campus/buildings").await
    }

    async fn get_energy_sources(&self) -> Result<Vec<EnergySourceRecord>> {
        self.fetch("/energy/sources").await
    }

    async fn get_building_energy_flow(&self, building_id: i64) -> Result<EnergyFlowSnapshot> {
        self.fetch(&format!("/energy-flow/building/{}", building_id))
            .await
    }
}

// =============================================================================
// In-memory source
// =============================================================================

#[derive(Default)]
struct StaticState {
    sources: Vec<EnergySourceRecord>,
    buildings: Vec<BuildingRecord>,
    snapshots: HashMap<i64, EnergyFlowSnapshot>,
    failing: HashSet<i64>,
    latency: HashMap<i64, Duration>,
    catalog_down: bool,
}

/// In-memory data source for demos and tests
#[derive(Default)]
pub struct StaticDataSource {
    state: RwLock<StaticState>,
    flow_requests: AtomicUsize,
}

impl StaticDataSource {
    pub fn new(sources: Vec<EnergySourceRecord>, buildings: Vec<BuildingRecord>) -> Self {
        Self {
            state: RwLock::new(StaticState {
                sources,
                buildings,
                ..Default::default()
            }),
            flow_requests: AtomicUsize::new(0),
        }
    }

    pub async fn set_buildings(&self, buildings: Vec<BuildingRecord>) {
        self.state.write().await.buildings = buildings;
    }

    pub async fn set_snapshot(&self, snapshot: EnergyFlowSnapshot) {
        self.state
            .write()
            .await
            .snapshots
            .insert(snapshot.building_id, snapshot);
    }

    /// Make energy-flow fetches for `building_id` fail until cleared
    pub async fn set_failing(&self, building_id: i64, failing: bool) {
        let mut state = self.state.write().await;
        if failing {
            state.failing.insert(building_id);
        } else {
            state.failing.remove(&building_id);
        }
    }

    /// Delay energy-flow responses for `building_id`
    pub async fn set_latency(&self, building_id: i64, latency: Duration) {
        self.state.write().await.latency.insert(building_id, latency);
    }

    /// Make the building and source catalog queries fail
    pub async fn set_catalog_down(&self, down: bool) {
        self.state.write().await.catalog_down = down;
    }

    pub fn flow_requests(&self) -> usize {
        self.flow_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CampusDataSource for StaticDataSource {
    async fn get_buildings(&self) -> Result<Vec<BuildingRecord>> {
        let state = self.state.read().await;
        if state.catalog_down {
            return Err(CampusFlowError::Network("buildings unavailable".into()));
        }
        Ok(state.buildings.clone())
    }

    async fn get_energy_sources(&self) -> Result<Vec<EnergySourceRecord>> {
        let state = self.state.read().await;
        if state.catalog_down {
            return Err(CampusFlowError::Network("energy sources unavailable".into()));
        }
        Ok(state.sources.clone())
    }

    async fn get_building_energy_flow(&self, building_id: i64) -> Result<EnergyFlowSnapshot> {
        self.flow_requests.fetch_add(1, Ordering::SeqCst);
        let latency = self.state.read().await.latency.get(&building_id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.state.read().await;
        if state.failing.contains(&building_id) {
            return Err(CampusFlowError::Network(format!(
                "energy flow for building {} unavailable",
                building_id
            )));
        }
        state
            .snapshots
            .get(&building_id)
            .cloned()
            .ok_or_else(|| CampusFlowError::Backend(format!("Building {} not found", building_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_error_status_carries_message() {
        let envelope: ApiEnvelope<Vec<BuildingRecord>> = serde_json::from_str(
            r#"{"status": "error", "message": "database offline"}"#,
        )
        .unwrap();
        match envelope.into_data("/campus/buildings") {
            Err(CampusFlowError::Backend(msg)) => assert_eq!(msg, "database offline"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn endpoint_url_joins_with_single_slash() {
        let source = HttpDataSource::with_config(HttpSourceConfig {
            base_url: "http://campus.local/api/".to_string(),
            ..Default::default()
        });
        assert_eq!(
            source.endpoint_url("/energy-flow/building/7"),
            "http://campus.local/api/energy-flow/building/7"
        );

        let source = HttpDataSource::new();
        assert_eq!(
            source.endpoint_url("/campus/buildings"),
            "http://localhost:5000/api/campus/buildings"
        );
        assert_eq!(
            source.endpoint_url("energy/sources"),
            "http://localhost:5000/api/energy/sources"
        );
    }

    #[test]
    fn non_success_status_maps_to_backend_error() {
        assert!(check_status(reqwest::StatusCode::OK, "/campus/buildings").is_ok());
        match check_status(reqwest::StatusCode::NOT_FOUND, "/energy-flow/building/9") {
            Err(CampusFlowError::Backend(msg)) => {
                assert!(msg.starts_with("/energy-flow/building/9"));
                assert!(msg.contains("404"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            check_status(reqwest::StatusCode::BAD_GATEWAY, "/energy/sources"),
            Err(CampusFlowError::Backend(_))
        ));
    }

    #[test]
    fn envelope_success_yields_data() {
        let envelope: ApiEnvelope<Vec<BuildingRecord>> = serde_json::from_str(
            r#"{"status": "success", "data": [
                {"id": 1, "name": "Main", "faculty_id": 2, "faculty_name": "Eng", "active_sources": ["Grid"]}
            ]}"#,
        )
        .unwrap();
        let buildings = envelope.into_data("/campus/buildings").unwrap();
        assert_eq!(buildings.len(), 1);
        assert_eq!(buildings[0].faculty_name.as_deref(), Some("Eng"));
    }
}
