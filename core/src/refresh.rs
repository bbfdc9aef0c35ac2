// Live refresh controller
//
// Polls the energy-flow data of the selected entity on a fixed interval.
// Every request is tagged with the selection generation, the selection key
// and a sequence number; a response is applied only if its tag is still the
// newest for the current selection. In-flight requests are never cancelled,
// their results are just dropped once stale.

use crate::aggregator::aggregate_faculty;
use crate::data_source::CampusDataSource;
use crate::diagram::{DiagramEvent, DiagramEventType, EventBroadcaster};
use crate::model::{Building, EnergyFlowSnapshot, FacultyAggregate};
use crate::selection::{Selection, SelectionKey};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

type Shared<T> = Arc<RwLock<T>>;

/// Detail data shown for the current selection
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailState {
    pub key: Option<SelectionKey>,
    pub snapshot: Option<EnergyFlowSnapshot>,
    pub aggregate: Option<FacultyAggregate>,
    /// Error from the most recent failed poll; cleared by the next success
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    applied_seq: u64,
}

impl DetailState {
    fn for_key(key: Option<SelectionKey>) -> Self {
        Self {
            key,
            ..Default::default()
        }
    }

    /// Something is selected but no data has arrived yet
    pub fn is_loading(&self) -> bool {
        self.key.is_some() && self.snapshot.is_none() && self.aggregate.is_none()
    }
}

#[derive(Clone, Debug)]
struct RequestTag {
    generation: u64,
    seq: u64,
    key: SelectionKey,
}

enum Update {
    Snapshot(EnergyFlowSnapshot),
    Aggregate(FacultyAggregate),
    EmptyFaculty,
}

#[derive(Clone)]
struct PollContext {
    source: Arc<dyn CampusDataSource>,
    buildings: Shared<Vec<Building>>,
    state: Shared<DetailState>,
    generation: Arc<AtomicU64>,
    sequence: Arc<AtomicU64>,
    broadcaster: EventBroadcaster,
}

impl PollContext {
    fn tag(&self, generation: u64, key: &SelectionKey) -> RequestTag {
        RequestTag {
            generation,
            seq: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            key: key.clone(),
        }
    }

    async fn poll(&self, tag: RequestTag) {
        let result: Result<Update> = match &tag.key {
            SelectionKey::Building(id) => self
                .source
                .get_building_energy_flow(*id)
                .await
                .map(Update::Snapshot),
            SelectionKey::Faculty(name) => {
                let buildings = self.buildings.read().await.clone();
                aggregate_faculty(name, &buildings, self.source.as_ref())
                    .await
                    .map(|aggregate| match aggregate {
                        Some(aggregate) => Update::Aggregate(aggregate),
                        None => Update::EmptyFaculty,
                    })
            }
        };
        self.apply(tag, result).await;
    }

    async fn apply(&self, tag: RequestTag, result: Result<Update>) {
        let mut state = self.state.write().await;

        let current = tag.generation == self.generation.load(Ordering::SeqCst)
            && state.key.as_ref() == Some(&tag.key)
            && tag.seq > state.applied_seq;
        if !current {
            debug!(target: "refresh", key = %tag.key, seq = tag.seq, "Discarding stale response");
            self.broadcaster.broadcast(DiagramEvent::new(
                DiagramEventType::StaleResponseDiscarded,
                Some(tag.key),
                format!("request {} arrived after a newer one", tag.seq),
            ));
            return;
        }

        match result {
            Ok(update) => {
                state.applied_seq = tag.seq;
                state.last_error = None;
                state.updated_at = Some(Utc::now());
                let (event_type, message) = match update {
                    Update::Snapshot(snapshot) => {
                        let message = format!("{:.2} kW", snapshot.total_load);
                        state.snapshot = Some(snapshot);
                        (DiagramEventType::SnapshotUpdated, message)
                    }
                    Update::Aggregate(aggregate) => {
                        let message = format!(
                            "{:.2} kW across {} buildings",
                            aggregate.total_load,
                            aggregate.buildings.len()
                        );
                        state.aggregate = Some(aggregate);
                        (DiagramEventType::AggregateUpdated, message)
                    }
                    Update::EmptyFaculty => (
                        DiagramEventType::AggregateEmpty,
                        "faculty has no buildings".to_string(),
                    ),
                };
                debug!(target: "refresh", key = %tag.key, seq = tag.seq, "Applied update");
                self.broadcaster
                    .broadcast(DiagramEvent::new(event_type, Some(tag.key), message));
            }
            Err(e) => {
                // Prior snapshot or aggregate stays on screen
                warn!(target: "refresh", key = %tag.key, error = %e, "Poll failed; keeping previous data");
                state.last_error = Some(e.to_string());
                let event_type = match tag.key {
                    SelectionKey::Building(_) => DiagramEventType::PollFailed,
                    SelectionKey::Faculty(_) => DiagramEventType::AggregateFailed,
                };
                self.broadcaster
                    .broadcast(DiagramEvent::new(event_type, Some(tag.key), e.to_string()));
            }
        }
    }
}

/// Owns the polling timer for the current selection
pub struct LiveRefreshController {
    ctx: PollContext,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl LiveRefreshController {
    pub fn new(
        source: Arc<dyn CampusDataSource>,
        buildings: Shared<Vec<Building>>,
        interval: Duration,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            ctx: PollContext {
                source,
                buildings,
                state: Arc::new(RwLock::new(DetailState::default())),
                generation: Arc::new(AtomicU64::new(0)),
                sequence: Arc::new(AtomicU64::new(0)),
                broadcaster,
            },
            interval,
            task: None,
        }
    }

    /// Retarget polling at `selection`.
    ///
    /// Tears down the previous timer, clears detail data belonging to the old
    /// selection and, unless idle, fetches immediately and then on every tick.
    pub async fn track(&mut self, selection: &Selection) {
        let generation = self.invalidate();
        let key = selection.key();

        *self.ctx.state.write().await = DetailState::for_key(key.clone());

        self.ctx.broadcaster.broadcast(DiagramEvent::new(
            DiagramEventType::SelectionChanged,
            key.clone(),
            match &key {
                Some(key) => key.to_string(),
                None => "idle".to_string(),
            },
        ));

        let Some(key) = key else {
            return;
        };

        info!(target: "refresh", key = %key, interval_ms = self.interval.as_millis() as u64, "Polling started");
        let ctx = self.ctx.clone();
        let period = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let tag = ctx.tag(generation, &key);
                let request_ctx = ctx.clone();
                tokio::spawn(async move {
                    request_ctx.poll(tag).await;
                });
            }
        }));
    }

    /// Stop polling; responses still in flight are discarded
    pub fn stop(&mut self) {
        self.invalidate();
    }

    pub fn is_polling(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub async fn detail(&self) -> DetailState {
        self.ctx.state.read().await.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn invalidate(&mut self) -> u64 {
        let generation = self.ctx.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(target: "refresh", "Polling timer torn down");
        }
        generation
    }
}

impl Drop for LiveRefreshController {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
