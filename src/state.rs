use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::config::Config;
use crate::engine::boarding::{BoardingConfig, BoardingMonitor, CandidateObservation};
use crate::engine::{progress, project};
use crate::error::{AppError, FixError};
use crate::types::geo::Point;
use crate::types::path::{Path, StopMarker};
use crate::types::tracking::{Fix, RidingSession, TrackingState};

/// What one processed shuttle fix produced. `matched: false` covers
/// both "no assigned path" and "projector found nothing acceptable";
/// either way the previous state stands.
#[derive(Debug, Clone, Serialize)]
pub struct FixOutcome {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingState>,
}

#[derive(Debug, Clone)]
struct EntityTracker {
    path_id: String,
    state: TrackingState,
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    paths: Arc<DashMap<String, Arc<Path>>>,
    /// entity id -> path id the shuttle is currently driving
    assignments: Arc<DashMap<String, String>>,
    trackers: Arc<DashMap<String, EntityTracker>>,
    latest_fixes: Arc<DashMap<String, Fix>>,
    observers: Arc<DashMap<String, BoardingMonitor>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            paths: Arc::new(DashMap::new()),
            assignments: Arc::new(DashMap::new()),
            trackers: Arc::new(DashMap::new()),
            latest_fixes: Arc::new(DashMap::new()),
            observers: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn boarding_config(&self) -> BoardingConfig {
        BoardingConfig {
            near_threshold_m: self.config.near_threshold_m,
            far_threshold_m: self.config.far_threshold_m,
            min_movement_m: self.config.min_movement_m,
            board_ticks: self.config.board_ticks,
            alight_ticks: self.config.alight_ticks,
            stale_after: self.config.stale_after,
        }
    }

    pub fn insert_path(&self, path: Path) -> Arc<Path> {
        let path = Arc::new(path);
        self.paths.insert(path.id.clone(), path.clone());
        if let Some(entity_id) = &path.linked_entity_id {
            self.bind_assignment(entity_id, &path.id);
        }
        path
    }

    pub fn get_path(&self, path_id: &str) -> Option<Arc<Path>> {
        self.paths.get(path_id).map(|entry| entry.value().clone())
    }

    pub fn list_paths(&self) -> Vec<Arc<Path>> {
        self.paths.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn stop_markers(&self) -> Vec<StopMarker> {
        self.paths
            .iter()
            .flat_map(|entry| entry.value().stop_markers())
            .collect()
    }

    /// Bind a shuttle to a path. Any previous progress for the shuttle
    /// and any riding session bound to it are discarded: assignment
    /// change means start clean, never reconcile.
    pub fn assign(&self, entity_id: &str, path_id: &str) -> Result<(), AppError> {
        if !self.paths.contains_key(path_id) {
            return Err(AppError::NotFound(format!("path {path_id}")));
        }
        self.bind_assignment(entity_id, path_id);
        Ok(())
    }

    fn bind_assignment(&self, entity_id: &str, path_id: &str) {
        self.assignments
            .insert(entity_id.to_string(), path_id.to_string());
        self.trackers.insert(
            entity_id.to_string(),
            EntityTracker {
                path_id: path_id.to_string(),
                state: TrackingState::default(),
            },
        );
        for mut observer in self.observers.iter_mut() {
            observer.value_mut().clear_session_for(entity_id);
        }
        tracing::info!(entity = entity_id, path = path_id, "assignment reset");
    }

    /// Process one shuttle fix to completion: remember it for boarding
    /// evaluation, then project and advance if the shuttle has an
    /// assigned path. A projector miss holds the previous state.
    pub fn process_fix(&self, fix: Fix) -> Result<FixOutcome, AppError> {
        if !fix.point().is_finite() {
            return Err(FixError::NonFiniteCoordinates {
                lat: fix.lat,
                lon: fix.lon,
            }
            .into());
        }

        let entity_id = fix.entity_id.clone();
        let position = fix.point();
        self.remember_fix(fix);

        let Some(path_id) = self
            .assignments
            .get(&entity_id)
            .map(|entry| entry.value().clone())
        else {
            return Ok(FixOutcome {
                matched: false,
                tracking: None,
            });
        };
        let Some(path) = self.get_path(&path_id) else {
            return Ok(FixOutcome {
                matched: false,
                tracking: None,
            });
        };

        let mut tracker = self
            .trackers
            .entry(entity_id.clone())
            .or_insert_with(|| EntityTracker {
                path_id: path_id.clone(),
                state: TrackingState::default(),
            });
        if tracker.path_id != path_id {
            // The assignment changed between lookups; start clean.
            tracker.path_id = path_id.clone();
            tracker.state = TrackingState::default();
        }

        let projection = project::project_onto_path(
            position,
            &path,
            tracker.state.segment_index,
            self.config.search_ahead_segments,
            self.config.acceptance_distance_m,
        );

        match projection {
            Some(projection) => {
                tracker.state = progress::advance(
                    &tracker.state,
                    &projection,
                    &path,
                    self.config.min_advance_m,
                    self.config.max_backward_m,
                );
                tracing::debug!(
                    entity = %entity_id,
                    segment = tracker.state.segment_index,
                    cumulative_m = tracker.state.cumulative_m,
                    stops = tracker.state.stops_passed,
                    "fix accepted"
                );
                Ok(FixOutcome {
                    matched: true,
                    tracking: Some(tracker.state.clone()),
                })
            }
            None => {
                tracing::debug!(entity = %entity_id, "fix outside acceptance window");
                Ok(FixOutcome {
                    matched: false,
                    tracking: Some(tracker.state.clone()),
                })
            }
        }
    }

    fn remember_fix(&self, fix: Fix) {
        match self.latest_fixes.entry(fix.entity_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                // Fixes may arrive out of order; keep the newest.
                if fix.observed_at >= entry.get().observed_at {
                    entry.insert(fix);
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(fix);
            }
        }
    }

    /// Process one rider location sample against every shuttle we have
    /// a recent position for.
    pub fn observer_tick(
        &self,
        observer_id: &str,
        position: Point,
        now: DateTime<Utc>,
    ) -> Result<Option<RidingSession>, AppError> {
        if !position.is_finite() {
            return Err(FixError::NonFiniteCoordinates {
                lat: position.lat,
                lon: position.lon,
            }
            .into());
        }

        let candidates: Vec<CandidateObservation> = self
            .latest_fixes
            .iter()
            .map(|entry| CandidateObservation {
                entity_id: entry.entity_id.clone(),
                position: entry.point(),
                observed_at: entry.observed_at,
            })
            .collect();

        let config = self.boarding_config();
        let mut monitor = self.observers.entry(observer_id.to_string()).or_default();
        let session = monitor
            .tick(observer_id, position, &candidates, now, &config)
            .cloned();
        Ok(session)
    }

    pub fn tracking_state(&self, entity_id: &str) -> Option<TrackingState> {
        self.trackers.get(entity_id).map(|entry| entry.state.clone())
    }

    pub fn assigned_path_id(&self, entity_id: &str) -> Option<String> {
        self.assignments.get(entity_id).map(|entry| entry.value().clone())
    }

    pub fn riding_session(&self, observer_id: &str) -> Option<RidingSession> {
        self.observers
            .get(observer_id)
            .and_then(|monitor| monitor.session().cloned())
    }

    /// Throw away a rider's accumulated evidence and session, e.g.
    /// when they pick a different route to follow.
    pub fn reset_observer(&self, observer_id: &str) {
        if let Some(mut monitor) = self.observers.get_mut(observer_id) {
            monitor.reset();
            tracing::info!(observer = observer_id, "observer state reset");
        }
    }

    /// Drop shuttle fixes that have aged out of the live set.
    pub fn evict_expired(&self, ttl: Duration) {
        let cutoff = Utc::now() - chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        self.latest_fixes.retain(|_, fix| fix.observed_at >= cutoff);
        tracing::info!("Fix eviction complete. Live shuttles: {}", self.latest_fixes.len());
    }
}
