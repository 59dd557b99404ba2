use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::engine::geometry::haversine_distance_m;
use crate::types::geo::Point;
use crate::types::tracking::RidingSession;

/// Thresholds for the boarding/alighting hysteresis.
#[derive(Debug, Clone)]
pub struct BoardingConfig {
    pub near_threshold_m: f64,
    pub far_threshold_m: f64,
    /// A candidate must move at least this far between ticks to count
    /// as moving; a parked shuttle never triggers boarding.
    pub min_movement_m: f64,
    pub board_ticks: u32,
    pub alight_ticks: u32,
    /// Candidate positions older than this are not trusted for the
    /// exit check.
    pub stale_after: Duration,
}

impl Default for BoardingConfig {
    fn default() -> Self {
        Self {
            near_threshold_m: 30.0,
            far_threshold_m: 100.0,
            min_movement_m: 5.0,
            board_ticks: 4,
            alight_ticks: 4,
            stale_after: Duration::from_secs(10),
        }
    }
}

/// One shuttle position as seen by the monitor on a tick.
#[derive(Debug, Clone)]
pub struct CandidateObservation {
    pub entity_id: String,
    pub position: Point,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct RecordedPosition {
    position: Point,
    observed_at: DateTime<Utc>,
}

/// Per-rider detector that infers boarding and alighting from repeated
/// proximity readings. Owns all of its cross-tick memory: the
/// last-seen position per candidate shuttle, the consecutive-near
/// counters, and the active session if any. The machine prefers
/// holding its current state over flapping: stale, missing, or
/// ambiguous data never causes a transition.
#[derive(Debug, Default)]
pub struct BoardingMonitor {
    last_positions: HashMap<String, RecordedPosition>,
    near_counts: HashMap<String, u32>,
    session: Option<RidingSession>,
}

impl BoardingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&RidingSession> {
        self.session.as_ref()
    }

    /// Drop all accumulated evidence and any active session. Called
    /// when the rider's assignment changes underneath the monitor.
    pub fn reset(&mut self) {
        self.last_positions.clear();
        self.near_counts.clear();
        self.session = None;
    }

    /// Forcefully end a session bound to `entity_id`, e.g. because the
    /// shuttle was reassigned to a different path.
    pub fn clear_session_for(&mut self, entity_id: &str) {
        if self
            .session
            .as_ref()
            .map_or(false, |s| s.entity_id == entity_id)
        {
            self.session = None;
            self.near_counts.clear();
        }
    }

    /// Process one tick: the rider's own position plus every candidate
    /// shuttle position currently known. Returns the active session
    /// after the tick, if any.
    pub fn tick(
        &mut self,
        observer_id: &str,
        observer: Point,
        candidates: &[CandidateObservation],
        now: DateTime<Utc>,
        config: &BoardingConfig,
    ) -> Option<&RidingSession> {
        // Movement is judged against the position recorded on the
        // previous tick, so compute it before overwriting the memory.
        let mut moved: HashMap<&str, bool> = HashMap::new();
        for candidate in candidates {
            let was_moving = self
                .last_positions
                .get(&candidate.entity_id)
                .map(|prev| {
                    haversine_distance_m(prev.position, candidate.position)
                        > config.min_movement_m
                })
                .unwrap_or(false);
            moved.insert(candidate.entity_id.as_str(), was_moving);
        }
        for candidate in candidates {
            self.last_positions.insert(
                candidate.entity_id.clone(),
                RecordedPosition {
                    position: candidate.position,
                    observed_at: candidate.observed_at,
                },
            );
        }

        if self.session.is_some() {
            self.evaluate_exit(observer, now, config);
        } else {
            self.evaluate_boarding(observer_id, observer, candidates, &moved, now, config);
        }

        self.session.as_ref()
    }

    fn evaluate_boarding(
        &mut self,
        observer_id: &str,
        observer: Point,
        candidates: &[CandidateObservation],
        moved: &HashMap<&str, bool>,
        now: DateTime<Utc>,
        config: &BoardingConfig,
    ) {
        for candidate in candidates {
            let distance = haversine_distance_m(observer, candidate.position);

            if distance > config.near_threshold_m {
                // Hard reset, no partial credit across excursions.
                self.near_counts.remove(&candidate.entity_id);
                continue;
            }

            let is_moving = moved
                .get(candidate.entity_id.as_str())
                .copied()
                .unwrap_or(false);
            if !is_moving {
                // Near a parked shuttle: hold the counter, do not grow it.
                continue;
            }

            let count = self
                .near_counts
                .entry(candidate.entity_id.clone())
                .or_insert(0);
            *count += 1;

            if *count >= config.board_ticks {
                tracing::info!(
                    observer = observer_id,
                    entity = %candidate.entity_id,
                    "rider boarded after {} consecutive near readings",
                    count
                );
                self.session = Some(RidingSession::new(
                    observer_id.to_string(),
                    candidate.entity_id.clone(),
                    now,
                ));
                self.near_counts.clear();
                return;
            }
        }
    }

    fn evaluate_exit(&mut self, observer: Point, now: DateTime<Utc>, config: &BoardingConfig) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        // No fresh data for the boarded shuttle: hold state rather
        // than treating silence as distance.
        let Some(recorded) = self.last_positions.get(&session.entity_id) else {
            return;
        };
        let age = now.signed_duration_since(recorded.observed_at);
        if age.num_milliseconds() > config.stale_after.as_millis() as i64 {
            return;
        }

        let distance = haversine_distance_m(observer, recorded.position);
        if distance > config.far_threshold_m {
            session.consecutive_far += 1;
            if session.consecutive_far >= config.alight_ticks {
                tracing::info!(
                    observer = %session.observer_id,
                    entity = %session.entity_id,
                    "rider alighted after {} consecutive far readings",
                    session.consecutive_far
                );
                self.session = None;
            }
        } else {
            session.consecutive_far = 0;
        }
    }
}
