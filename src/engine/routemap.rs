use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::engine::constraints::ConstraintSet;
use crate::engine::field::VectorField;
use crate::engine::frontier::{DominanceFrame, IsochroneFrontier, NodeArena};
use crate::engine::models::{Coordinate, NodeId, RouteState};
use crate::engine::polar::PerformanceModel;
use crate::engine::propagator::Propagator;
use crate::error::RoutingError;

/// Where a search currently stands. `Arrived`, `Exhausted` and `Cancelled`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Initialized,
    Propagating,
    Arrived,
    Exhausted,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Arrived | Self::Exhausted | Self::Cancelled)
    }
}

/// Everything a search needs besides the field, polar and constraint
/// objects. Omitting the destination runs a fixed-duration exploration
/// instead of a point-to-point search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub start: Coordinate,
    pub destination: Option<Coordinate>,
    pub departure: DateTime<Utc>,
    /// Duration of one propagation step, seconds.
    pub step_seconds: f64,
    /// Upper bound on total simulated time, seconds.
    pub max_duration_seconds: f64,
    /// A frontier member closer than this to the destination has arrived.
    pub arrival_tolerance_m: f64,
    /// Spacing of the candidate heading fan, degrees.
    pub heading_resolution_deg: f32,
    /// Width of one dominance comparability sector, degrees.
    pub sector_deg: f32,
    pub allow_motoring: bool,
}

impl RouteConfig {
    pub fn new(start: Coordinate, destination: Option<Coordinate>) -> Self {
        Self {
            start,
            destination,
            departure: Utc::now(),
            step_seconds: 3600.0,
            max_duration_seconds: 72.0 * 3600.0,
            arrival_tolerance_m: 5_000.0,
            heading_resolution_deg: 10.0,
            sector_deg: 10.0,
            allow_motoring: false,
        }
    }

    /// Rejects unusable configurations before any propagation happens.
    pub fn validate(&self) -> Result<(), RoutingError> {
        if !self.step_seconds.is_finite() || self.step_seconds <= 0.0 {
            return Err(RoutingError::ConfigurationInvalid(
                "step duration must be positive".into(),
            ));
        }
        if !self.max_duration_seconds.is_finite() || self.max_duration_seconds < self.step_seconds {
            return Err(RoutingError::ConfigurationInvalid(
                "maximum duration must be finite and at least one step".into(),
            ));
        }
        if !(0.0..=360.0).contains(&self.heading_resolution_deg)
            || self.heading_resolution_deg == 0.0
        {
            return Err(RoutingError::ConfigurationInvalid(
                "heading resolution must be in (0, 360]".into(),
            ));
        }
        if !(0.0..=360.0).contains(&self.sector_deg) || self.sector_deg == 0.0 {
            return Err(RoutingError::ConfigurationInvalid(
                "sector width must be in (0, 360]".into(),
            ));
        }
        if self.destination.is_some()
            && !(self.arrival_tolerance_m.is_finite() && self.arrival_tolerance_m > 0.0)
        {
            return Err(RoutingError::ConfigurationInvalid(
                "arrival tolerance must be finite and positive when a destination is set".into(),
            ));
        }
        if let Some(dest) = self.destination {
            if self.start.distance_to(&dest) <= self.arrival_tolerance_m {
                return Err(RoutingError::ConfigurationInvalid(
                    "destination already within arrival tolerance of the start".into(),
                ));
            }
        }
        Ok(())
    }
}

/// One route-search session: the full frontier sequence, the node arena and
/// the terminal outcome. Sessions are fully independent; recomputing after a
/// weather update means starting a fresh map on a fresh field snapshot.
pub struct RouteMap {
    config: RouteConfig,
    field: Arc<VectorField>,
    model: Arc<PerformanceModel>,
    constraints: Arc<ConstraintSet>,
    arena: NodeArena,
    frontiers: Vec<Arc<IsochroneFrontier>>,
    status: SessionStatus,
    winner: Option<NodeId>,
}

impl RouteMap {
    pub fn new(
        config: RouteConfig,
        field: Arc<VectorField>,
        model: Arc<PerformanceModel>,
        constraints: Arc<ConstraintSet>,
    ) -> Result<Self, RoutingError> {
        config.validate()?;

        let mut arena = NodeArena::new();
        let seed = arena.push(RouteState::seed(config.start, config.departure));
        let frontiers = vec![Arc::new(IsochroneFrontier::seed(seed))];

        Ok(Self {
            config,
            field,
            model,
            constraints,
            arena,
            frontiers,
            status: SessionStatus::Initialized,
            winner: None,
        })
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub fn frontiers(&self) -> &[Arc<IsochroneFrontier>] {
        &self.frontiers
    }

    pub fn node(&self, id: NodeId) -> &RouteState {
        self.arena.get(id)
    }

    fn frame(&self) -> DominanceFrame {
        DominanceFrame {
            origin: self.config.start,
            anchor: self.config.start,
            goal: self.config.destination,
            sector_deg: self.config.sector_deg,
        }
    }

    /// Runs one propagation step and returns the new status. Calling this on
    /// a terminal session is a no-op.
    pub fn step(&mut self) -> SessionStatus {
        if self.status.is_terminal() {
            return self.status;
        }
        self.status = SessionStatus::Propagating;

        let current = Arc::clone(self.frontiers.last().expect("seeded in new"));
        // Sectors are bucketed from the current frontier's centroid rather
        // than from the start, so the angular resolution does not collapse
        // once the frontier has travelled far from its origin.
        let mut frame = self.frame();
        if let Some(centroid) = current.centroid(&self.arena) {
            frame.anchor = centroid;
        }
        let propagator = Propagator {
            field: &self.field,
            model: &self.model,
            constraints: &self.constraints,
            step_seconds: self.config.step_seconds,
            heading_resolution_deg: self.config.heading_resolution_deg,
            allow_motoring: self.config.allow_motoring,
            frame,
        };
        let next = propagator.expand(&mut self.arena, &current);

        if next.is_empty() {
            info!("Frontier emptied after {:.0}s: search exhausted", current.elapsed);
            self.status = SessionStatus::Exhausted;
            return self.status;
        }

        let elapsed = next.elapsed;
        self.frontiers.push(Arc::new(next));

        if let Some(winner) = self.check_arrival() {
            let state = self.arena.get(winner);
            info!(
                "Arrived after {:.1}h, {} tacks, {:.1} nm",
                state.elapsed / 3600.0,
                state.tacks,
                state.distance / 1852.0
            );
            self.winner = Some(winner);
            self.status = SessionStatus::Arrived;
        } else if elapsed + self.config.step_seconds > self.config.max_duration_seconds {
            info!("Search exhausted at the maximum duration bound");
            self.status = SessionStatus::Exhausted;
        }
        self.status
    }

    /// Steps until terminal. Use [`RouteSession`] for a cancellable
    /// background run.
    pub fn run(&mut self) -> SessionStatus {
        while !self.status.is_terminal() {
            self.step();
        }
        self.status
    }

    /// Arrived member with the best cumulative metric, if any. A destination
    /// inside an exclusion zone is unreachable by definition, so it never
    /// produces an arrival.
    fn check_arrival(&self) -> Option<NodeId> {
        let dest = self.config.destination?;
        if self.constraints.inside_exclusion(&dest) {
            return None;
        }

        let latest = self.frontiers.last()?;
        latest
            .members()
            .iter()
            .copied()
            .filter(|id| {
                self.arena.get(*id).position.distance_to(&dest) <= self.config.arrival_tolerance_m
            })
            .min_by(|a, b| {
                let a = self.arena.get(*a);
                let b = self.arena.get(*b);
                (a.tacks, a.distance)
                    .partial_cmp(&(b.tacks, b.distance))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// The best state known so far: the winner once arrived, otherwise the
    /// latest frontier member with the greatest advance.
    pub fn best_state(&self) -> Option<&RouteState> {
        self.best_id().map(|id| self.arena.get(id))
    }

    fn best_id(&self) -> Option<NodeId> {
        if let Some(winner) = self.winner {
            return Some(winner);
        }
        let frame = self.frame();
        self.frontiers.last()?.members().iter().copied().max_by(|a, b| {
            let adv_a = frame.advance(self.arena.get(*a));
            let adv_b = frame.advance(self.arena.get(*b));
            adv_a
                .partial_cmp(&adv_b)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Route geometry for the best state known so far, seed first.
    pub fn best_route(&self) -> Option<Vec<Coordinate>> {
        self.best_id().map(|id| self.arena.path(id))
    }

    /// Full states along the best route, for callers that need the metrics.
    pub fn best_route_states(&self) -> Option<Vec<RouteState>> {
        self.best_id()
            .map(|id| self.arena.path_states(id).into_iter().cloned().collect())
    }

    /// The most recent frontier as plain geometry, in bearing order.
    pub fn latest_frontier_geometry(&self) -> Vec<Coordinate> {
        self.frontiers
            .last()
            .map(|f| f.geometry(&self.arena))
            .unwrap_or_default()
    }

    /// Every completed frontier as plain geometry, oldest first.
    pub fn frontier_geometries(&self) -> Vec<Vec<Coordinate>> {
        self.frontiers.iter().map(|f| f.geometry(&self.arena)).collect()
    }

    fn mark_cancelled(&mut self) {
        if !self.status.is_terminal() {
            info!("Route search cancelled");
            self.status = SessionStatus::Cancelled;
        }
    }
}

/// Snapshot of a running session, published atomically after every completed
/// step so readers always observe fully pruned frontiers.
#[derive(Clone)]
pub struct Progress {
    pub status: SessionStatus,
    /// Completed frontier geometry, oldest first.
    pub frontiers: Vec<Arc<Vec<Coordinate>>>,
    pub best_route: Option<Vec<Coordinate>>,
}

struct SessionShared {
    cancel: AtomicBool,
    progress: Mutex<Arc<Progress>>,
}

/// A search running on a background thread, pollable at any time for status
/// and partial results. Cancellation is cooperative: the flag is only
/// checked between steps, so the session always holds a complete, internally
/// consistent frontier sequence.
pub struct RouteSession {
    shared: Arc<SessionShared>,
    handle: Option<JoinHandle<RouteMap>>,
}

impl RouteSession {
    pub fn spawn(mut map: RouteMap) -> Self {
        let shared = Arc::new(SessionShared {
            cancel: AtomicBool::new(false),
            progress: Mutex::new(Arc::new(Self::snapshot(&map))),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || {
            loop {
                if worker_shared.cancel.load(Ordering::Relaxed) {
                    map.mark_cancelled();
                    Self::publish(&worker_shared, &map);
                    break;
                }
                let status = map.step();
                Self::publish(&worker_shared, &map);
                if status.is_terminal() {
                    break;
                }
            }
            map
        });

        Self {
            shared,
            handle: Some(handle),
        }
    }

    fn snapshot(map: &RouteMap) -> Progress {
        Progress {
            status: map.status(),
            frontiers: map
                .frontier_geometries()
                .into_iter()
                .map(Arc::new)
                .collect(),
            best_route: map.best_route(),
        }
    }

    fn publish(shared: &SessionShared, map: &RouteMap) {
        let snapshot = Arc::new(Self::snapshot(map));
        if let Ok(mut slot) = shared.progress.lock() {
            *slot = snapshot;
        }
    }

    fn progress(&self) -> Arc<Progress> {
        self.shared
            .progress
            .lock()
            .map(|p| Arc::clone(&p))
            .unwrap_or_else(|poisoned| Arc::clone(&poisoned.into_inner()))
    }

    pub fn status(&self) -> SessionStatus {
        self.progress().status
    }

    pub fn best_route(&self) -> Option<Vec<Coordinate>> {
        self.progress().best_route.clone()
    }

    pub fn latest_frontier(&self) -> Option<Arc<Vec<Coordinate>>> {
        self.progress().frontiers.last().cloned()
    }

    pub fn frontiers(&self) -> Vec<Arc<Vec<Coordinate>>> {
        self.progress().frontiers.clone()
    }

    /// Requests cooperative cancellation; takes effect between steps.
    pub fn cancel(&self) {
        self.shared.cancel.store(true, Ordering::Relaxed);
    }

    /// Waits for the worker and returns the finished map.
    pub fn join(mut self) -> RouteMap {
        let handle = self.handle.take().expect("join called once");
        match handle.join() {
            Ok(map) => map,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}
