use chrono::Duration;
use log::{debug, info};
use rayon::prelude::*;

use crate::engine::constraints::ConstraintSet;
use crate::engine::field::VectorField;
use crate::engine::frontier::{DominanceFrame, IsochroneFrontier, NodeArena};
use crate::engine::models::{wind_side, NodeId, RouteState};
use crate::engine::polar::PerformanceModel;

/// Advances a frontier by one time step.
///
/// Expansion is independent per member and runs on the rayon pool; the field,
/// polar and constraints are shared read-only. Candidates are collected once
/// all members have expanded, appended to the arena, then pruned in a single
/// dominance pass.
pub struct Propagator<'a> {
    pub field: &'a VectorField,
    pub model: &'a PerformanceModel,
    pub constraints: &'a ConstraintSet,
    pub step_seconds: f64,
    pub heading_resolution_deg: f32,
    pub allow_motoring: bool,
    pub frame: DominanceFrame,
}

impl Propagator<'_> {
    pub fn expand(&self, arena: &mut NodeArena, frontier: &IsochroneFrontier) -> IsochroneFrontier {
        info!("Expanding isochrone frontier of {} members", frontier.len());

        let snapshot: &NodeArena = arena;
        let candidates: Vec<RouteState> = frontier
            .members()
            .par_iter()
            .flat_map_iter(|&id| self.expand_member(id, snapshot.get(id)))
            .collect();

        let ids: Vec<NodeId> = candidates.into_iter().map(|c| arena.push(c)).collect();
        let next = IsochroneFrontier::merge_pruned(
            ids,
            arena,
            &self.frame,
            frontier.elapsed + self.step_seconds,
        );

        info!("Pruned frontier down to {} members", next.len());
        next
    }

    /// All admissible children of one frontier member. A state with no
    /// feasible heading, or no forecast coverage, simply contributes nothing
    /// this step.
    fn expand_member(&self, id: NodeId, state: &RouteState) -> Vec<RouteState> {
        let env = match self.field.sample(&state.position, state.time) {
            Ok(env) => env,
            Err(_) => {
                debug!("No forecast coverage at {:?}, dropping branch", state.position);
                return Vec::new();
            }
        };

        let headings =
            self.model
                .feasible_headings(&env.wind, self.heading_resolution_deg, self.allow_motoring);

        let mut children = Vec::with_capacity(headings.len());
        for heading in headings {
            if self
                .constraints
                .violates_sailing_rules(state, heading, &env.wind)
            {
                continue;
            }

            let (sog, cog, motoring) =
                self.model
                    .over_ground(heading, &env.wind, &env.current, self.allow_motoring);
            if sog <= 1e-3 {
                continue;
            }

            let leg_m = sog * self.step_seconds;
            let position = state.position.destination(leg_m, cog);
            if self.constraints.inside_exclusion(&position) {
                continue;
            }

            let is_tack = ConstraintSet::is_tack(state, heading, &env.wind);
            children.push(RouteState {
                position,
                time: state.time + Duration::milliseconds((self.step_seconds * 1000.0) as i64),
                elapsed: state.elapsed + self.step_seconds,
                heading,
                tack_side: Some(wind_side(env.wind.direction(), heading)),
                parent: Some(id),
                distance: state.distance + leg_m,
                tacks: state.tacks + u32::from(is_tack),
                motoring,
            });
        }
        children
    }
}
