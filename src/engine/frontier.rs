use std::collections::BTreeMap;

use crate::engine::models::{Coordinate, NodeId, RouteState};

/// Append-only store of every [`RouteState`] a search has produced.
///
/// Nodes are never removed or mutated: pruning only drops frontier
/// membership, while the nodes themselves stay reachable through parent
/// links for path reconstruction.
#[derive(Default)]
pub struct NodeArena {
    nodes: Vec<RouteState>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn push(&mut self, state: RouteState) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(state);
        id
    }

    pub fn get(&self, id: NodeId) -> &RouteState {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks parent links from `id` back to the seed and returns the states
    /// in travel order. Pure: repeated calls yield identical sequences.
    pub fn path_states(&self, id: NodeId) -> Vec<&RouteState> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            let state = self.get(node);
            path.push(state);
            cursor = state.parent;
        }
        path.reverse();
        path
    }

    /// The route geometry for `id`, seed first.
    pub fn path(&self, id: NodeId) -> Vec<Coordinate> {
        self.path_states(id).iter().map(|s| s.position).collect()
    }
}

/// Reference frame for the dominance comparison of one merge pass.
#[derive(Debug, Clone, Copy)]
pub struct DominanceFrame {
    /// Advance is measured relative to here (the route start).
    pub origin: Coordinate,
    /// Bearing sectors are measured from here. Re-anchored every layer to
    /// the previous frontier's centroid: a frame fixed at the start would
    /// subtend ever fewer sectors as the frontier travels away from it,
    /// collapsing lateral resolution near arrival.
    pub anchor: Coordinate,
    /// When set, advance is progress toward this point; otherwise advance is
    /// plain distance made good from the origin.
    pub goal: Option<Coordinate>,
    /// Width of one angular comparability sector, degrees.
    pub sector_deg: f32,
}

impl DominanceFrame {
    /// Larger is better: meters closed on the goal, or meters made from the
    /// origin when exploring without a destination.
    pub fn advance(&self, state: &RouteState) -> f64 {
        match self.goal {
            Some(goal) => -state.position.distance_to(&goal),
            None => self.origin.distance_to(&state.position),
        }
    }

    fn sector(&self, state: &RouteState) -> i64 {
        let bearing = self.anchor.bearing_to(&state.position);
        let count = (360.0 / self.sector_deg).round().max(1.0) as i64;
        // Round to the nearest sector center so bearings sitting on a
        // boundary do not split on float jitter; 360 wraps back onto 0.
        ((bearing / self.sector_deg).round() as i64).rem_euclid(count)
    }
}

/// Strict preference order between two comparable states: greater advance
/// wins, then fewer tacks, then lower cumulative distance. A total
/// lexicographic order, so it is transitive and irreflexive and the
/// sequential incumbent scan in [`IsochroneFrontier::merge_pruned`] can
/// never keep a state that a dropped candidate dominates.
pub fn dominates(a: &RouteState, adv_a: f64, b: &RouteState, adv_b: f64) -> bool {
    if adv_a != adv_b {
        return adv_a > adv_b;
    }
    if a.tacks != b.tacks {
        return a.tacks < b.tacks;
    }
    a.distance < b.distance
}

/// One elapsed-time layer of the search: the ordered boundary of reachable
/// positions. Members are arena indices kept in bearing order around the
/// route origin.
#[derive(Debug, Clone)]
pub struct IsochroneFrontier {
    /// Seconds since departure shared by every member.
    pub elapsed: f64,
    members: Vec<NodeId>,
}

impl IsochroneFrontier {
    /// The single-member layer a search starts from.
    pub fn seed(id: NodeId) -> Self {
        Self {
            elapsed: 0.0,
            members: vec![id],
        }
    }

    /// Merges candidate states into a pruned frontier: candidates are
    /// bucketed into angular sectors around the origin and only the dominant
    /// state of each sector survives. States in different sectors are not
    /// comparable and all stay, keeping the frontier a boundary rather than
    /// a single best point.
    pub fn merge_pruned(
        candidates: Vec<NodeId>,
        arena: &NodeArena,
        frame: &DominanceFrame,
        elapsed: f64,
    ) -> Self {
        let mut sectors: BTreeMap<i64, (NodeId, f64)> = BTreeMap::new();

        for id in candidates {
            let state = arena.get(id);
            let advance = frame.advance(state);
            let key = frame.sector(state);

            match sectors.get(&key).copied() {
                Some((incumbent, incumbent_adv)) => {
                    if dominates(state, advance, arena.get(incumbent), incumbent_adv) {
                        sectors.insert(key, (id, advance));
                    }
                }
                None => {
                    sectors.insert(key, (id, advance));
                }
            }
        }

        Self {
            elapsed,
            members: sectors.into_values().map(|(id, _)| id).collect(),
        }
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The boundary as plain geometry, in bearing order, for rendering.
    pub fn geometry(&self, arena: &NodeArena) -> Vec<Coordinate> {
        self.members.iter().map(|id| arena.get(*id).position).collect()
    }

    /// Mean position of the members, used to anchor the next merge pass.
    pub fn centroid(&self, arena: &NodeArena) -> Option<Coordinate> {
        if self.members.is_empty() {
            return None;
        }
        let (mut lat, mut lon) = (0.0, 0.0);
        for id in &self.members {
            let position = arena.get(*id).position;
            lat += position.lat;
            lon += position.lon;
        }
        let n = self.members.len() as f64;
        Some(Coordinate::new(lat / n, lon / n))
    }
}
