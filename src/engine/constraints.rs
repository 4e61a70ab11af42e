use geo::{Contains, Point, Polygon};

use crate::engine::mask::LandMask;
use crate::engine::models::{wind_side, Coordinate, RouteState, WindData};

/// One forbidden region. Sources are heterogeneous (coastline mask, user
/// polygons) and are combined by OR in [`ConstraintSet::inside_exclusion`].
pub enum ExclusionZone {
    Land(LandMask),
    Polygon(Polygon<f64>),
}

impl ExclusionZone {
    pub fn contains(&self, point: &Coordinate) -> bool {
        match self {
            Self::Land(mask) => mask.is_land(point),
            Self::Polygon(poly) => poly.contains(&Point::new(point.lon, point.lat)),
        }
    }
}

/// How tacks and jibes are treated during the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TackPolicy {
    Allowed,
    Forbidden,
    /// At most this many tacks over the whole path.
    MaxCount(u32),
}

/// Pure sailing-rule filters applied to every candidate leg.
#[derive(Debug, Clone)]
pub struct SailingRules {
    /// Maximum true wind speed in knots; stronger wind forbids sailing.
    pub max_wind_kts: Option<f32>,
    pub tack_policy: TackPolicy,
}

impl Default for SailingRules {
    fn default() -> Self {
        Self {
            max_wind_kts: None,
            tack_policy: TackPolicy::Allowed,
        }
    }
}

/// The full constraint set consulted by the propagator: geographic
/// exclusions plus sailing rules. All predicates are pure.
#[derive(Default)]
pub struct ConstraintSet {
    zones: Vec<ExclusionZone>,
    pub rules: SailingRules,
}

impl ConstraintSet {
    pub fn new(rules: SailingRules) -> Self {
        Self {
            zones: Vec::new(),
            rules,
        }
    }

    pub fn with_zone(mut self, zone: ExclusionZone) -> Self {
        self.zones.push(zone);
        self
    }

    pub fn add_zone(&mut self, zone: ExclusionZone) {
        self.zones.push(zone);
    }

    /// True when the point lies in any forbidden region.
    pub fn inside_exclusion(&self, point: &Coordinate) -> bool {
        self.zones.iter().any(|z| z.contains(point))
    }

    /// True when steering `candidate_heading` from `parent` under `wind`
    /// breaks a sailing rule: wind over the configured maximum, or a tack the
    /// tack policy does not permit.
    pub fn violates_sailing_rules(
        &self,
        parent: &RouteState,
        candidate_heading: f32,
        wind: &WindData,
    ) -> bool {
        if let Some(max) = self.rules.max_wind_kts {
            if wind.speed_knots() > max {
                return true;
            }
        }

        if Self::is_tack(parent, candidate_heading, wind) {
            match self.rules.tack_policy {
                TackPolicy::Allowed => false,
                TackPolicy::Forbidden => true,
                TackPolicy::MaxCount(n) => parent.tacks >= n,
            }
        } else {
            false
        }
    }

    /// A leg is a tack (or jibe) when the wind moves to the other side of
    /// the boat relative to the parent's leg. The seed carries no side, so
    /// the first leg never tacks.
    pub fn is_tack(parent: &RouteState, candidate_heading: f32, wind: &WindData) -> bool {
        match parent.tack_side {
            Some(side) => wind_side(wind.direction(), candidate_heading) != side,
            None => false,
        }
    }
}
