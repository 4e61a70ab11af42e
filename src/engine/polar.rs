use crate::engine::models::{signed_twa, CurrentData, WindData, MS_TO_KNOTS};
use crate::parsers::polars::PolarTable;

/// Resolved speed for one heading under one wind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSolution {
    pub knots: f32,
    /// The speed comes from the engine rather than the sails.
    pub motoring: bool,
}

/// Vessel performance: the polar table plus the no-go cone and the motoring
/// fallback.
#[derive(Debug, Clone)]
pub struct PerformanceModel {
    table: PolarTable,
    /// Minimum absolute true wind angle sailable, degrees.
    no_go_deg: f32,
    /// Speed under engine, knots.
    motor_speed_kts: f32,
}

impl PerformanceModel {
    pub fn new(table: PolarTable, no_go_deg: f32, motor_speed_kts: f32) -> Self {
        Self {
            table,
            no_go_deg,
            motor_speed_kts,
        }
    }

    pub fn no_go_deg(&self) -> f32 {
        self.no_go_deg
    }

    /// Best achievable speed at the given wind. Headings inside the no-go
    /// cone are infeasible under sail; with motoring allowed the engine takes
    /// over whenever it beats the sails.
    pub fn best_speed(&self, tws_kts: f32, twa_deg: f32, allow_motoring: bool) -> SpeedSolution {
        let twa = twa_deg.abs();
        let sail_kts = if twa < self.no_go_deg {
            0.0
        } else {
            self.table.get_speed(tws_kts, twa)
        };

        if allow_motoring && self.motor_speed_kts > sail_kts {
            SpeedSolution {
                knots: self.motor_speed_kts,
                motoring: true,
            }
        } else {
            SpeedSolution {
                knots: sail_kts,
                motoring: false,
            }
        }
    }

    /// Fan of candidate true headings at `resolution_deg` spacing, keeping
    /// only those with positive achievable speed under the current wind.
    pub fn feasible_headings(
        &self,
        wind: &WindData,
        resolution_deg: f32,
        allow_motoring: bool,
    ) -> Vec<f32> {
        let twd = wind.direction();
        let tws_kts = wind.speed_knots();
        let steps = (360.0 / resolution_deg).round() as usize;

        let mut headings = Vec::new();
        for i in 0..steps {
            let heading = i as f32 * resolution_deg;
            let twa = signed_twa(twd, heading);
            if self.best_speed(tws_kts, twa, allow_motoring).knots > 0.0 {
                headings.push(heading);
            }
        }
        headings
    }

    /// Speed and course over ground for one heading: polar (or motor) speed
    /// through water plus the current added vectorially, the same way the
    /// wind triangle is closed on board.
    pub fn over_ground(
        &self,
        heading: f32,
        wind: &WindData,
        current: &CurrentData,
        allow_motoring: bool,
    ) -> (f64, f32, bool) {
        let twa = signed_twa(wind.direction(), heading);
        let solution = self.best_speed(wind.speed_knots(), twa, allow_motoring);
        let stw_ms = (solution.knots / MS_TO_KNOTS) as f64;

        let heading_rad = (heading as f64).to_radians();
        let vx = stw_ms * heading_rad.sin() + current.u as f64;
        let vy = stw_ms * heading_rad.cos() + current.v as f64;

        let sog = (vx.powi(2) + vy.powi(2)).sqrt();
        let mut cog = vx.atan2(vy).to_degrees() as f32;
        if cog < 0.0 {
            cog += 360.0;
        }

        (sog, cog, solution.motoring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> PerformanceModel {
        PerformanceModel::new(PolarTable::constant(8.0), 45.0, 5.0)
    }

    #[test]
    fn test_no_go_cone_rejected_under_sail() {
        let m = model();
        assert_eq!(m.best_speed(15.0, 30.0, false).knots, 0.0);
        assert_eq!(m.best_speed(15.0, -30.0, false).knots, 0.0);
        assert_eq!(m.best_speed(15.0, 45.0, false).knots, 8.0);
    }

    #[test]
    fn test_motoring_through_no_go() {
        let m = model();
        let s = m.best_speed(15.0, 10.0, true);
        assert_eq!(s.knots, 5.0);
        assert!(s.motoring);

        // Off the wind the sails beat the engine.
        let s = m.best_speed(15.0, 90.0, true);
        assert_eq!(s.knots, 8.0);
        assert!(!s.motoring);
    }

    #[test]
    fn test_feasible_headings_excludes_no_go() {
        let m = model();
        let wind = WindData { u: 0.0, v: -10.0 }; // from North
        let headings = m.feasible_headings(&wind, 10.0, false);
        assert!(!headings.is_empty());
        for h in &headings {
            let twa = crate::engine::models::signed_twa(0.0, *h).abs();
            assert!(twa >= 45.0, "heading {h} inside no-go (twa {twa})");
        }

        // With motoring every heading in the fan is feasible.
        let motoring = m.feasible_headings(&wind, 10.0, true);
        assert_eq!(motoring.len(), 36);
    }

    #[test]
    fn test_over_ground_no_current() {
        let m = model();
        let wind = WindData { u: 0.0, v: -5.144 }; // 10 kts from North
        let still = CurrentData { u: 0.0, v: 0.0 };

        let (sog, cog, motoring) = m.over_ground(90.0, &wind, &still, false);
        assert!((sog - 8.0 / MS_TO_KNOTS as f64).abs() < 0.01);
        assert!((cog - 90.0).abs() < 0.1);
        assert!(!motoring);
    }

    #[test]
    fn test_over_ground_drifts_with_current() {
        let m = PerformanceModel::new(PolarTable::default(), 45.0, 0.0);
        let calm = WindData { u: 0.0, v: 0.0 };
        let east_set = CurrentData { u: 2.0, v: 0.0 };

        // No sail speed and no engine: pure drift with the current.
        let (sog, cog, _) = m.over_ground(0.0, &calm, &east_set, false);
        assert!((sog - 2.0).abs() < 0.01);
        assert!((cog - 90.0).abs() < 0.1);
    }
}
