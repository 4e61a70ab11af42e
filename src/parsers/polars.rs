use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use crate::error::RoutingError;

/// Boat polar table: speed through water by true wind speed and angle.
#[derive(Debug, Clone, Default)]
pub struct PolarTable {
    /// True wind speeds (knots), ascending.
    pub tws: Vec<f32>,
    /// True wind angles (degrees), ascending.
    pub twa: Vec<f32>,
    /// Boat speeds in knots: `speeds[twa_idx][tws_idx]`.
    pub speeds: Vec<Vec<f32>>,
}

impl PolarTable {
    /// Loads the `twa/tws` CSV layout: header row of wind speeds, one row per
    /// wind angle.
    pub fn load_from_csv<P: AsRef<Path>>(path: P) -> Result<Self, RoutingError> {
        let path = path.as_ref();
        info!("Loading polar data from CSV: {:?}", path);

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header = lines
            .next()
            .ok_or_else(|| RoutingError::PolarFormat("empty polar file".into()))??;
        let parts: Vec<&str> = header.split(',').collect();
        if parts.len() < 2 {
            return Err(RoutingError::PolarFormat(
                "header needs at least one wind speed column".into(),
            ));
        }

        let mut tws = Vec::new();
        for val in &parts[1..] {
            let speed: f32 = val.trim().parse().map_err(|_| {
                RoutingError::PolarFormat(format!("bad wind speed column {val:?}"))
            })?;
            tws.push(speed);
        }

        let mut twa = Vec::new();
        let mut speeds = Vec::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let row_parts: Vec<&str> = line.split(',').collect();
            if row_parts.len() != tws.len() + 1 {
                return Err(RoutingError::PolarFormat(format!(
                    "row {:?} has {} columns, expected {}",
                    row_parts[0],
                    row_parts.len(),
                    tws.len() + 1
                )));
            }

            let twa_val: f32 = row_parts[0].trim().parse().map_err(|_| {
                RoutingError::PolarFormat(format!("bad wind angle {:?}", row_parts[0]))
            })?;
            twa.push(twa_val);

            let mut row_speeds = Vec::new();
            for val in &row_parts[1..] {
                let speed: f32 = val.trim().parse().map_err(|_| {
                    RoutingError::PolarFormat(format!("bad boat speed {val:?}"))
                })?;
                row_speeds.push(speed.max(0.0));
            }
            speeds.push(row_speeds);
        }

        info!("Polar loaded: {} TWA x {} TWS buckets", twa.len(), tws.len());
        Ok(Self { tws, twa, speeds })
    }

    /// Uniform table returning `speed_kts` for every wind, for tests and
    /// synthetic scenarios.
    pub fn constant(speed_kts: f32) -> Self {
        Self {
            tws: vec![0.0, 60.0],
            twa: vec![0.0, 180.0],
            speeds: vec![vec![speed_kts; 2]; 2],
        }
    }

    /// Bilinear interpolation of boat speed (knots) at the given true wind
    /// speed and absolute angle. An empty table yields zero everywhere, so
    /// undefined buckets fail closed.
    pub fn get_speed(&self, target_tws: f32, target_twa: f32) -> f32 {
        let (Some(&tws_last), Some(&twa_last)) = (self.tws.last(), self.twa.last()) else {
            return 0.0;
        };

        let tws_clamped = target_tws.clamp(self.tws[0], tws_last);
        let twa_clamped = target_twa.clamp(self.twa[0], twa_last);

        let mut tws_idx0 = 0;
        let mut tws_idx1 = self.tws.len() - 1;
        for i in 0..self.tws.len() - 1 {
            if tws_clamped >= self.tws[i] && tws_clamped <= self.tws[i + 1] {
                tws_idx0 = i;
                tws_idx1 = i + 1;
                break;
            }
        }

        let mut twa_idx0 = 0;
        let mut twa_idx1 = self.twa.len() - 1;
        for i in 0..self.twa.len() - 1 {
            if twa_clamped >= self.twa[i] && twa_clamped <= self.twa[i + 1] {
                twa_idx0 = i;
                twa_idx1 = i + 1;
                break;
            }
        }

        let tws0 = self.tws[tws_idx0];
        let tws1 = self.tws[tws_idx1];
        let twa0 = self.twa[twa_idx0];
        let twa1 = self.twa[twa_idx1];

        let val00 = self.speeds[twa_idx0][tws_idx0];
        let val01 = self.speeds[twa_idx0][tws_idx1];
        let val10 = self.speeds[twa_idx1][tws_idx0];
        let val11 = self.speeds[twa_idx1][tws_idx1];

        let tws_frac = if tws0 == tws1 {
            0.0
        } else {
            (tws_clamped - tws0) / (tws1 - tws0)
        };
        let twa_frac = if twa0 == twa1 {
            0.0
        } else {
            (twa_clamped - twa0) / (twa1 - twa0)
        };

        let val0 = val00 * (1.0 - tws_frac) + val01 * tws_frac;
        let val1 = val10 * (1.0 - tws_frac) + val11 * tws_frac;

        val0 * (1.0 - twa_frac) + val1 * twa_frac
    }
}
