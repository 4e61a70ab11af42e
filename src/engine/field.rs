use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::engine::models::{Coordinate, CurrentData, WindData};

/// Wind and current at one queried point and time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvSample {
    pub wind: WindData,
    pub current: CurrentData,
}

/// Raised when a query falls outside the loaded forecast coverage.
/// Callers treat the queried position as unreachable, never as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("no forecast coverage at the queried point/time")]
    OutsideCoverage,
}

/// One forecast validity time over the shared lattice.
#[derive(Debug, Clone)]
pub struct FieldSlice {
    pub valid_time: DateTime<Utc>,
    /// Row-major `nlat * nlon`, row = latitude index.
    pub wind: Vec<WindData>,
    pub current: Vec<CurrentData>,
}

/// Regular lat/lon lattice describing where slice samples live.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub lat0: f64,
    pub lon0: f64,
    pub dlat: f64,
    pub dlon: f64,
    pub nlat: usize,
    pub nlon: usize,
}

/// Queryable wind/current field.
///
/// Grid variants interpolate bilinearly in space and linearly in time between
/// the two bracketing forecast slices; an externally decoded grib record-set
/// is loaded through [`VectorField::from_grid`]. The uniform variant exists
/// for synthetic scenarios and tests.
#[derive(Debug, Clone)]
pub enum VectorField {
    Uniform { wind: WindData, current: CurrentData },
    Grid { spec: GridSpec, slices: Vec<FieldSlice> },
}

impl VectorField {
    /// Field with the same wind and current everywhere, valid at all times.
    pub fn uniform(wind: WindData, current: CurrentData) -> Self {
        Self::Uniform { wind, current }
    }

    pub fn calm() -> Self {
        Self::uniform(WindData { u: 0.0, v: 0.0 }, CurrentData { u: 0.0, v: 0.0 })
    }

    /// Builds a gridded field from decoded forecast slices. Slices must share
    /// the lattice shape; they are sorted by validity time here.
    pub fn from_grid(spec: GridSpec, mut slices: Vec<FieldSlice>) -> Self {
        slices.sort_by_key(|s| s.valid_time);
        Self::Grid { spec, slices }
    }

    /// Samples wind and current at `point` and `time`.
    pub fn sample(&self, point: &Coordinate, time: DateTime<Utc>) -> Result<EnvSample, FieldError> {
        match self {
            Self::Uniform { wind, current } => Ok(EnvSample {
                wind: *wind,
                current: *current,
            }),
            Self::Grid { spec, slices } => {
                if slices.is_empty() {
                    return Err(FieldError::OutsideCoverage);
                }
                let first = slices[0].valid_time;
                let last = slices[slices.len() - 1].valid_time;
                if time < first || time > last {
                    return Err(FieldError::OutsideCoverage);
                }

                // Bracketing slices for temporal interpolation.
                let hi = slices.partition_point(|s| s.valid_time <= time);
                if hi == 0 {
                    return Err(FieldError::OutsideCoverage);
                }
                let lo_slice = &slices[hi - 1];
                if hi == slices.len() || lo_slice.valid_time == time {
                    return Self::sample_slice(spec, lo_slice, point);
                }
                let hi_slice = &slices[hi];

                let span = (hi_slice.valid_time - lo_slice.valid_time).num_seconds() as f32;
                let frac = if span <= 0.0 {
                    0.0
                } else {
                    (time - lo_slice.valid_time).num_seconds() as f32 / span
                };

                let a = Self::sample_slice(spec, lo_slice, point)?;
                let b = Self::sample_slice(spec, hi_slice, point)?;
                Ok(EnvSample {
                    wind: WindData {
                        u: a.wind.u * (1.0 - frac) + b.wind.u * frac,
                        v: a.wind.v * (1.0 - frac) + b.wind.v * frac,
                    },
                    current: CurrentData {
                        u: a.current.u * (1.0 - frac) + b.current.u * frac,
                        v: a.current.v * (1.0 - frac) + b.current.v * frac,
                    },
                })
            }
        }
    }

    /// Bilinear interpolation inside one slice.
    fn sample_slice(
        spec: &GridSpec,
        slice: &FieldSlice,
        point: &Coordinate,
    ) -> Result<EnvSample, FieldError> {
        let fx = (point.lon - spec.lon0) / spec.dlon;
        let fy = (point.lat - spec.lat0) / spec.dlat;
        if fx < 0.0 || fy < 0.0 {
            return Err(FieldError::OutsideCoverage);
        }

        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        if x0 + 1 >= spec.nlon || y0 + 1 >= spec.nlat {
            // Allow queries exactly on the far edge of the lattice.
            if fx > (spec.nlon - 1) as f64 || fy > (spec.nlat - 1) as f64 {
                return Err(FieldError::OutsideCoverage);
            }
        }
        let x1 = (x0 + 1).min(spec.nlon - 1);
        let y1 = (y0 + 1).min(spec.nlat - 1);
        let tx = (fx - x0 as f64) as f32;
        let ty = (fy - y0 as f64) as f32;

        let at = |y: usize, x: usize| y * spec.nlon + x;
        let idx = [at(y0, x0), at(y0, x1), at(y1, x0), at(y1, x1)];
        if idx[3] >= slice.wind.len() || idx[3] >= slice.current.len() {
            return Err(FieldError::OutsideCoverage);
        }

        let w = [1.0 - tx, tx];
        let h = [1.0 - ty, ty];
        let mut wind = WindData { u: 0.0, v: 0.0 };
        let mut current = CurrentData { u: 0.0, v: 0.0 };
        for (i, &id) in idx.iter().enumerate() {
            let weight = w[i % 2] * h[i / 2];
            wind.u += slice.wind[id].u * weight;
            wind.v += slice.wind[id].v * weight;
            current.u += slice.current[id].u * weight;
            current.v += slice.current[id].v * weight;
        }
        Ok(EnvSample { wind, current })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn grid_spec() -> GridSpec {
        GridSpec {
            lat0: 40.0,
            lon0: -10.0,
            dlat: 1.0,
            dlon: 1.0,
            nlat: 3,
            nlon: 3,
        }
    }

    fn slice_with_uniform(u: f32, time: DateTime<Utc>) -> FieldSlice {
        FieldSlice {
            valid_time: time,
            wind: vec![WindData { u, v: 0.0 }; 9],
            current: vec![CurrentData { u: 0.0, v: 0.0 }; 9],
        }
    }

    #[test]
    fn test_uniform_field_always_covered() {
        let field = VectorField::uniform(
            WindData { u: 3.0, v: 4.0 },
            CurrentData { u: 0.5, v: 0.0 },
        );
        let s = field
            .sample(&Coordinate::new(0.0, 0.0), Utc::now())
            .unwrap();
        assert_eq!(s.wind.speed(), 5.0);
        assert_eq!(s.current.u, 0.5);
    }

    #[test]
    fn test_grid_spatial_interpolation() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut slice = slice_with_uniform(0.0, t);
        // West column 0 m/s, east column 2 m/s, linear in between.
        for y in 0..3 {
            slice.wind[y * 3 + 2].u = 2.0;
            slice.wind[y * 3 + 1].u = 1.0;
        }
        let field = VectorField::from_grid(grid_spec(), vec![slice]);

        let mid = field.sample(&Coordinate::new(41.0, -8.5), t).unwrap();
        assert!((mid.wind.u - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_grid_temporal_interpolation() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let field = VectorField::from_grid(
            grid_spec(),
            vec![slice_with_uniform(0.0, t0), slice_with_uniform(6.0, t1)],
        );

        let half = Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap();
        let s = field.sample(&Coordinate::new(41.0, -9.0), half).unwrap();
        assert!((s.wind.u - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_outside_coverage() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let field = VectorField::from_grid(grid_spec(), vec![slice_with_uniform(1.0, t)]);

        // Spatially outside the lattice.
        assert_eq!(
            field.sample(&Coordinate::new(50.0, -9.0), t),
            Err(FieldError::OutsideCoverage)
        );
        // Before the first validity time.
        let early = Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap();
        assert_eq!(
            field.sample(&Coordinate::new(41.0, -9.0), early),
            Err(FieldError::OutsideCoverage)
        );
    }
}
