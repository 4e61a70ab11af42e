use std::io::BufReader;
use std::path::Path;

use log::info;
use roaring::RoaringTreemap;
use xz2::read::XzDecoder;

use crate::engine::models::Coordinate;
use crate::error::RoutingError;

// GSHHG-derived global grid, 15 arc-second cells.
pub const NX: u64 = 86400;
pub const NY: u64 = 43200;

/// Gridded land mask backed by a roaring bitmap.
pub struct LandMask {
    mask: RoaringTreemap,
}

impl LandMask {
    /// Empty mask: all water.
    pub fn new() -> Self {
        Self {
            mask: RoaringTreemap::new(),
        }
    }

    /// Loads a serialized mask from an xz-compressed treemap file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RoutingError> {
        let path = path.as_ref();
        info!("Loading land mask from {:?}", path);

        let file = std::fs::File::open(path)?;
        let decoder = XzDecoder::new(BufReader::new(file));
        let mask = RoaringTreemap::deserialize_from(decoder)
            .map_err(|e| RoutingError::MaskLoad(format!("{path:?}: {e}")))?;

        info!("Land mask loaded, {} cells set", mask.len());
        Ok(Self { mask })
    }

    fn coords_to_indices(lon: f64, lat: f64) -> (u64, u64) {
        // Affine transform: sa = 240, sc = 43200, se = 240, sf = 21600
        let x = (lon * 240.0 + 43200.0) as u64;
        let y = (lat * 240.0 + 21600.0) as u64;
        (x.clamp(0, NX - 1), y.clamp(0, NY - 1))
    }

    /// Marks a rectangular box of cells as land (for tests and user zones).
    pub fn add_land_box(&mut self, min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) {
        let (min_x, min_y) = Self::coords_to_indices(min_lon, min_lat);
        let (max_x, max_y) = Self::coords_to_indices(max_lon, max_lat);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                self.mask.insert(y * NX + x);
            }
        }
    }

    pub fn is_land(&self, coord: &Coordinate) -> bool {
        let (x, y) = Self::coords_to_indices(coord.lon, coord.lat);
        self.mask.contains(y * NX + x)
    }
}

impl Default for LandMask {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mask_is_all_water() {
        let mask = LandMask::new();
        assert!(!mask.is_land(&Coordinate::new(48.85, 2.35)));
    }

    #[test]
    fn test_land_box_classification() {
        let mut mask = LandMask::new();
        mask.add_land_box(-1.6, -1.0, 50.6, 50.8);

        assert!(mask.is_land(&Coordinate::new(50.7, -1.3)));
        assert!(!mask.is_land(&Coordinate::new(50.4, -1.3)));
        assert!(!mask.is_land(&Coordinate::new(50.7, -2.0)));
    }
}
