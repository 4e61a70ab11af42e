use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters, used by all great-circle math.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Conversion factor between m/s and knots.
pub const MS_TO_KNOTS: f32 = 1.94384;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Builds a coordinate with latitude clamped to [-90, 90] and longitude
    /// normalized to (-180, 180].
    pub fn new(lat: f64, lon: f64) -> Self {
        let mut lon = lon % 360.0;
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon <= -180.0 {
            lon += 360.0;
        }
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lon,
        }
    }

    /// Initial great-circle bearing from `self` to `other`, degrees true.
    pub fn bearing_to(&self, other: &Coordinate) -> f32 {
        let start_lat = self.lat.to_radians();
        let end_lat = other.lat.to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let y = d_lon.sin() * end_lat.cos();
        let x = start_lat.cos() * end_lat.sin() - start_lat.sin() * end_lat.cos() * d_lon.cos();
        let mut bearing = y.atan2(x).to_degrees() as f32;
        if bearing < 0.0 {
            bearing += 360.0;
        }
        bearing
    }

    /// Haversine great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let start_lat = self.lat.to_radians();
        let end_lat = other.lat.to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + start_lat.cos() * end_lat.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Point reached by travelling `distance_m` meters along `bearing_deg`.
    pub fn destination(&self, distance_m: f64, bearing_deg: f32) -> Coordinate {
        let angular_dist = distance_m / EARTH_RADIUS_M;
        let bearing_rad = (bearing_deg as f64).to_radians();

        let start_lat = self.lat.to_radians();
        let start_lon = self.lon.to_radians();

        let end_lat = (start_lat.sin() * angular_dist.cos()
            + start_lat.cos() * angular_dist.sin() * bearing_rad.cos())
        .asin();

        let end_lon = start_lon
            + (bearing_rad.sin() * angular_dist.sin() * start_lat.cos())
                .atan2(angular_dist.cos() - start_lat.sin() * end_lat.sin());

        Coordinate::new(end_lat.to_degrees(), end_lon.to_degrees())
    }
}

/// Wind at a point, grib-convention components (m/s, u East, v North).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindData {
    pub u: f32,
    pub v: f32,
}

impl WindData {
    pub fn speed(&self) -> f32 {
        (self.u.powi(2) + self.v.powi(2)).sqrt()
    }

    /// Meteorological direction the wind blows FROM, degrees true.
    pub fn direction(&self) -> f32 {
        let angle = self.v.atan2(self.u).to_degrees();
        let mut dir = 270.0 - angle;
        if dir < 0.0 {
            dir += 360.0;
        }
        if dir >= 360.0 {
            dir -= 360.0;
        }
        dir
    }

    pub fn speed_knots(&self) -> f32 {
        self.speed() * MS_TO_KNOTS
    }
}

/// Ocean current at a point, same component convention as [`WindData`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentData {
    pub u: f32,
    pub v: f32,
}

/// Side of the boat the wind strikes on a given leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TackSide {
    Port,
    Starboard,
}

/// Stable index of a [`RouteState`] in its session's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// One reachable position in an isochrone layer.
///
/// Never mutated after creation; the arena retains every node produced during
/// a search so that parent links of later layers always resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteState {
    pub position: Coordinate,
    pub time: DateTime<Utc>,
    /// Seconds since departure.
    pub elapsed: f64,
    /// True heading steered on the leg that reached this state.
    pub heading: f32,
    /// Wind side on the arriving leg; `None` only for the seed node.
    pub tack_side: Option<TackSide>,
    /// Arena index of the state this one was expanded from.
    pub parent: Option<NodeId>,
    /// Cumulative over-ground distance in meters.
    pub distance: f64,
    /// Cumulative tacks and jibes along the path.
    pub tacks: u32,
    /// Whether the arriving leg was made under engine.
    pub motoring: bool,
}

impl RouteState {
    /// The single-node seed every search starts from.
    pub fn seed(position: Coordinate, time: DateTime<Utc>) -> Self {
        Self {
            position,
            time,
            elapsed: 0.0,
            heading: 0.0,
            tack_side: None,
            parent: None,
            distance: 0.0,
            tacks: 0,
            motoring: false,
        }
    }
}

/// Signed true wind angle in (-180, 180]: positive when the wind strikes
/// starboard, negative for port.
pub fn signed_twa(twd: f32, heading: f32) -> f32 {
    let mut twa = twd - heading;
    while twa > 180.0 {
        twa -= 360.0;
    }
    while twa <= -180.0 {
        twa += 360.0;
    }
    twa
}

/// Which side the wind strikes for a boat on `heading` with wind from `twd`.
pub fn wind_side(twd: f32, heading: f32) -> TackSide {
    if signed_twa(twd, heading) >= 0.0 {
        TackSide::Starboard
    } else {
        TackSide::Port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wind_direction_conventions() {
        // GRIB: u > 0 is Eastward, v > 0 is Northward.
        let north_wind = WindData { u: 0.0, v: -5.0 };
        assert_eq!(north_wind.direction(), 0.0);

        let east_wind = WindData { u: -5.0, v: 0.0 };
        assert_eq!(east_wind.direction(), 90.0);

        let south_wind = WindData { u: 0.0, v: 5.0 };
        assert_eq!(south_wind.direction(), 180.0);

        let west_wind = WindData { u: 5.0, v: 0.0 };
        assert_eq!(west_wind.direction(), 270.0);
    }

    #[test]
    fn test_longitude_normalization() {
        assert_eq!(Coordinate::new(45.0, 190.0).lon, -170.0);
        assert_eq!(Coordinate::new(45.0, -190.0).lon, 170.0);
        assert_eq!(Coordinate::new(45.0, 180.0).lon, 180.0);
        assert_eq!(Coordinate::new(95.0, 0.0).lat, 90.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = Coordinate::new(45.0, 0.0);
        let north = Coordinate::new(46.0, 0.0);
        let east = Coordinate::new(45.0, 1.0);
        let south = Coordinate::new(44.0, 0.0);

        assert!((origin.bearing_to(&north) - 0.0).abs() < 0.1);
        assert!((origin.bearing_to(&east) - 90.0).abs() < 1.0);
        assert!((origin.bearing_to(&south) - 180.0).abs() < 0.1);
    }

    #[test]
    fn test_destination_round_trip() {
        let origin = Coordinate::new(48.0, -5.0);
        let dest = origin.destination(50_000.0, 73.0);
        assert!((origin.distance_to(&dest) - 50_000.0).abs() < 1.0);
        assert!((origin.bearing_to(&dest) - 73.0).abs() < 0.1);
    }

    #[test]
    fn test_signed_twa_sides() {
        // Wind from North, heading East: wind strikes port side.
        assert_eq!(signed_twa(0.0, 90.0), -90.0);
        assert_eq!(wind_side(0.0, 90.0), TackSide::Port);
        // Wind from North, heading West: starboard.
        assert_eq!(signed_twa(0.0, 270.0), 90.0);
        assert_eq!(wind_side(0.0, 270.0), TackSide::Starboard);
        // Dead downwind maps onto the starboard half.
        assert_eq!(signed_twa(180.0, 0.0), 180.0);
    }
}
