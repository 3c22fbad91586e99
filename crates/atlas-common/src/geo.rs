//! Geographic primitives.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters, as used for spherical distances.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A (longitude, latitude) pair in WGS84 degrees.
///
/// Serialized as a two element array `[lon, lat]`, the GeoJSON order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Great-circle distance to another point in meters.
    pub fn distance_to(&self, other: &LonLat) -> f64 {
        haversine_distance(self.lon, self.lat, other.lon, other.lat)
    }
}

impl From<[f64; 2]> for LonLat {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<LonLat> for [f64; 2] {
    fn from(p: LonLat) -> Self {
        [p.lon, p.lat]
    }
}

/// Calculate the Haversine distance between two points in meters.
pub fn haversine_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.min(1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// A closed polygon ring. The first and last coordinates are identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    ring: Vec<LonLat>,
}

impl Polygon {
    /// Build a polygon from a ring, closing it if the caller did not.
    pub fn from_ring(mut ring: Vec<LonLat>) -> Self {
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
            if first != last {
                ring.push(first);
            }
        }
        Self { ring }
    }

    pub fn ring(&self) -> &[LonLat] {
        &self.ring
    }

    /// Whether `point` lies inside the ring or on its boundary.
    ///
    /// Edges are treated as straight lines in lon/lat space.
    pub fn intersects_point(&self, point: &LonLat) -> bool {
        if self.ring.len() < 4 {
            return false;
        }

        let mut inside = false;
        for edge in self.ring.windows(2) {
            let (a, b) = (edge[0], edge[1]);

            if on_segment(&a, &b, point) {
                return true;
            }

            if (a.lat > point.lat) != (b.lat > point.lat) {
                let cross_lon = a.lon + (point.lat - a.lat) * (b.lon - a.lon) / (b.lat - a.lat);
                if point.lon < cross_lon {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

fn on_segment(a: &LonLat, b: &LonLat, p: &LonLat) -> bool {
    let cross = (b.lon - a.lon) * (p.lat - a.lat) - (b.lat - a.lat) * (p.lon - a.lon);
    if cross.abs() > 1e-12 {
        return false;
    }
    p.lon >= a.lon.min(b.lon)
        && p.lon <= a.lon.max(b.lon)
        && p.lat >= a.lat.min(b.lat)
        && p.lat <= a.lat.max(b.lat)
}
