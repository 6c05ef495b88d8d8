use serde::{Deserialize, Serialize};

use crate::EARTH_RADIUS_M;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLong {
    pub lat: f64,
    pub lon: f64,
}

impl LatLong {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance in metres (haversine)
pub fn distance_m(a: LatLong, b: LatLong) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Projects `p` onto the segment `a`-`b`.
///
/// Works on a local equirectangular plane centred on `a`, which is plenty for
/// the few hundred metres a route segment spans. Returns the fraction along
/// the segment (clamped to `[0, 1]`) and the distance from `p` to the
/// projected point in metres.
pub fn project_on_segment(p: LatLong, a: LatLong, b: LatLong) -> (f64, f64) {
    let cos_lat = a.lat.to_radians().cos();
    let to_xy = |q: LatLong| {
        (
            (q.lon - a.lon).to_radians() * cos_lat * EARTH_RADIUS_M,
            (q.lat - a.lat).to_radians() * EARTH_RADIUS_M,
        )
    };

    let (bx, by) = to_xy(b);
    let (px, py) = to_xy(p);
    let len_sq = bx * bx + by * by;

    let fraction = if len_sq == 0.0 {
        0.0
    } else {
        ((px * bx + py * by) / len_sq).clamp(0.0, 1.0)
    };

    let dx = px - fraction * bx;
    let dy = py - fraction * by;
    (fraction, (dx * dx + dy * dy).sqrt())
}

/// Linear interpolation between two coordinates
pub fn interpolate(a: LatLong, b: LatLong, fraction: f64) -> LatLong {
    LatLong {
        lat: a.lat + (b.lat - a.lat) * fraction,
        lon: a.lon + (b.lon - a.lon) * fraction,
    }
}
