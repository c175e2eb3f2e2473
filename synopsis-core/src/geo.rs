//! Geodesic and Kinematic Primitives
//!
//! Pure functions over WGS84 lon/lat coordinates: great-circle distance,
//! azimuth, angular differences and the instantaneous rates derived from
//! consecutive observations. No state, no I/O.

use std::f64::consts::PI;

use crate::observation::Observation;

/// Approximate Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// One nautical mile in meters
pub const NAUTICAL_MILE: f64 = 1852.0;

/// Tolerance when comparing coordinates or speeds
pub const EPSILON: f64 = 1e-6;

/// Sentinel returned by [`azimuth`] when the two points coincide
pub const NO_HEADING: f64 = -1.0;

/// Speed in knots covered by `distance_m` meters over `elapsed_s` seconds
#[inline]
pub fn speed_knots(distance_m: f64, elapsed_s: i64) -> f64 {
    (3600.0 * distance_m) / (NAUTICAL_MILE * elapsed_s as f64)
}

/// Great-circle distance in meters between two lon/lat points.
///
/// Spherical law of cosines: both points are mapped to unit vectors and the
/// central angle is recovered from their dot product. Coincident points (both
/// coordinate deltas below [`EPSILON`]) short-circuit to zero so the `acos`
/// never sees rounding garbage.
pub fn haversine_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    if (lon1 - lon2).abs() < EPSILON && (lat1 - lat2).abs() < EPSILON {
        return 0.0;
    }

    let lat1 = lat1.to_radians();
    let lon1 = lon1.to_radians();
    let lat2 = lat2.to_radians();
    let lon2 = lon2.to_radians();

    let x1 = lat1.cos() * lon1.cos();
    let y1 = lat1.cos() * lon1.sin();
    let z1 = lat1.sin();

    let x2 = lat2.cos() * lon2.cos();
    let y2 = lat2.cos() * lon2.sin();
    let z2 = lat2.sin();

    let dot = (x1 * x2 + y1 * y2 + z1 * z2).clamp(-1.0, 1.0);

    EARTH_RADIUS_M * dot.acos()
}

/// Azimuth in degrees `[0, 360)` from `(x1, y1)` to `(x2, y2)`.
///
/// `x` is longitude, `y` is latitude. Returns [`NO_HEADING`] for zero
/// displacement. The four cardinal directions are resolved by quadrant
/// before any `atan`, so the slope ratio never divides by zero.
pub fn azimuth(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;

    let angle = if dx == 0.0 {
        if dy > 0.0 {
            0.0 // northbound
        } else if dy < 0.0 {
            PI // southbound
        } else {
            return NO_HEADING; // stationary
        }
    } else if dy == 0.0 {
        if dx > 0.0 {
            PI / 2.0 // eastbound
        } else {
            3.0 * PI / 2.0 // westbound
        }
    } else {
        let slope = (dx / dy).abs().atan();
        if dx > 0.0 {
            if dy > 0.0 {
                slope // NE quadrant
            } else {
                PI - slope // SE quadrant
            }
        } else if dy > 0.0 {
            2.0 * PI - slope // NW quadrant
        } else {
            PI + slope // SW quadrant
        }
    };

    angle.to_degrees()
}

/// Angular difference in degrees between two headings, in `[0, 180]`
pub fn angle_difference(heading1: f64, heading2: f64) -> f64 {
    let phi = (heading1 - heading2).abs() % 360.0;
    if phi > 180.0 {
        360.0 - phi
    } else {
        phi
    }
}

/// Signed slope difference between two headings in the trigonometric cycle,
/// in `[-180, 180]`. Summed pairwise over a window this yields the
/// accumulated heading drift.
#[inline]
pub fn slope_difference(heading1: f64, heading2: f64) -> f64 {
    180.0 - (180.0 - (heading2 - heading1)).abs()
}

/// Acceleration (positive) or deceleration (negative) over ground in
/// knots per hour. Speeds and elapsed time must already be set on both
/// observations. Zero when no time has elapsed.
pub fn rate_of_change_knots(old: &Observation, new: &Observation) -> f64 {
    if new.time_elapsed > 0 {
        (3600.0 * (new.speed - old.speed)) / new.time_elapsed as f64
    } else {
        0.0
    }
}

/// Rate of turn in degrees per second between two observations: the heading
/// delta `to - from` normalized into `[-180, 180]`, over the elapsed time
/// recorded on `to`. The sign follows the direction of the turn.
pub fn rate_of_turn(from: &Observation, to: &Observation) -> f64 {
    let delta = to.heading - from.heading;
    let phi = ((delta + 180.0) % 360.0 + 360.0) % 360.0 - 180.0;
    phi / to.time_elapsed as f64
}
