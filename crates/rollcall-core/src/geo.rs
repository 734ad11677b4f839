//! Great-circle distance and work-mode geofence classification.

use crate::types::{GeoPoint, WorkMode};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Band edges in meters. The lower edge of each band is inclusive:
/// exactly 50 m classifies as "Near", exactly 500 m as "Far".
const AT_BAND_M: f64 = 50.0;
const NEAR_BAND_M: f64 = 500.0;

/// Haversine distance in meters between two points given in degrees.
///
/// Symmetric and zero for identical points. Adequate for sub-kilometer
/// geofencing; malformed coordinates are the caller's responsibility.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let dphi = (b.latitude - a.latitude).to_radians();
    let dlambda = (b.longitude - a.longitude).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Classify a geofence distance into a human-readable status.
///
/// Pure total function: an unknown or absent work mode falls back to the
/// office-labeled thresholds.
pub fn location_status(distance_m: f64, mode: Option<WorkMode>) -> &'static str {
    match mode {
        Some(WorkMode::Home) => {
            if distance_m < AT_BAND_M {
                "At Home"
            } else if distance_m < NEAR_BAND_M {
                "Near Home"
            } else {
                "Far from Home"
            }
        }
        _ => {
            if distance_m < AT_BAND_M {
                "At Office"
            } else if distance_m < NEAR_BAND_M {
                "Near Office"
            } else {
                "Far from Office"
            }
        }
    }
}
