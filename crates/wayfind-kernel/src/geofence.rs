//! Circular geofence test.
//!
//! Great-circle distance via the haversine formula on a spherical Earth.
//! Inputs are not range-checked: out-of-range degrees still produce a finite
//! distance, and NaN anywhere fails closed.
//!
//! ```
//! use wayfind_kernel::geofence::is_within;
//! use wayfind_types::GeoFenceConfig;
//!
//! let fence = GeoFenceConfig::default();
//! assert!(is_within(fence.center, &fence));
//! ```

use wayfind_types::{GeoFenceConfig, GeoPoint};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two fixes, in meters.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal or
    // out-of-range inputs; sqrt(1 - h) would then be NaN.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// `true` when `fix` lies within `config.radius_meters` of the fence center.
pub fn is_within(fix: GeoPoint, config: &GeoFenceConfig) -> bool {
    // NaN compares false, so any NaN input is outside.
    distance_meters(fix, config.center) <= config.radius_meters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn east_of(p: GeoPoint, meters: f64) -> GeoPoint {
        let d_lon = (meters / (EARTH_RADIUS_M * p.latitude.to_radians().cos())).to_degrees();
        GeoPoint::new(p.latitude, p.longitude + d_lon)
    }

    fn north_of(p: GeoPoint, meters: f64) -> GeoPoint {
        GeoPoint::new(p.latitude + (meters / EARTH_RADIUS_M).to_degrees(), p.longitude)
    }

    #[test]
    fn identical_points_are_zero_apart() {
        let p = GeoPoint::new(51.5, -0.12);
        assert_eq!(distance_meters(p, p), 0.0);
        let fence = GeoFenceConfig {
            center: p,
            radius_meters: 0.0,
        };
        assert!(is_within(p, &fence));
    }

    #[test]
    fn reference_fence_center_is_inside() {
        let fence = GeoFenceConfig::default();
        assert!(is_within(fence.center, &fence));
    }

    #[test]
    fn reference_fence_rejects_fix_1000m_east() {
        let fence = GeoFenceConfig::default();
        let fix = east_of(fence.center, 1000.0);
        assert!((distance_meters(fix, fence.center) - 1000.0).abs() < 1.0);
        assert!(!is_within(fix, &fence));
    }

    #[test]
    fn boundary_is_inclusive_within_tolerance() {
        let fence = GeoFenceConfig::default();
        assert!(is_within(north_of(fence.center, 99.0), &fence));
        assert!(!is_within(north_of(fence.center, 101.0), &fence));
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(7.28, 80.62);
        let b = GeoPoint::new(6.93, 79.85);
        assert!((distance_meters(a, b) - distance_meters(b, a)).abs() < 1e-6);
    }

    #[test]
    fn nan_input_fails_closed() {
        let fence = GeoFenceConfig::default();
        assert!(!is_within(GeoPoint::new(f64::NAN, 80.62), &fence));
        assert!(!is_within(GeoPoint::new(7.28, f64::NAN), &fence));
        let nan_radius = GeoFenceConfig {
            radius_meters: f64::NAN,
            ..fence
        };
        assert!(!is_within(fence.center, &nan_radius));
    }

    #[test]
    fn out_of_range_degrees_stay_finite() {
        let d = distance_meters(GeoPoint::new(400.0, -900.0), GeoPoint::new(-95.0, 720.0));
        assert!(d.is_finite());
        assert!(d >= 0.0);
        assert!(d <= std::f64::consts::PI * EARTH_RADIUS_M + 1.0);
    }
}
