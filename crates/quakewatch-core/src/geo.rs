//! Great-circle distance on a spherical Earth.

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two points given in degrees.
///
/// Always finite for finite inputs.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Round a distance to two decimal places for presentation.
pub fn round_km(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: (f64, f64) = (51.5074, -0.1278);
    const PARIS: (f64, f64) = (48.8566, 2.3522);

    #[test]
    fn same_point_is_zero() {
        for (lat, lon) in [LONDON, PARIS, (0.0, 0.0), (-89.9, 179.9)] {
            assert!(distance_km(lat, lon, lat, lon).abs() < 1e-9);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let there = distance_km(LONDON.0, LONDON.1, PARIS.0, PARIS.1);
        let back = distance_km(PARIS.0, PARIS.1, LONDON.0, LONDON.1);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn london_to_paris_fixture() {
        let d = distance_km(LONDON.0, LONDON.1, PARIS.0, PARIS.1);
        assert!((d - 344.0).abs() <= 5.0, "got {d}");
    }

    #[test]
    fn antipodal_points_are_half_circumference() {
        let d = distance_km(0.0, 0.0, 0.0, 180.0);
        let half = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!(d.is_finite());
        assert!((d - half).abs() < 1e-6);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert!((round_km(343.556) - 343.56).abs() < 1e-9);
        assert!((round_km(0.004) - 0.0).abs() < 1e-9);
    }
}
