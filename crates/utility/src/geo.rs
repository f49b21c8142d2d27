use std::f64::consts::PI;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

fn to_radians(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

fn to_degrees(radians: f64) -> f64 {
    radians * 180.0 / PI
}

/// Axis aligned bounds around a circle of `radius_km`, returned as
/// `((min_lat, min_lon), (max_lat, max_lon))`.
pub fn calculate_bounding_box(
    lat: f64,
    lon: f64,
    radius_km: f64,
) -> ((f64, f64), (f64, f64)) {
    let lat_rad = to_radians(lat);
    let lon_rad = to_radians(lon);

    // Latitude bounds
    let min_lat = lat_rad - radius_km / EARTH_RADIUS_KM;
    let max_lat = lat_rad + radius_km / EARTH_RADIUS_KM;

    // Longitude bounds (adjusted by latitude)
    let min_lon = lon_rad - radius_km / (EARTH_RADIUS_KM * lat_rad.cos());
    let max_lon = lon_rad + radius_km / (EARTH_RADIUS_KM * lat_rad.cos());

    (
        (to_degrees(min_lat), to_degrees(min_lon)),
        (to_degrees(max_lat), to_degrees(max_lon)),
    )
}

pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && (-90.0..=90.0).contains(&lat)
}

/// Wraps a longitude into `[-180, 180)`.
pub fn wrap_longitude(lng: f64) -> f64 {
    ((lng + 180.0) % 360.0 + 360.0) % 360.0 - 180.0
}

/// Web mercator projection into the unit square. `x` grows eastwards,
/// `y` grows southwards.
pub mod mercator {
    use std::f64::consts::PI;

    pub fn lng_to_x(lng: f64) -> f64 {
        lng / 360.0 + 0.5
    }

    pub fn lat_to_y(lat: f64) -> f64 {
        let sin = (lat * PI / 180.0).sin();
        let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
        y.clamp(0.0, 1.0)
    }

    pub fn x_to_lng(x: f64) -> f64 {
        (x - 0.5) * 360.0
    }

    pub fn y_to_lat(y: f64) -> f64 {
        let y2 = (180.0 - y * 360.0) * PI / 180.0;
        360.0 * y2.exp().atan() / PI - 90.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_contains_center() {
        let ((min_lat, min_lon), (max_lat, max_lon)) =
            calculate_bounding_box(48.0, 11.0, 1.0);
        assert!(min_lat < 48.0 && 48.0 < max_lat);
        assert!(min_lon < 11.0 && 11.0 < max_lon);
    }

    #[test]
    fn wraps_longitudes() {
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(10.0), 10.0);
    }

    #[test]
    fn mercator_inverts() {
        for (lat, lng) in [(0.0, 0.0), (52.5, 13.4), (-33.9, 151.2)] {
            let back_lat = mercator::y_to_lat(mercator::lat_to_y(lat));
            let back_lng = mercator::x_to_lng(mercator::lng_to_x(lng));
            assert!((back_lat - lat).abs() < 1e-9);
            assert!((back_lng - lng).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        assert!(is_valid_coordinate(45.0, 7.0));
        assert!(!is_valid_coordinate(91.0, 7.0));
        assert!(!is_valid_coordinate(f64::NAN, 7.0));
    }
}
