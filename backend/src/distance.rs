use crate::models::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Length of a polyline, summed segment by segment.
pub fn path_length_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|pair| haversine_km(pair[0], pair[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinate { lat: 45.0, lon: 5.0 };
        assert_eq!(haversine_km(point, point), 0.0);
    }

    #[test]
    fn test_haversine_symmetry() {
        let a = Coordinate { lat: 45.0, lon: 5.0 };
        let b = Coordinate { lat: 46.0, lon: 6.0 };
        assert_eq!(haversine_km(a, b), haversine_km(b, a));
    }

    #[test]
    fn test_haversine_known_distance() {
        // Paris to London, roughly 343 km
        let paris = Coordinate { lat: 48.8566, lon: 2.3522 };
        let london = Coordinate { lat: 51.5074, lon: -0.1278 };
        assert!((haversine_km(paris, london) - 343.0).abs() < 5.0);
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let a = Coordinate { lat: 0.0, lon: 0.0 };
        let b = Coordinate { lat: 1.0, lon: 0.0 };
        assert!((haversine_km(a, b) - 111.19).abs() < 0.1);
    }

    #[test]
    fn test_path_length_of_short_paths_is_zero() {
        assert_eq!(path_length_km(&[]), 0.0);
        assert_eq!(path_length_km(&[Coordinate { lat: 45.0, lon: 5.0 }]), 0.0);
    }

    #[test]
    fn test_path_length_sums_segments() {
        let path = [
            Coordinate { lat: 0.0, lon: 0.0 },
            Coordinate { lat: 1.0, lon: 0.0 },
            Coordinate { lat: 2.0, lon: 0.0 },
        ];
        assert!((path_length_km(&path) - 2.0 * 111.19).abs() < 0.2);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_coord() -> impl Strategy<Value = Coordinate> {
            (-90.0..=90.0, -180.0..=180.0).prop_map(|(lat, lon)| Coordinate { lat, lon })
        }

        proptest! {
            #[test]
            fn prop_haversine_non_negative(a in valid_coord(), b in valid_coord()) {
                prop_assert!(haversine_km(a, b) >= 0.0);
            }

            #[test]
            fn prop_haversine_symmetric(a in valid_coord(), b in valid_coord()) {
                prop_assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
            }

            #[test]
            fn prop_haversine_bounded_by_half_earth_circumference(
                a in valid_coord(),
                b in valid_coord()
            ) {
                let max_distance = std::f64::consts::PI * EARTH_RADIUS_KM;
                prop_assert!(haversine_km(a, b) <= max_distance + 0.1);
            }

            #[test]
            fn prop_haversine_triangle_inequality(
                a in valid_coord(),
                b in valid_coord(),
                c in valid_coord()
            ) {
                let dist_ab = haversine_km(a, b);
                let dist_bc = haversine_km(b, c);
                let dist_ac = haversine_km(a, c);
                prop_assert!(dist_ac <= dist_ab + dist_bc + 1e-6);
            }

            #[test]
            fn prop_path_is_never_shorter_than_its_chord(
                path in prop::collection::vec(valid_coord(), 2..20)
            ) {
                let chord = haversine_km(path[0], path[path.len() - 1]);
                prop_assert!(path_length_km(&path) >= chord - 1e-6);
            }
        }
    }
}
