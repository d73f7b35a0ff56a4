//! Geographic calculations

use crate::types::Coordinates;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Road distance coefficient (straight line to road)
pub const ROAD_COEFFICIENT: f64 = 1.3;

/// Squared Euclidean distance on raw (lat, lng) values.
///
/// Used for clustering only: coordinates are treated as plain reals.
pub fn squared_distance(a: &Coordinates, b: &Coordinates) -> f64 {
    let d_lat = a.lat - b.lat;
    let d_lng = a.lng - b.lng;
    d_lat * d_lat + d_lng * d_lng
}

/// Arithmetic mean of a set of coordinates, `None` when empty
pub fn mean<'a, I>(coords: I) -> Option<Coordinates>
where
    I: IntoIterator<Item = &'a Coordinates>,
{
    let (sum_lat, sum_lng, count) = coords
        .into_iter()
        .fold((0.0, 0.0, 0usize), |(lat, lng, n), c| (lat + c.lat, lng + c.lng, n + 1));

    if count == 0 {
        return None;
    }

    Some(Coordinates {
        lat: sum_lat / count as f64,
        lng: sum_lng / count as f64,
    })
}

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Estimate road distance from straight-line distance
pub fn road_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    haversine_distance(from, to) * ROAD_COEFFICIENT
}

/// Estimated road length of a polyline in kilometers
pub fn path_road_distance(path: &[Coordinates]) -> f64 {
    path.windows(2).map(|leg| road_distance(&leg[0], &leg[1])).sum()
}
