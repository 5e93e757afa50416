//! Distances, bearings and Web Mercator conversion.

use crate::feature::Position;
use kurbo::Point;
use std::f64::consts::PI;

/// Mean earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Sphere radius of the Web Mercator projection (EPSG:3857).
pub const WEB_MERCATOR_RADIUS_M: f64 = 6378137.0;

/// Latitude limit of the Web Mercator projection.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Planar distance between two pixel points.
pub fn cartesian_distance(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Great-circle distance in kilometers.
pub fn haversine_distance_km(from: Position, to: Position) -> f64 {
    let d_lat = (to[1] - from[1]).to_radians();
    let d_lng = (to[0] - from[0]).to_radians();
    let lat1 = from[1].to_radians();
    let lat2 = to[1].to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + (d_lng / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    2.0 * a.sqrt().atan2((1.0 - a).sqrt()) * EARTH_RADIUS_KM
}

/// Initial bearing from `from` to `to` in degrees, in the range (-180, 180].
pub fn bearing(from: Position, to: Position) -> f64 {
    let lng1 = from[0].to_radians();
    let lng2 = to[0].to_radians();
    let lat1 = from[1].to_radians();
    let lat2 = to[1].to_radians();

    let y = (lng2 - lng1).sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * (lng2 - lng1).cos();
    y.atan2(x).to_degrees()
}

/// The position reached by travelling `distance_km` from `origin` along
/// `bearing_deg`.
pub fn destination(origin: Position, distance_km: f64, bearing_deg: f64) -> Position {
    let lng1 = origin[0].to_radians();
    let lat1 = origin[1].to_radians();
    let bearing = bearing_deg.to_radians();
    let radians = distance_km / EARTH_RADIUS_KM;

    let lat2 = (lat1.sin() * radians.cos() + lat1.cos() * radians.sin() * bearing.cos()).asin();
    let lng2 = lng1
        + (bearing.sin() * radians.sin() * lat1.cos()).atan2(radians.cos() - lat1.sin() * lat2.sin());

    [lng2.to_degrees(), lat2.to_degrees()]
}

/// Project longitude/latitude to Web Mercator meters.
pub fn lng_lat_to_web_mercator(position: Position) -> Point {
    let lat = position[1].clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = position[0].to_radians() * WEB_MERCATOR_RADIUS_M;
    let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * WEB_MERCATOR_RADIUS_M;
    Point::new(x, y)
}

/// Inverse of [`lng_lat_to_web_mercator`].
pub fn web_mercator_to_lng_lat(point: Point) -> Position {
    let lng = (point.x / WEB_MERCATOR_RADIUS_M).to_degrees();
    let lat = (2.0 * (point.y / WEB_MERCATOR_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    [lng, lat]
}

/// Midpoint of two positions measured in Web Mercator space, which is where
/// the midpoint appears on a flat map.
pub fn web_mercator_midpoint(a: Position, b: Position) -> Position {
    let pa = lng_lat_to_web_mercator(a);
    let pb = lng_lat_to_web_mercator(b);
    web_mercator_to_lng_lat(pa.midpoint(pb))
}
