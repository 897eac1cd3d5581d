//! Coordinate conversions between WGS84 and Web Mercator, plus zoom/resolution math

use geo::{Coord, Point, Rect};

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;
pub const EARTH_MERCATOR_MIN: f64 = -20037508.34;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Ground resolution (map units per pixel) at zoom 0 for 256px tiles
pub const BASE_RESOLUTION: f64 = 156543.03392804097;

const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;
const X_TO_LON_FACTOR: f64 = 180.0 / EARTH_MERCATOR_MAX;
const Y_TO_LAT_FACTOR: f64 = std::f64::consts::PI / EARTH_MERCATOR_MAX;

/// Convert WGS84 (lat, lon) in degrees to Web Mercator (x, y) in meters.
///
/// Latitude is clamped to the valid Web Mercator range.
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lon * LON_TO_X_FACTOR;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;
    Point::new(x, y)
}

/// Convert Web Mercator (x, y) in meters to WGS84 (lat, lon) in degrees
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = x * X_TO_LON_FACTOR;
    let lat =
        (std::f64::consts::PI / 2.0 - 2.0 * ((-y * Y_TO_LAT_FACTOR).exp()).atan()).to_degrees();
    (lat, lon)
}

/// Convert a Web Mercator extent to a WGS84 extent (x = lon, y = lat)
pub fn mercator_rect_to_wgs84(extent: &Rect<f64>) -> Rect<f64> {
    let (south, west) = mercator_to_wgs84(extent.min().x, extent.min().y);
    let (north, east) = mercator_to_wgs84(extent.max().x, extent.max().y);
    Rect::new(Coord { x: west, y: south }, Coord { x: east, y: north })
}

/// Map units per screen pixel at the given zoom level.
///
/// Strictly monotonically decreasing in zoom over the supported range.
#[inline(always)]
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    BASE_RESOLUTION / 2f64.powf(zoom)
}

/// Scale an extent around its center by the given factor
pub fn scale_rect(extent: &Rect<f64>, factor: f64) -> Rect<f64> {
    let center = extent.center();
    let half_w = extent.width() * factor / 2.0;
    let half_h = extent.height() * factor / 2.0;
    Rect::new(
        Coord {
            x: center.x - half_w,
            y: center.y - half_h,
        },
        Coord {
            x: center.x + half_w,
            y: center.y + half_h,
        },
    )
}

/// Whether `outer` fully contains `inner` (closed-interval comparison)
pub fn rect_contains_rect(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    outer.min().x <= inner.min().x
        && outer.min().y <= inner.min().y
        && outer.max().x >= inner.max().x
        && outer.max().y >= inner.max().y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_to_mercator_origin() {
        let point = wgs84_to_mercator(0.0, 0.0);
        assert!((point.x() - 0.0).abs() < 0.01);
        assert!((point.y() - 0.0).abs() < 0.01);
    }

    #[test]
    fn test_mercator_roundtrip() {
        let lat = 37.7749;
        let lon = -122.4194;
        let mercator = wgs84_to_mercator(lat, lon);
        let (lat2, lon2) = mercator_to_wgs84(mercator.x(), mercator.y());
        assert!((lat - lat2).abs() < 0.0001);
        assert!((lon - lon2).abs() < 0.0001);
    }

    #[test]
    fn test_resolution_monotonic_in_zoom() {
        let mut prev = f64::INFINITY;
        for zoom in 0..=20 {
            let res = resolution_for_zoom(zoom as f64);
            assert!(res < prev, "resolution must strictly decrease with zoom");
            prev = res;
        }
    }

    #[test]
    fn test_scale_rect_preserves_center() {
        let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 40.0 });
        let scaled = scale_rect(&rect, 1.5);
        assert_eq!(scaled.center(), rect.center());
        assert!((scaled.width() - 150.0).abs() < 1e-9);
        assert!((scaled.height() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_rect_containment() {
        let outer = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
        let inner = Rect::new(Coord { x: 2.0, y: 2.0 }, Coord { x: 8.0, y: 8.0 });
        let straddling = Rect::new(Coord { x: 5.0, y: 5.0 }, Coord { x: 15.0, y: 8.0 });
        assert!(rect_contains_rect(&outer, &inner));
        assert!(rect_contains_rect(&outer, &outer));
        assert!(!rect_contains_rect(&outer, &straddling));
        assert!(!rect_contains_rect(&inner, &outer));
    }
}
