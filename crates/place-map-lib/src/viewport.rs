//! The visible map extent plus zoom and derived resolution

use crate::utils;
use geo::Rect;

/// The currently visible map extent with its zoom level.
///
/// Resolution (map units per pixel) is derived from zoom and is strictly
/// monotonic over the supported zoom range, so zoom and resolution can be
/// used interchangeably as a scale signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Visible extent in Web Mercator map units
    pub extent: Rect<f64>,
    /// Map zoom level (fractional zoom is allowed)
    pub zoom: f64,
}

impl Viewport {
    pub fn new(extent: Rect<f64>, zoom: f64) -> Self {
        Self { extent, zoom }
    }

    /// Map units per screen pixel at this zoom level
    #[inline]
    pub fn resolution(&self) -> f64 {
        utils::resolution_for_zoom(self.zoom)
    }

    /// Area of the visible extent in square map units
    #[inline]
    pub fn area(&self) -> f64 {
        self.extent.width() * self.extent.height()
    }

    /// The extent grown around its center by `factor` (fetches are padded
    /// so small pans do not immediately require a refetch)
    pub fn padded_extent(&self, factor: f64) -> Rect<f64> {
        utils::scale_rect(&self.extent, factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn viewport(zoom: f64) -> Viewport {
        Viewport::new(
            Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1000.0, y: 500.0 }),
            zoom,
        )
    }

    #[test]
    fn test_area() {
        assert!((viewport(10.0).area() - 500_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_resolution_tracks_zoom() {
        assert!(viewport(8.0).resolution() > viewport(9.0).resolution());
        // Zoom 11 is the first level finer than the clustering cutoff of 76.
        assert!(viewport(11.0).resolution() < 76.5);
        assert!(viewport(10.0).resolution() > 76.5);
    }

    #[test]
    fn test_padded_extent() {
        let padded = viewport(10.0).padded_extent(1.5);
        assert!((padded.width() - 1500.0).abs() < 1e-9);
        assert!((padded.height() - 750.0).abs() < 1e-9);
        assert_eq!(padded.center(), viewport(10.0).extent.center());
    }
}
