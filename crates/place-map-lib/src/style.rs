//! Visual weight computation: opacity and stroke width as a function of a
//! feature's size relative to the visible viewport
//!
//! Features comparable in size to the viewport recede (low fill alpha,
//! faint outline) so smaller features stay legible; tiny features get full
//! fill and thin strokes. Lines keep a fixed style; points are handled by
//! selection/cluster styling instead.

use crate::feature::{Geometry, Style};
use crate::viewport::Viewport;

/// Fraction of the viewport area covered by the feature, capped at 1
fn area_ratio(geometry: &Geometry, viewport: &Viewport) -> f64 {
    let viewed = viewport.area();
    if viewed <= 0.0 {
        return 1.0;
    }
    (geometry.area() / viewed).min(1.0)
}

/// Compute the base (unselected) style for a geometry in the given viewport.
///
/// Returns `None` for points, which this function does not affect.
pub fn base_style(geometry: &Geometry, viewport: &Viewport) -> Option<Style> {
    match geometry {
        Geometry::Point(_) => None,
        Geometry::Polygon(_) => {
            let ratio = area_ratio(geometry, viewport);
            Some(Style {
                fill_opacity: Some(0.5 - 0.5 * ratio),
                stroke_opacity: 1.0 - ratio,
                stroke_width: (15.0 * ratio).max(2.0),
                label_suppressed: true,
            })
        }
        // Lines keep a fixed style; the length-ratio formula is
        // intentionally not applied.
        Geometry::Line(_) => Some(Style {
            fill_opacity: None,
            stroke_opacity: 0.5,
            stroke_width: 2.0,
            label_suppressed: true,
        }),
    }
}

/// Compute the selected-feature style.
///
/// Same area-ratio logic as [`base_style`] but floored so a selection never
/// fully disappears regardless of its size.
pub fn selected_style(geometry: &Geometry, viewport: &Viewport) -> Option<Style> {
    match geometry {
        Geometry::Point(_) => None,
        Geometry::Line(_) | Geometry::Polygon(_) => {
            let ratio = area_ratio(geometry, viewport);
            Some(Style {
                fill_opacity: Some(0.2 - 0.2 * ratio),
                stroke_opacity: (1.0 - ratio).max(0.2),
                stroke_width: (15.0 * ratio).max(2.0),
                label_suppressed: true,
            })
        }
    }
}

/// A polygon that covers the entire visible viewport adds no visual value
/// and is a candidate for pruning from the active set.
pub fn is_effectively_invisible(geometry: &Geometry, viewport: &Viewport) -> bool {
    match geometry {
        Geometry::Polygon(_) => {
            let viewed = viewport.area();
            viewed > 0.0 && geometry.area() / viewed >= 1.0
        }
        Geometry::Point(_) | Geometry::Line(_) => false,
    }
}

/// Zoom-dependent stroke boost for line geometries, reapplied after every
/// recluster so lines stay visible at street-level zooms.
pub fn line_stroke_for_zoom(zoom: f64) -> Style {
    let stroke_width = 2.0 + (zoom - 13.0).max(0.0);
    let stroke_opacity = if zoom >= 15.0 { 0.9 } else { 1.0 };
    Style {
        fill_opacity: None,
        stroke_opacity,
        stroke_width,
        label_suppressed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{point, rect_polygon};
    use geo::{Coord, Rect};

    fn viewport_100() -> Viewport {
        // 10 x 10 extent, area 100
        Viewport::new(
            Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 }),
            12.0,
        )
    }

    #[test]
    fn test_tiny_polygon_gets_full_fill_and_thin_stroke() {
        let poly = rect_polygon(0.0, 0.0, 0.1, 0.1);
        let style = base_style(&poly, &viewport_100()).unwrap();
        assert!(style.fill_opacity.unwrap() > 0.49);
        assert!(style.stroke_opacity > 0.99);
        assert_eq!(style.stroke_width, 2.0);
        assert!(style.label_suppressed);
    }

    #[test]
    fn test_full_viewport_polygon_recedes_entirely() {
        // Viewport area 100, polygon area 150: ratio caps at 1.
        let poly = rect_polygon(-1.0, -1.0, 11.5, 11.0);
        assert!((poly.area() - 150.0).abs() < 1e-9);
        let style = base_style(&poly, &viewport_100()).unwrap();
        assert_eq!(style.fill_opacity, Some(0.0));
        assert_eq!(style.stroke_opacity, 0.0);
        assert_eq!(style.stroke_width, 15.0);
        assert!(is_effectively_invisible(&poly, &viewport_100()));
    }

    #[test]
    fn test_area_ratio_monotonicity() {
        // As a polygon grows relative to the viewport, its fill and stroke
        // fade while the stroke widens.
        let viewport = viewport_100();
        let mut prev_fill = f64::INFINITY;
        let mut prev_stroke = f64::INFINITY;
        let mut prev_width = 0.0f64;
        for step in 1..=10 {
            let side = step as f64;
            let poly = rect_polygon(0.0, 0.0, side, side);
            let style = base_style(&poly, &viewport).unwrap();
            assert!(style.fill_opacity.unwrap() <= prev_fill);
            assert!(style.stroke_opacity <= prev_stroke);
            assert!(style.stroke_width >= prev_width);
            prev_fill = style.fill_opacity.unwrap();
            prev_stroke = style.stroke_opacity;
            prev_width = style.stroke_width;
        }
    }

    #[test]
    fn test_selected_style_never_disappears() {
        let poly = rect_polygon(-5.0, -5.0, 20.0, 20.0);
        let style = selected_style(&poly, &viewport_100()).unwrap();
        assert_eq!(style.stroke_opacity, 0.2);
        assert_eq!(style.fill_opacity, Some(0.0));
        assert_eq!(style.stroke_width, 15.0);
    }

    #[test]
    fn test_lines_use_fixed_base_style() {
        let line = Geometry::Line(geo::LineString::from(vec![(0.0, 0.0), (9.0, 9.0)]));
        let style = base_style(&line, &viewport_100()).unwrap();
        assert_eq!(style.stroke_opacity, 0.5);
        assert_eq!(style.stroke_width, 2.0);
        assert_eq!(style.fill_opacity, None);
    }

    #[test]
    fn test_points_unaffected() {
        assert!(base_style(&point(1.0, 1.0), &viewport_100()).is_none());
        assert!(selected_style(&point(1.0, 1.0), &viewport_100()).is_none());
        assert!(!is_effectively_invisible(&point(1.0, 1.0), &viewport_100()));
    }

    #[test]
    fn test_stroke_thickness_zoom_ramp() {
        assert_eq!(line_stroke_for_zoom(13.0).stroke_width, 2.0);
        assert_eq!(line_stroke_for_zoom(13.0).stroke_opacity, 1.0);
        assert_eq!(line_stroke_for_zoom(14.0).stroke_width, 3.0);
        let z16 = line_stroke_for_zoom(16.0);
        assert_eq!(z16.stroke_width, 5.0);
        assert_eq!(z16.stroke_opacity, 0.9);
    }
}
