//! Core data model: geometries, features and display styles
//!
//! Geometries live in a fixed projected coordinate system (Web Mercator,
//! EPSG:3857). Features are identified by geometry content equality: two
//! features with identical geometry are the same entity across a data
//! refresh, which is how selection survives refetches.

use geo::{Area, BoundingRect, Centroid, Contains, Distance, Euclidean, Point, Rect};

/// A closed set of geometry kinds supported by the engine.
///
/// Every consumer matches exhaustively on this enum; there is no dynamic
/// dispatch on geometry type names.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(geo::Point<f64>),
    Line(geo::LineString<f64>),
    Polygon(geo::Polygon<f64>),
}

impl Geometry {
    /// Enclosed area in square map units (zero for points and lines)
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Point(_) | Geometry::Line(_) => 0.0,
            Geometry::Polygon(poly) => poly.unsigned_area(),
        }
    }

    /// Axis-aligned bounding box, or `None` for an empty line/polygon
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            Geometry::Point(p) => Some(Rect::new(p.0, p.0)),
            Geometry::Line(line) => line.bounding_rect(),
            Geometry::Polygon(poly) => poly.bounding_rect(),
        }
    }

    /// Center of the bounding box (the anchor used for cluster proximity)
    pub fn bounding_center(&self) -> Option<Point<f64>> {
        self.bounding_rect().map(|r| Point::from(r.center()))
    }

    /// Centroid of the geometry
    pub fn centroid(&self) -> Option<Point<f64>> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::Line(line) => line.centroid(),
            Geometry::Polygon(poly) => poly.centroid(),
        }
    }

    /// All vertices of the geometry.
    ///
    /// For polygons this walks the exterior and interior rings, skipping
    /// each ring's closing coordinate.
    pub fn vertices(&self) -> Vec<Point<f64>> {
        fn ring_vertices(ring: &geo::LineString<f64>, out: &mut Vec<Point<f64>>) {
            let coords = &ring.0;
            let take = if coords.len() > 1 && coords.first() == coords.last() {
                coords.len() - 1
            } else {
                coords.len()
            };
            out.extend(coords[..take].iter().map(|c| Point::from(*c)));
        }

        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::Line(line) => line.0.iter().map(|c| Point::from(*c)).collect(),
            Geometry::Polygon(poly) => {
                let mut out = Vec::new();
                ring_vertices(poly.exterior(), &mut out);
                for interior in poly.interiors() {
                    ring_vertices(interior, &mut out);
                }
                out
            }
        }
    }

    /// Whether the given point lies strictly inside this geometry
    /// (meaningful for polygons; always false otherwise)
    pub fn contains_point(&self, point: &Point<f64>) -> bool {
        match self {
            Geometry::Point(_) | Geometry::Line(_) => false,
            Geometry::Polygon(poly) => poly.contains(point),
        }
    }

    /// Minimum Euclidean distance to another geometry in map units
    pub fn distance_to(&self, other: &Geometry) -> f64 {
        use Geometry::*;
        match (self, other) {
            (Point(a), Point(b)) => Euclidean.distance(*a, *b),
            (Point(a), Line(b)) => Euclidean.distance(a, b),
            (Point(a), Polygon(b)) => Euclidean.distance(a, b),
            (Line(a), Point(b)) => Euclidean.distance(b, a),
            (Line(a), Line(b)) => Euclidean.distance(a, b),
            (Line(a), Polygon(b)) => Euclidean.distance(a, b),
            (Polygon(a), Point(b)) => Euclidean.distance(b, a),
            (Polygon(a), Line(b)) => Euclidean.distance(b, a),
            (Polygon(a), Polygon(b)) => Euclidean.distance(a, b),
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Geometry::Point(_))
    }
}

/// Display style attributes read by the renderer.
///
/// `fill_opacity` is `None` for geometries without an interior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub fill_opacity: Option<f64>,
    pub stroke_opacity: f64,
    pub stroke_width: f64,
    /// Suppress the cluster-count label (set on every computed style so
    /// count badges only appear on plain point clusters)
    pub label_suppressed: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill_opacity: Some(0.5),
            stroke_opacity: 1.0,
            stroke_width: 2.0,
            label_suppressed: false,
        }
    }
}

/// One geographic entity: immutable geometry plus an opaque rendered
/// payload (HTML-like markup) and a mutable display style.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    /// Rendered content for popups and the related-features panel
    pub html: String,
    pub style: Style,
}

impl Feature {
    pub fn new(geometry: Geometry, html: impl Into<String>) -> Self {
        Self {
            geometry,
            html: html.into(),
            style: Style::default(),
        }
    }

    /// Identity check: features are the same entity iff their geometries
    /// are content-equal
    pub fn same_entity(&self, other: &Feature) -> bool {
        self.geometry == other.geometry
    }
}

/// Build a rectangle-shaped test polygon (shared by unit tests)
#[cfg(test)]
pub(crate) fn rect_polygon(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Geometry {
    Geometry::Polygon(geo::Polygon::new(
        geo::LineString::from(vec![
            (min_x, min_y),
            (max_x, min_y),
            (max_x, max_y),
            (min_x, max_y),
            (min_x, min_y),
        ]),
        vec![],
    ))
}

#[cfg(test)]
pub(crate) fn point(x: f64, y: f64) -> Geometry {
    Geometry::Point(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_area() {
        let poly = rect_polygon(0.0, 0.0, 10.0, 10.0);
        assert!((poly.area() - 100.0).abs() < 1e-9);
        assert_eq!(point(1.0, 1.0).area(), 0.0);
    }

    #[test]
    fn test_bounding_center() {
        let poly = rect_polygon(0.0, 0.0, 10.0, 20.0);
        let center = poly.bounding_center().unwrap();
        assert_eq!(center, Point::new(5.0, 10.0));
    }

    #[test]
    fn test_vertices_skip_closing_coordinate() {
        let poly = rect_polygon(0.0, 0.0, 1.0, 1.0);
        assert_eq!(poly.vertices().len(), 4);
    }

    #[test]
    fn test_contains_point_polygon_only() {
        let poly = rect_polygon(0.0, 0.0, 10.0, 10.0);
        assert!(poly.contains_point(&Point::new(5.0, 5.0)));
        assert!(!poly.contains_point(&Point::new(15.0, 5.0)));
        assert!(!point(0.0, 0.0).contains_point(&Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_distance_point_to_polygon() {
        let poly = rect_polygon(0.0, 0.0, 10.0, 10.0);
        let p = point(13.0, 14.0);
        assert!((p.distance_to(&poly) - 5.0).abs() < 1e-9);
        // Inside the polygon the distance is zero.
        assert_eq!(point(5.0, 5.0).distance_to(&poly), 0.0);
    }

    #[test]
    fn test_same_entity_by_geometry_equality() {
        let a = Feature::new(point(3.0, 4.0), "<a href=\"/a\">A</a>");
        let mut b = Feature::new(point(3.0, 4.0), "<a href=\"/b\">B</a>");
        b.style.stroke_width = 9.0;
        assert!(a.same_entity(&b));
        let c = Feature::new(point(3.0, 4.1), "<a href=\"/a\">A</a>");
        assert!(!a.same_entity(&c));
    }
}
