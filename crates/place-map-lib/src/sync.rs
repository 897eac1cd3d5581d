//! Incremental data loading for the viewport
//!
//! Tracks the extent for which the held feature set is known complete (the
//! data envelope), decides when a viewport change requires a refetch, and
//! guards against racing responses. There is no cancellation of in-flight
//! requests: every request carries a token from a monotonic counter, and a
//! response whose token is no longer current is discarded entirely.

use crate::feature::{Feature, Geometry};
use crate::utils;
use crate::viewport::Viewport;
use crate::{MapError, Result};
use geo::{Coord, Point, Rect};
use serde::{Deserialize, Serialize};

/// Identifies one fetch request; later requests always compare greater
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// A pending fetch for a padded viewport extent
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub token: RequestToken,
    /// Padded extent in map units; becomes the data envelope on success
    pub extent: Rect<f64>,
    /// The same extent in geographic coordinates (x = lon, y = lat), as
    /// the data source expects it
    pub extent_wgs84: Rect<f64>,
    pub zoom: f64,
}

/// One row of the feature-data response: geometry plus the page it links to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub geometry: GeometryDto,
    pub name: String,
    pub url: String,
}

/// GeoJSON-shaped geometry with WGS84 (lon, lat) coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeometryDto {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

impl GeometryDto {
    /// Convert to a projected engine geometry
    pub fn into_geometry(self) -> Result<Geometry> {
        fn mercator(lonlat: &[f64; 2]) -> Coord<f64> {
            utils::wgs84_to_mercator(lonlat[1], lonlat[0]).0
        }

        match self {
            GeometryDto::Point { coordinates } => {
                Ok(Geometry::Point(Point::from(mercator(&coordinates))))
            }
            GeometryDto::LineString { coordinates } => {
                if coordinates.len() < 2 {
                    return Err(MapError::InvalidGeometry(
                        "line with fewer than 2 coordinates".into(),
                    ));
                }
                Ok(Geometry::Line(geo::LineString::new(
                    coordinates.iter().map(mercator).collect(),
                )))
            }
            GeometryDto::Polygon { coordinates } => {
                let mut rings = coordinates.iter().map(|ring| {
                    geo::LineString::new(ring.iter().map(mercator).collect())
                });
                let exterior = rings
                    .next()
                    .ok_or_else(|| MapError::InvalidGeometry("polygon without rings".into()))?;
                if exterior.0.len() < 4 {
                    return Err(MapError::InvalidGeometry("degenerate polygon ring".into()));
                }
                Ok(Geometry::Polygon(geo::Polygon::new(
                    exterior,
                    rings.collect(),
                )))
            }
        }
    }
}

impl FeatureRow {
    /// Build the displayable feature for this row.
    ///
    /// The payload is the anchor markup the related panel and popups render.
    pub fn into_feature(self) -> Result<Feature> {
        let html = format!("<a href=\"{}\">{}</a>", self.url, self.name);
        Ok(Feature::new(self.geometry.into_geometry()?, html))
    }
}

/// Boundary to whatever supplies feature rows for an extent.
///
/// Implementations fetch over the network; failures surface as
/// [`MapError::DataFetch`] and leave the engine's prior state untouched.
pub trait DataSource {
    fn fetch(
        &self,
        request: FetchRequest,
    ) -> impl std::future::Future<Output = Result<Vec<FeatureRow>>> + Send + 'static;
}

/// Decides refetch necessity and arbitrates racing responses.
pub struct ViewportDataSync {
    /// Extent for which the held feature set is known complete
    envelope: Option<Rect<f64>>,
    /// Zoom of the last settled viewport
    last_zoom: Option<f64>,
    /// Extent padding factor applied to every request
    padding_factor: f64,
    next_token: u64,
    /// The only request whose response will be accepted
    pending: Option<FetchRequest>,
}

impl ViewportDataSync {
    pub fn new(padding_factor: f64) -> Self {
        Self {
            envelope: None,
            last_zoom: None,
            padding_factor,
            next_token: 0,
            pending: None,
        }
    }

    /// Extent for which the current feature set is authoritative
    pub fn envelope(&self) -> Option<&Rect<f64>> {
        self.envelope.as_ref()
    }

    /// Whether the held feature set can be trusted for this viewport.
    ///
    /// A refetch is required when the zoom level changed, when no envelope
    /// exists yet, or when the viewport is no longer contained in it.
    pub fn needs_refetch(&self, viewport: &Viewport) -> bool {
        let zoom_changed = self.last_zoom != Some(viewport.zoom);
        let outside = match &self.envelope {
            None => true,
            Some(envelope) => !utils::rect_contains_rect(envelope, &viewport.extent),
        };
        zoom_changed || outside
    }

    /// Record a settled viewport (the zoom-change test compares against
    /// the previous settle)
    pub fn note_settled(&mut self, viewport: &Viewport) {
        self.last_zoom = Some(viewport.zoom);
    }

    /// Start a fetch for the padded viewport; the returned request's token
    /// supersedes any earlier in-flight request.
    pub fn begin_fetch(&mut self, viewport: &Viewport) -> FetchRequest {
        let extent = viewport.padded_extent(self.padding_factor);
        self.next_token += 1;
        let request = FetchRequest {
            token: RequestToken(self.next_token),
            extent,
            extent_wgs84: utils::mercator_rect_to_wgs84(&extent),
            zoom: viewport.zoom,
        };
        tracing::debug!(token = self.next_token, zoom = viewport.zoom, "fetch issued");
        self.pending = Some(request.clone());
        request
    }

    /// Whether a response carrying `token` is still the current one
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.pending.as_ref().is_some_and(|req| req.token == token)
    }

    /// Mark the pending fetch as applied: its padded extent becomes the
    /// new data envelope.
    pub fn commit(&mut self, token: RequestToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        if let Some(request) = self.pending.take() {
            self.envelope = Some(request.extent);
        }
        true
    }
}
