//! Place Map Library - Viewport-Driven Feature Clustering and Loading
//!
//! This library keeps a large, dynamic set of geographic vector features
//! legible on an interactive map. For any viewport and zoom it decides
//! which features merge into visual clusters, scales each feature's visual
//! weight with its size relative to the visible area, and incrementally
//! fetches feature data as the viewport moves without racing stale
//! responses or losing selection state.
//!
//! # Architecture
//!
//! - **[`Feature`] / [`Geometry`]**: immutable geometries with rendered
//!   payloads, identified by geometry content equality
//! - **[`style`]**: pure visual-weight computation from area ratios
//! - **[`ClusteringEngine`]**: proximity clustering with centroid collapse
//! - **[`ViewportDataSync`]**: padded-extent fetches with token-based
//!   stale-response discarding
//! - **[`MapSession`]**: the facade a viewer drives with settled viewports,
//!   fetch responses and selection events
//!
//! All geometry lives in Web Mercator (EPSG:3857); the data source speaks
//! WGS84 and conversion happens at the fetch boundary.

mod cluster;
mod feature;
mod related;
mod session;
pub mod style;
mod sync;
pub mod utils;
mod viewport;

// Public API exports
pub use cluster::{CLUSTERING_RESOLUTION_CUTOFF, Cluster, ClusterOptions, ClusteringEngine, ReclusterOutcome};
pub use feature::{Feature, Geometry, Style};
pub use related::{RelatedEntry, RelatedHeading, RelatedList};
pub use session::{ApplyOutcome, MapConfig, MapSession, SettleAction};
pub use sync::{DataSource, FeatureRow, FetchRequest, GeometryDto, RequestToken, ViewportDataSync};
pub use viewport::Viewport;

/// Error types for the engine
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// The feature fetch failed; the prior feature set and envelope stay
    /// untouched and the display remains stale but consistent
    #[error("data fetch failed: {0}")]
    DataFetch(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        let _: fn(MapConfig) -> MapSession = MapSession::new;
        let _ = MapConfig::default();
    }
}
