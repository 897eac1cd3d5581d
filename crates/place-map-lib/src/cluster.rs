//! Proximity clustering of the displayed feature set
//!
//! The engine consumes the full feature set and the current viewport and
//! produces the cluster list the renderer displays. Clusters are rebuilt
//! from the source features on every pass, so a centroid-collapsed display
//! geometry can never leak into a newly formed cluster.

use crate::feature::{Feature, Geometry, Style};
use crate::style;
use crate::viewport::Viewport;

/// Finer than this resolution (i.e. zoomed in past it), clustering is
/// disabled entirely unless `cluster_all_zoom_levels` is set.
pub const CLUSTERING_RESOLUTION_CUTOFF: f64 = 76.0;

/// A display-level aggregate over an ordered, non-empty list of features.
///
/// The displayed geometry is the first member's geometry, except for
/// visually collapsed non-point clusters where it is the centroid and the
/// original geometry is retained in `old_geometry`. At most one of
/// `geometry`/`old_geometry` is the current render state: `old_geometry`
/// is `Some` only while collapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub members: Vec<Feature>,
    pub geometry: Geometry,
    pub old_geometry: Option<Geometry>,
    pub style: Style,
}

impl Cluster {
    fn from_feature(feature: Feature) -> Self {
        let geometry = feature.geometry.clone();
        let style = feature.style;
        Self {
            members: vec![feature],
            geometry,
            old_geometry: None,
            style,
        }
    }

    fn add(&mut self, feature: Feature) {
        self.members.push(feature);
    }

    /// Collapse the displayed geometry to the centroid, caching the
    /// original for restoration when zoom increases
    fn collapse_to_centroid(&mut self) {
        if let Some(centroid) = self.geometry.centroid() {
            self.old_geometry = Some(std::mem::replace(
                &mut self.geometry,
                Geometry::Point(centroid),
            ));
        }
    }

    /// Undo a centroid collapse
    fn restore_geometry(&mut self) {
        if let Some(original) = self.old_geometry.take() {
            self.geometry = original;
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    /// Rendered content representing the whole cluster (its first member's)
    pub fn label(&self) -> &str {
        &self.members[0].html
    }

    /// Whether this cluster displays, caches, or contains a feature with
    /// the given geometry; used to re-resolve selection after replacement
    pub fn matches_geometry(&self, geometry: &Geometry) -> bool {
        self.geometry == *geometry
            || self.old_geometry.as_ref() == Some(geometry)
            || self.members.iter().any(|m| m.geometry == *geometry)
    }
}

/// Clustering tunables, carried explicitly instead of as global flags
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    /// Screen-space merge radius in pixels, converted to map units via the
    /// current resolution
    pub pixel_distance: f64,
    /// Minimum cluster size; clusters under this are broken back into
    /// singletons
    pub threshold: usize,
    /// Keep clustering active even past the resolution cutoff
    pub cluster_all_zoom_levels: bool,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            pixel_distance: 20.0,
            threshold: 1,
            cluster_all_zoom_levels: true,
        }
    }
}

/// Result of a [`ClusteringEngine::recluster`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclusterOutcome {
    /// The cluster set was rebuilt
    Updated,
    /// Nothing changed: a pass was already in progress, updates are
    /// suspended, or resolution is unchanged with a valid cluster set
    Skipped,
}

/// Owns the current cluster set and the collapse state across resolution
/// changes.
pub struct ClusteringEngine {
    options: ClusterOptions,
    resolution: Option<f64>,
    clusters: Vec<Cluster>,
    /// Reentrancy guard: a restyle-triggered redraw must not re-invoke
    /// clustering mid-pass
    clustering: bool,
    /// Set while the feature set is being swapped wholesale
    suspended: bool,
}

impl ClusteringEngine {
    pub fn new(options: ClusterOptions) -> Self {
        Self {
            options,
            resolution: None,
            clusters: Vec::new(),
            clustering: false,
            suspended: false,
        }
    }

    /// The current rendered cluster set
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn clusters_mut(&mut self) -> &mut Vec<Cluster> {
        &mut self.clusters
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Stop reacting to recluster requests (used while the feature set is
    /// replaced wholesale)
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Force the next pass to run even at an unchanged resolution
    /// (called after the feature set changes)
    pub fn invalidate(&mut self) {
        self.resolution = None;
    }

    /// Rebuild the cluster set for the given features and viewport.
    ///
    /// Best-effort and infallible: features without a usable extent are
    /// skipped, and a pass that cannot run now is skipped rather than
    /// queued; a later trigger converges.
    pub fn recluster(
        &mut self,
        features: &[Feature],
        viewport: &Viewport,
        dynamic: bool,
    ) -> ReclusterOutcome {
        if self.clustering || self.suspended {
            tracing::trace!("recluster skipped: pass in progress or suspended");
            return ReclusterOutcome::Skipped;
        }
        let resolution = viewport.resolution();
        if self.resolution == Some(resolution) && !self.clusters.is_empty() {
            return ReclusterOutcome::Skipped;
        }
        self.clustering = true;
        self.resolution = Some(resolution);

        let mut clusters: Vec<Cluster> = Vec::new();
        for feature in features {
            if feature.geometry.bounding_rect().is_none() {
                continue;
            }
            // Most-recently-created cluster is checked first, favouring the
            // most local merge.
            let placed = clusters.iter_mut().rev().find(|cluster| {
                Self::should_cluster(&self.options, cluster, feature, dynamic, resolution)
            });
            match placed {
                Some(cluster) => cluster.add(feature.clone()),
                None => clusters.push(Cluster::from_feature(feature.clone())),
            }
        }

        if !dynamic {
            for cluster in &mut clusters {
                if cluster.len() > 1 && !cluster.geometry.is_point() {
                    cluster.collapse_to_centroid();
                } else if (cluster.is_singleton() || resolution <= CLUSTERING_RESOLUTION_CUTOFF)
                    && cluster.old_geometry.is_some()
                {
                    cluster.restore_geometry();
                }
            }
        }

        if self.options.threshold > 1 {
            let threshold = self.options.threshold;
            clusters = clusters
                .into_iter()
                .flat_map(|cluster| {
                    if cluster.len() < threshold {
                        cluster.members.into_iter().map(Cluster::from_feature).collect()
                    } else {
                        vec![cluster]
                    }
                })
                .collect();
        }

        // Atomic replacement of the rendered set, then the line-stroke
        // zoom ramp, all under the in-progress flag.
        self.clusters = clusters;
        let line_style = style::line_stroke_for_zoom(viewport.zoom);
        for cluster in &mut self.clusters {
            if matches!(cluster.geometry, Geometry::Line(_)) {
                cluster.style = line_style;
            }
        }

        self.clustering = false;
        tracing::debug!(
            clusters = self.clusters.len(),
            features = features.len(),
            resolution,
            dynamic,
            "recluster pass complete"
        );
        ReclusterOutcome::Updated
    }

    fn should_cluster(
        options: &ClusterOptions,
        cluster: &Cluster,
        feature: &Feature,
        dynamic: bool,
        resolution: f64,
    ) -> bool {
        if !options.cluster_all_zoom_levels && resolution <= CLUSTERING_RESOLUTION_CUTOFF {
            return false;
        }
        // Dynamic maps only merge points with points; lines and polygons
        // always stay singleton clusters.
        if dynamic && !(feature.geometry.is_point() && cluster.geometry.is_point()) {
            return false;
        }
        let (Some(a), Some(b)) = (
            cluster.geometry.bounding_center(),
            feature.geometry.bounding_center(),
        ) else {
            return false;
        };
        let distance = Geometry::Point(a).distance_to(&Geometry::Point(b));
        distance <= options.pixel_distance * resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{point, rect_polygon};
    use crate::utils;
    use geo::{Coord, Rect};

    // At zoom 10 the resolution is ~153 (coarser than the cutoff); at
    // zoom 12 it is ~38 (finer than the cutoff).
    fn viewport_at(zoom: f64) -> Viewport {
        let res = utils::resolution_for_zoom(zoom);
        Viewport::new(
            Rect::new(
                Coord { x: 0.0, y: 0.0 },
                Coord {
                    x: 1024.0 * res,
                    y: 768.0 * res,
                },
            ),
            zoom,
        )
    }

    fn nearby_points(viewport: &Viewport) -> Vec<Feature> {
        // Two points ~5 px apart at the given resolution.
        let gap = 5.0 * viewport.resolution();
        vec![
            Feature::new(point(100.0, 100.0), "<a href=\"/a\">A</a>"),
            Feature::new(point(100.0 + gap, 100.0), "<a href=\"/b\">B</a>"),
        ]
    }

    #[test]
    fn test_nearby_points_merge_into_one_cluster() {
        let viewport = viewport_at(10.0);
        let features = nearby_points(&viewport);
        let mut engine = ClusteringEngine::new(ClusterOptions::default());
        engine.recluster(&features, &viewport, true);
        assert_eq!(engine.clusters().len(), 1);
        assert_eq!(engine.clusters()[0].len(), 2);
        // Representative geometry is the first member's point.
        assert_eq!(engine.clusters()[0].geometry, features[0].geometry);
    }

    #[test]
    fn test_cutoff_disables_clustering_when_not_all_zoom_levels() {
        let options = ClusterOptions {
            cluster_all_zoom_levels: false,
            ..ClusterOptions::default()
        };
        // Coarse resolution: clustering active.
        let coarse = viewport_at(10.0);
        let features = nearby_points(&coarse);
        let mut engine = ClusteringEngine::new(options.clone());
        engine.recluster(&features, &coarse, true);
        assert_eq!(engine.clusters().len(), 1);

        // Finer than the cutoff: every feature is its own cluster.
        let fine = viewport_at(12.0);
        let mut engine = ClusteringEngine::new(options);
        engine.recluster(&features, &fine, true);
        assert_eq!(engine.clusters().len(), 2);
        assert!(engine.clusters().iter().all(Cluster::is_singleton));
    }

    #[test]
    fn test_dynamic_mode_never_merges_polygons() {
        let viewport = viewport_at(10.0);
        let features = vec![
            Feature::new(rect_polygon(0.0, 0.0, 50.0, 50.0), "poly a"),
            Feature::new(rect_polygon(10.0, 10.0, 60.0, 60.0), "poly b"),
            Feature::new(point(30.0, 30.0), "pt"),
        ];
        let mut engine = ClusteringEngine::new(ClusterOptions::default());
        engine.recluster(&features, &viewport, true);
        assert_eq!(engine.clusters().len(), 3);
        assert!(engine.clusters().iter().all(Cluster::is_singleton));
        assert!(engine.clusters().iter().all(|c| c.old_geometry.is_none()));
    }

    #[test]
    fn test_static_mode_collapses_mixed_cluster_to_centroid() {
        let viewport = viewport_at(10.0);
        let poly = rect_polygon(0.0, 0.0, 100.0, 100.0);
        let features = vec![
            Feature::new(poly.clone(), "poly"),
            Feature::new(point(120.0, 120.0), "pt"),
        ];
        let mut engine = ClusteringEngine::new(ClusterOptions::default());
        engine.recluster(&features, &viewport, false);
        assert_eq!(engine.clusters().len(), 1);
        let cluster = &engine.clusters()[0];
        assert_eq!(cluster.len(), 2);
        assert!(cluster.geometry.is_point());
        assert_eq!(cluster.old_geometry, Some(poly));
    }

    #[test]
    fn test_collapsed_geometry_never_leaks_into_new_clusters() {
        let poly = rect_polygon(0.0, 0.0, 100.0, 100.0);
        let features = vec![
            Feature::new(poly.clone(), "poly"),
            Feature::new(point(120.0, 120.0), "pt"),
        ];
        let mut engine = ClusteringEngine::new(ClusterOptions::default());

        // Collapse at a coarse resolution, then zoom in far enough that the
        // two features no longer merge.
        engine.recluster(&features, &viewport_at(10.0), false);
        assert!(engine.clusters()[0].old_geometry.is_some());
        engine.recluster(&features, &viewport_at(16.0), false);
        assert_eq!(engine.clusters().len(), 2);
        for cluster in engine.clusters() {
            assert!(cluster.old_geometry.is_none());
        }
        assert_eq!(engine.clusters()[0].geometry, poly);
    }

    #[test]
    fn test_recluster_idempotent_at_unchanged_resolution() {
        let viewport = viewport_at(10.0);
        let features = nearby_points(&viewport);
        let mut engine = ClusteringEngine::new(ClusterOptions::default());
        assert_eq!(
            engine.recluster(&features, &viewport, true),
            ReclusterOutcome::Updated
        );
        let snapshot = engine.clusters().to_vec();
        assert_eq!(
            engine.recluster(&features, &viewport, true),
            ReclusterOutcome::Skipped
        );
        assert_eq!(engine.clusters(), &snapshot[..]);

        // Even when forced, the same inputs produce the same clusters.
        engine.invalidate();
        assert_eq!(
            engine.recluster(&features, &viewport, true),
            ReclusterOutcome::Updated
        );
        assert_eq!(engine.clusters(), &snapshot[..]);
    }

    #[test]
    fn test_threshold_breaks_small_clusters_apart() {
        let viewport = viewport_at(10.0);
        let mut features = nearby_points(&viewport);
        features.push(Feature::new(point(1.0e6, 1.0e6), "far away"));
        let options = ClusterOptions {
            threshold: 3,
            ..ClusterOptions::default()
        };
        let mut engine = ClusteringEngine::new(options);
        engine.recluster(&features, &viewport, true);
        assert_eq!(engine.clusters().len(), 3);
        assert!(engine.clusters().iter().all(Cluster::is_singleton));
    }

    #[test]
    fn test_suspended_engine_skips_and_converges_later() {
        let viewport = viewport_at(10.0);
        let features = nearby_points(&viewport);
        let mut engine = ClusteringEngine::new(ClusterOptions::default());
        engine.suspend();
        assert_eq!(
            engine.recluster(&features, &viewport, true),
            ReclusterOutcome::Skipped
        );
        assert!(engine.clusters().is_empty());
        engine.resume();
        assert_eq!(
            engine.recluster(&features, &viewport, true),
            ReclusterOutcome::Updated
        );
        assert_eq!(engine.clusters().len(), 1);
    }

    #[test]
    fn test_line_clusters_get_zoom_ramp_after_replacement() {
        let line = Geometry::Line(geo::LineString::from(vec![(0.0, 0.0), (500.0, 500.0)]));
        let features = vec![Feature::new(line, "a road")];
        let mut engine = ClusteringEngine::new(ClusterOptions::default());
        engine.recluster(&features, &viewport_at(16.0), true);
        let cluster = &engine.clusters()[0];
        assert_eq!(cluster.style.stroke_width, 5.0);
        assert_eq!(cluster.style.stroke_opacity, 0.9);
    }
}
