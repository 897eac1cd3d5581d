//! Projection of the cluster set into the "related features" panel list
//!
//! With no selection every feature is listed; an areal selection lists
//! features with a vertex inside it; a point or line selection lists
//! features within a fixed proximity. Clusters expand to their members for
//! listing, but containment and distance are tested against the outer
//! cluster geometry. Visibility pruning piggybacks on this traversal:
//! polygons that engulf the whole viewport are reported for removal.

use crate::cluster::Cluster;
use crate::feature::Geometry;
use crate::style;
use crate::viewport::Viewport;

/// Heading of the related panel; the label is the selection's payload
#[derive(Debug, Clone, PartialEq)]
pub enum RelatedHeading {
    /// "Things on this map"
    All,
    /// "Things inside {label}"
    Inside(String),
    /// "Things near {label}"
    Near(String),
}

/// One panel entry: a single feature (cluster member), clickable to select
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedEntry {
    pub html: String,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelatedList {
    pub heading: RelatedHeading,
    pub entries: Vec<RelatedEntry>,
}

impl Default for RelatedList {
    fn default() -> Self {
        Self {
            heading: RelatedHeading::All,
            entries: Vec::new(),
        }
    }
}

/// Compute the related list for the current selection.
///
/// Returns the list plus the geometries of clusters found effectively
/// invisible during the traversal, which the caller removes from the
/// active set.
pub fn project(
    clusters: &[Cluster],
    selected_index: Option<usize>,
    viewport: &Viewport,
    distance_threshold: f64,
) -> (RelatedList, Vec<Geometry>) {
    let selected = selected_index.and_then(|i| clusters.get(i));
    let heading = match selected {
        None => RelatedHeading::All,
        Some(cluster) => match &cluster.geometry {
            Geometry::Polygon(_) => RelatedHeading::Inside(cluster.label().to_string()),
            Geometry::Point(_) | Geometry::Line(_) => {
                RelatedHeading::Near(cluster.label().to_string())
            }
        },
    };

    let mut entries = Vec::new();
    let mut invisible = Vec::new();
    for (index, cluster) in clusters.iter().enumerate() {
        if Some(index) == selected_index {
            continue;
        }
        if style::is_effectively_invisible(&cluster.geometry, viewport) {
            invisible.push(cluster.geometry.clone());
            continue;
        }
        let listed = match selected {
            None => true,
            Some(selection) => match &selection.geometry {
                Geometry::Polygon(_) => cluster
                    .geometry
                    .vertices()
                    .iter()
                    .any(|vertex| selection.geometry.contains_point(vertex)),
                Geometry::Point(_) | Geometry::Line(_) => {
                    selection.geometry.distance_to(&cluster.geometry) < distance_threshold
                }
            },
        };
        if listed {
            entries.extend(cluster.members.iter().map(|member| RelatedEntry {
                html: member.html.clone(),
                geometry: member.geometry.clone(),
            }));
        }
    }

    (RelatedList { heading, entries }, invisible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterOptions, ClusteringEngine};
    use crate::feature::{Feature, point, rect_polygon};
    use geo::{Coord, Rect};

    fn viewport() -> Viewport {
        Viewport::new(
            Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 2000.0, y: 2000.0 }),
            14.0,
        )
    }

    fn clusters_for(features: Vec<Feature>) -> Vec<Cluster> {
        let mut engine = ClusteringEngine::new(ClusterOptions::default());
        engine.recluster(&features, &viewport(), true);
        engine.clusters().to_vec()
    }

    #[test]
    fn test_no_selection_lists_every_member() {
        // Two nearby points cluster together; both members must be listed
        // individually alongside the faraway polygon.
        let clusters = clusters_for(vec![
            Feature::new(point(100.0, 100.0), "a"),
            Feature::new(point(110.0, 100.0), "b"),
            Feature::new(rect_polygon(1500.0, 1500.0, 1600.0, 1600.0), "c"),
        ]);
        assert_eq!(clusters.len(), 2);
        let (list, invisible) = project(&clusters, None, &viewport(), 500.0);
        assert_eq!(list.heading, RelatedHeading::All);
        assert_eq!(list.entries.len(), 3);
        assert!(invisible.is_empty());
    }

    #[test]
    fn test_polygon_selection_lists_contained_features() {
        let clusters = clusters_for(vec![
            Feature::new(rect_polygon(0.0, 0.0, 1000.0, 1000.0), "district"),
            Feature::new(point(500.0, 500.0), "inside"),
            Feature::new(point(1900.0, 1900.0), "outside"),
        ]);
        let selected = clusters
            .iter()
            .position(|c| matches!(c.geometry, Geometry::Polygon(_)))
            .unwrap();
        let (list, _) = project(&clusters, Some(selected), &viewport(), 500.0);
        assert_eq!(list.heading, RelatedHeading::Inside("district".into()));
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.entries[0].html, "inside");
    }

    #[test]
    fn test_point_selection_lists_nearby_features() {
        let clusters = clusters_for(vec![
            Feature::new(point(100.0, 100.0), "here"),
            Feature::new(point(450.0, 100.0), "near"),
            Feature::new(point(1800.0, 1800.0), "far"),
        ]);
        let selected = clusters.iter().position(|c| c.label() == "here").unwrap();
        let (list, _) = project(&clusters, Some(selected), &viewport(), 500.0);
        assert_eq!(list.heading, RelatedHeading::Near("here".into()));
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.entries[0].html, "near");
    }

    #[test]
    fn test_engulfing_polygon_is_reported_invisible() {
        let clusters = clusters_for(vec![
            Feature::new(rect_polygon(-500.0, -500.0, 2500.0, 2500.0), "everything"),
            Feature::new(point(100.0, 100.0), "a"),
        ]);
        let (list, invisible) = project(&clusters, None, &viewport(), 500.0);
        assert_eq!(invisible.len(), 1);
        // The engulfing polygon is neither listed nor kept.
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.entries[0].html, "a");
    }
}
