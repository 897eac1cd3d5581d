//! Top-level session: owns the feature set, selection, clustering and data
//! sync, and exposes the operations the viewer drives
//!
//! All mutation happens synchronously inside viewport-settle or
//! fetch-completion handlers; the only suspension point is the network
//! fetch itself, which the caller runs between [`SettleAction::Fetch`] and
//! [`MapSession::apply_fetch`].

use crate::cluster::{Cluster, ClusterOptions, ClusteringEngine};
use crate::feature::{Feature, Geometry, Style};
use crate::related::{self, RelatedList};
use crate::style;
use crate::sync::{FeatureRow, FetchRequest, RequestToken, ViewportDataSync};
use crate::viewport::Viewport;

/// Session-wide configuration, passed in explicitly at construction
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Dynamic maps refresh their feature set from the data source as the
    /// viewport moves; static maps keep the initial set
    pub dynamic: bool,
    pub cluster: ClusterOptions,
    /// Proximity threshold for the related-features list, in map units
    pub related_distance: f64,
    /// Fetch extents are padded by this factor to reduce refetch frequency
    pub padding_factor: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            dynamic: true,
            cluster: ClusterOptions::default(),
            related_distance: 500.0,
            padding_factor: 1.5,
        }
    }
}

/// What the caller must do after a viewport settles
#[derive(Debug, Clone, PartialEq)]
pub enum SettleAction {
    /// The held data covers the viewport; the display was refreshed
    Refreshed,
    /// A fetch is required; run it and hand the rows to
    /// [`MapSession::apply_fetch`]
    Fetch(FetchRequest),
}

/// Result of applying a fetch response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The response was current and the display now reflects it
    Applied,
    /// A later request superseded this response; nothing changed
    Stale,
}

pub struct MapSession {
    config: MapConfig,
    /// The full (unclustered) feature set for the data envelope
    features: Vec<Feature>,
    engine: ClusteringEngine,
    sync: ViewportDataSync,
    /// Selection is a geometry key, re-resolved by content equality when
    /// the feature set is replaced wholesale
    selected: Option<Geometry>,
    related: RelatedList,
}

impl MapSession {
    pub fn new(config: MapConfig) -> Self {
        let engine = ClusteringEngine::new(config.cluster.clone());
        let sync = ViewportDataSync::new(config.padding_factor);
        Self {
            config,
            features: Vec::new(),
            engine,
            sync,
            selected: None,
            related: RelatedList::default(),
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// The rendered cluster set
    pub fn clusters(&self) -> &[Cluster] {
        self.engine.clusters()
    }

    /// The raw feature set
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn related(&self) -> &RelatedList {
        &self.related
    }

    pub fn selected_geometry(&self) -> Option<&Geometry> {
        self.selected.as_ref()
    }

    /// Whether a response carrying `token` would still be applied; lets
    /// the caller tell a relevant fetch failure from a superseded one
    pub fn is_current_request(&self, token: RequestToken) -> bool {
        self.sync.is_current(token)
    }

    /// The rendered cluster carrying the current selection
    pub fn selected_cluster(&self) -> Option<&Cluster> {
        let selected = self.selected.as_ref()?;
        self.engine
            .clusters()
            .iter()
            .find(|cluster| cluster.matches_geometry(selected))
    }

    /// Seed the session with an initial feature set (static maps, tests)
    pub fn set_features(&mut self, features: Vec<Feature>, viewport: &Viewport) {
        self.features = features;
        self.engine.invalidate();
        self.refresh_display(viewport);
    }

    /// Handle a settled viewport: decide whether the held data is still
    /// authoritative, and either refresh the display or request a fetch.
    pub fn on_viewport_settled(&mut self, viewport: &Viewport) -> SettleAction {
        let refetch = self.config.dynamic && self.sync.needs_refetch(viewport);
        self.sync.note_settled(viewport);
        if refetch {
            SettleAction::Fetch(self.sync.begin_fetch(viewport))
        } else {
            self.refresh_display(viewport);
            SettleAction::Refreshed
        }
    }

    /// Apply a fetch response.
    ///
    /// A response whose token was superseded is discarded entirely. An
    /// accepted response replaces the feature set wholesale, re-resolving
    /// the selection by geometry equality (or dropping it), and refreshes
    /// clustering, styling and the related list.
    pub fn apply_fetch(
        &mut self,
        token: RequestToken,
        rows: Vec<FeatureRow>,
        viewport: &Viewport,
    ) -> ApplyOutcome {
        if !self.sync.is_current(token) {
            tracing::debug!(?token, "discarding superseded fetch response");
            return ApplyOutcome::Stale;
        }

        self.engine.suspend();

        let row_count = rows.len();
        let mut features: Vec<Feature> = Vec::with_capacity(row_count);
        for row in rows {
            match row.into_feature() {
                Ok(feature) => features.push(feature),
                Err(err) => tracing::warn!(%err, "skipping undecodable feature row"),
            }
        }
        if features.len() < row_count {
            tracing::warn!(
                dropped = row_count - features.len(),
                "some feature rows were dropped"
            );
        }

        // Re-resolve the selection against the incoming set; restyle
        // everything else for the new viewport.
        let mut selection_found = false;
        for feature in &mut features {
            if Some(&feature.geometry) == self.selected.as_ref() {
                selection_found = true;
                if let Some(style) = style::selected_style(&feature.geometry, viewport) {
                    feature.style = style;
                }
            } else if let Some(style) = style::base_style(&feature.geometry, viewport) {
                feature.style = style;
            }
        }
        if !selection_found && self.selected.take().is_some() {
            tracing::debug!("selected feature absent from refreshed data; selection dropped");
        }

        self.features = features;
        self.sync.commit(token);
        self.engine.resume();
        self.engine.invalidate();
        self.refresh_display(viewport);
        ApplyOutcome::Applied
    }

    /// Select the feature or cluster displaying the given geometry.
    ///
    /// Returns the selected cluster's display geometry so the caller can
    /// zoom to a non-point selection.
    pub fn select(&mut self, geometry: Geometry, viewport: &Viewport) -> Option<Geometry> {
        self.selected = Some(geometry);
        self.restyle_clusters(viewport);
        self.project_related(viewport);
        self.selected_cluster().map(|c| c.geometry.clone())
    }

    pub fn unselect(&mut self, viewport: &Viewport) {
        if self.selected.take().is_some() {
            self.restyle_clusters(viewport);
            self.project_related(viewport);
        }
    }

    /// Recluster, restyle and re-project for the given viewport
    fn refresh_display(&mut self, viewport: &Viewport) {
        self.engine
            .recluster(&self.features, viewport, self.config.dynamic);
        self.restyle_clusters(viewport);
        self.project_related(viewport);
    }

    /// Write display styles onto the rendered clusters: selected features
    /// keep a visible floor, polygons scale with the area ratio, lines
    /// keep the zoom ramp applied by the clustering pass.
    fn restyle_clusters(&mut self, viewport: &Viewport) {
        let selected = self.selected.clone();
        for cluster in self.engine.clusters_mut() {
            let is_selected = selected
                .as_ref()
                .is_some_and(|geometry| cluster.matches_geometry(geometry));
            if is_selected {
                if let Some(style) = style::selected_style(&cluster.geometry, viewport) {
                    cluster.style = style;
                }
                continue;
            }
            match cluster.geometry {
                Geometry::Polygon(_) => {
                    if let Some(style) = style::base_style(&cluster.geometry, viewport) {
                        cluster.style = style;
                    }
                }
                Geometry::Line(_) => {
                    cluster.style = style::line_stroke_for_zoom(viewport.zoom);
                }
                Geometry::Point(_) => cluster.style = Style::default(),
            }
        }
    }

    /// Rebuild the related list; prunes clusters (and their source
    /// features) found effectively invisible during the traversal.
    fn project_related(&mut self, viewport: &Viewport) {
        let selected_index = self.selected.as_ref().and_then(|geometry| {
            self.engine
                .clusters()
                .iter()
                .position(|cluster| cluster.matches_geometry(geometry))
        });
        let (related, invisible) = related::project(
            self.engine.clusters(),
            selected_index,
            viewport,
            self.config.related_distance,
        );
        self.related = related;
        if !invisible.is_empty() {
            tracing::debug!(count = invisible.len(), "pruning engulfing polygons");
            self.engine
                .clusters_mut()
                .retain(|cluster| !invisible.contains(&cluster.geometry));
            self.features.retain(|feature| {
                !invisible
                    .iter()
                    .any(|geometry| feature.geometry == *geometry)
            });
        }
    }
}
