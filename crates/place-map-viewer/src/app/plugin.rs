//! Walkers plugin rendering the engine's cluster set on the map
//!
//! The plugin paints the clusters snapshotted for this frame, observes the
//! viewport the map is actually showing, and hit-tests clicks; both
//! observations are handed back to the update loop through shared state.

use crate::app::state::{ClickTarget, PluginShared};
use egui::{Align2, Color32, FontId, Pos2, Stroke};
use place_map_lib::{Cluster, Geometry, Viewport, utils};
use std::sync::{Arc, RwLock};
use walkers::{MapMemory, Plugin, Projector};

/// Base colour for unselected features (the selected variant is warm so a
/// selection reads at a glance)
const FEATURE_COLOR: Color32 = Color32::from_rgb(70, 130, 220);
const SELECTED_COLOR: Color32 = Color32::from_rgb(230, 120, 40);

/// Screen-space hit tolerances in pixels
const POINT_HIT_PX: f64 = 12.0;
const LINE_HIT_PX: f64 = 8.0;
const POLYGON_HIT_PX: f64 = 4.0;

pub struct FeaturePlugin {
    clusters: Vec<Cluster>,
    selected: Option<Geometry>,
    shared: Arc<RwLock<PluginShared>>,
}

impl FeaturePlugin {
    pub fn new(
        clusters: Vec<Cluster>,
        selected: Option<Geometry>,
        shared: Arc<RwLock<PluginShared>>,
    ) -> Self {
        Self {
            clusters,
            selected,
            shared,
        }
    }

    /// Project a Web Mercator point to screen space
    fn to_screen(projector: &Projector, point: geo::Point<f64>) -> Pos2 {
        let (lat, lon) = utils::mercator_to_wgs84(point.x(), point.y());
        let screen = projector.project(walkers::lat_lon(lat, lon));
        Pos2::new(screen.x, screen.y)
    }

    fn with_alpha(base: Color32, opacity: f64) -> Color32 {
        Color32::from_rgba_unmultiplied(
            base.r(),
            base.g(),
            base.b(),
            (opacity.clamp(0.0, 1.0) * 255.0) as u8,
        )
    }

    fn render_cluster(
        &self,
        cluster: &Cluster,
        is_selected: bool,
        projector: &Projector,
        painter: &egui::Painter,
    ) {
        let base = if is_selected {
            SELECTED_COLOR
        } else {
            FEATURE_COLOR
        };
        let style = &cluster.style;

        match &cluster.geometry {
            Geometry::Point(point) => {
                let center = Self::to_screen(projector, *point);
                let radius = if is_selected { 9.0 } else { 7.0 };
                painter.circle(center, radius, base, Stroke::new(1.5, Color32::WHITE));
                if cluster.len() > 1 && !style.label_suppressed {
                    painter.text(
                        center,
                        Align2::CENTER_CENTER,
                        cluster.len().to_string(),
                        FontId::proportional(11.0),
                        Color32::WHITE,
                    );
                }
            }
            Geometry::Line(line) => {
                let points: Vec<Pos2> = line
                    .points()
                    .map(|p| Self::to_screen(projector, p))
                    .collect();
                if points.len() >= 2 {
                    let stroke = Stroke::new(
                        style.stroke_width as f32,
                        Self::with_alpha(base, style.stroke_opacity),
                    );
                    painter.add(egui::Shape::line(points, stroke));
                }
            }
            Geometry::Polygon(polygon) => {
                let points: Vec<Pos2> = polygon
                    .exterior()
                    .points()
                    .map(|p| Self::to_screen(projector, p))
                    .collect();
                if points.len() >= 3 {
                    let fill = Self::with_alpha(base, style.fill_opacity.unwrap_or(0.0));
                    let stroke = Stroke::new(
                        style.stroke_width as f32,
                        Self::with_alpha(base, style.stroke_opacity),
                    );
                    painter.add(egui::Shape::convex_polygon(
                        points.clone(),
                        fill,
                        Stroke::NONE,
                    ));
                    painter.add(egui::Shape::closed_line(points, stroke));
                }
            }
        }
    }

    /// Find the cluster hit by a click at the given map position
    fn hit_test(&self, position: &geo::Point<f64>, resolution: f64) -> Option<&Cluster> {
        let probe = Geometry::Point(*position);
        let mut best: Option<(&Cluster, f64)> = None;
        for cluster in &self.clusters {
            let tolerance_px = match cluster.geometry {
                Geometry::Point(_) => POINT_HIT_PX,
                Geometry::Line(_) => LINE_HIT_PX,
                Geometry::Polygon(_) => POLYGON_HIT_PX,
            };
            let distance = if cluster.geometry.contains_point(position) {
                0.0
            } else {
                cluster.geometry.distance_to(&probe)
            };
            if distance <= tolerance_px * resolution
                && best.is_none_or(|(_, previous)| distance < previous)
            {
                best = Some((cluster, distance));
            }
        }
        best.map(|(cluster, _)| cluster)
    }
}

impl Plugin for FeaturePlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _map_memory: &MapMemory,
    ) {
        let painter = ui.painter();
        let rect = response.rect;

        // The viewport the map is actually showing this frame. Zoom is
        // recovered from the ratio of map units to screen pixels, so it
        // reflects fractional zoom states during animations too.
        let top_left = projector.unproject(egui::Vec2::new(rect.min.x, rect.min.y));
        let bottom_right = projector.unproject(egui::Vec2::new(rect.max.x, rect.max.y));
        let corner_a = utils::wgs84_to_mercator(top_left.y(), top_left.x());
        let corner_b = utils::wgs84_to_mercator(bottom_right.y(), bottom_right.x());
        let extent = geo::Rect::new(corner_a.0, corner_b.0);
        let resolution = extent.width() / rect.width().max(1.0) as f64;
        let zoom = (utils::BASE_RESOLUTION / resolution).log2();
        let viewport = Viewport::new(extent, zoom);

        // Cheap cull: skip clusters entirely outside the visible extent.
        for cluster in &self.clusters {
            let visible = cluster.geometry.bounding_rect().is_some_and(|bounds| {
                bounds.min().x <= extent.max().x
                    && bounds.max().x >= extent.min().x
                    && bounds.min().y <= extent.max().y
                    && bounds.max().y >= extent.min().y
            });
            if !visible {
                continue;
            }
            let is_selected = self
                .selected
                .as_ref()
                .is_some_and(|geometry| cluster.matches_geometry(geometry));
            self.render_cluster(cluster, is_selected, projector, painter);
        }

        let click = response.clicked().then(|| {
            response
                .interact_pointer_pos()
                .map(|pos| {
                    let position = projector.unproject(egui::Vec2::new(pos.x, pos.y));
                    let mercator = utils::wgs84_to_mercator(position.y(), position.x());
                    match self.hit_test(&mercator, viewport.resolution()) {
                        Some(cluster) => ClickTarget::Cluster(cluster.geometry.clone()),
                        None => ClickTarget::Background,
                    }
                })
                .unwrap_or(ClickTarget::Background)
        });

        let mut shared = self.shared.write().unwrap();
        shared.viewport = Some(viewport);
        if click.is_some() {
            shared.click = click;
        }
    }
}
