//! Application module
//!
//! Full-screen map view with a right-hand related-features panel. The map
//! renders the engine's cluster set through a custom walkers plugin; the
//! update loop drives the engine with settled viewports, fetch results and
//! selection events.

mod fetch;
mod plugin;
pub(crate) mod settings;
mod state;
mod ui_panels;

use crate::app::plugin::FeaturePlugin;
use crate::app::settings::Settings;
use crate::app::state::AppState;
use eframe::egui;
use place_map_lib::{Geometry, utils};
use walkers::{HttpTiles, Map, MapMemory, sources::OpenStreetMap};

/// Main application structure
pub struct PlaceMapApp {
    /// Engine session, fetch plumbing and panel state
    state: AppState,

    /// Map tiles provider
    tiles: HttpTiles,

    /// Map state (camera position, zoom, etc.)
    map_memory: MapMemory,
}

impl PlaceMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = Settings::from_cli();
        let runtime = tokio::runtime::Handle::current();

        let tiles = HttpTiles::new(OpenStreetMap, cc.egui_ctx.clone());
        let mut map_memory = MapMemory::default();
        map_memory.center_at(walkers::lat_lon(settings.start_lat, settings.start_lon));
        let _ = map_memory.set_zoom(settings.start_zoom);

        tracing::info!(
            url = settings.objects_url,
            dynamic = settings.dynamic,
            "initialized place map viewer"
        );

        Self {
            state: AppState::new(settings, runtime),
            tiles,
            map_memory,
        }
    }

    /// Center and zoom the map so the given geometry fills the view
    fn fit_to_geometry(&mut self, geometry: &Geometry) {
        let Some(bounds) = geometry.bounding_rect() else {
            return;
        };
        let (min_lat, min_lon) = utils::mercator_to_wgs84(bounds.min().x, bounds.min().y);
        let (max_lat, max_lon) = utils::mercator_to_wgs84(bounds.max().x, bounds.max().y);
        let center_lat = (min_lat + max_lat) / 2.0;
        let center_lon = (min_lon + max_lon) / 2.0;

        let lat_span = (max_lat - min_lat).abs();
        let lon_span = (max_lon - min_lon).abs();
        let max_span = lat_span.max(lon_span);

        let zoom = if max_span > 0.0 {
            let zoom_estimate = (4.0 * 360.0 / max_span).log2();
            (zoom_estimate - 0.5).clamp(1.0, 18.0)
        } else {
            16.0
        };

        self.map_memory
            .center_at(walkers::lat_lon(center_lat, center_lon));
        let _ = self.map_memory.set_zoom(zoom);

        tracing::trace!(center_lat, center_lon, zoom, "zoomed to selection bounds");
    }
}

impl eframe::App for PlaceMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Plain scrolling must not zoom the map; hint at the modifier.
        ctx.input(|i| {
            if i.raw_scroll_delta.y != 0.0 && !i.modifiers.ctrl && !self.state.show_wheel_hint {
                self.state.show_wheel_zoom_hint();
            }
        });

        // Drain plugin observations from the previous frame: settled
        // viewports, clicks, and completed fetches.
        self.state.process_frame(ctx);

        // Selecting a non-point feature zooms the map to its bounds.
        if let Some(geometry) = self.state.pending_zoom_to.take() {
            self.fit_to_geometry(&geometry);
        }

        ui_panels::fetch_error_banner(ctx, &mut self.state);
        ui_panels::render_sidebar(ctx, &mut self.state);

        let clusters = self.state.session.clusters().to_vec();
        let selected = self.state.session.selected_geometry().cloned();
        let shared = self.state.shared.clone();

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let feature_plugin = FeaturePlugin::new(clusters, selected, shared);

                let map = Map::new(
                    Some(&mut self.tiles),
                    &mut self.map_memory,
                    walkers::lat_lon(self.state.settings.start_lat, self.state.settings.start_lon),
                )
                .with_plugin(feature_plugin);

                ui.add(map);

                ui_panels::sidebar_toggle_button(ui, &mut self.state);
                ui_panels::fetch_activity_indicator(ui, &self.state);

                let painter = ui.painter();
                let screen_rect = ui.max_rect();
                painter.text(
                    screen_rect.center_bottom() + egui::vec2(0.0, -5.0),
                    egui::Align2::CENTER_BOTTOM,
                    "© OpenStreetMap contributors",
                    egui::FontId::proportional(10.0),
                    egui::Color32::from_black_alpha(180),
                );

                if self.state.show_wheel_hint {
                    ui_panels::show_wheel_zoom_hint(ui, &mut self.state);
                }
            });
    }
}
