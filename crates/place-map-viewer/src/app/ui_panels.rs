//! UI panels for the application
//!
//! The sidebar hosts the related-features list; the map area gets a
//! toggle button, a transient fetch-error banner and the wheel-zoom hint.

use crate::app::state::AppState;
use egui::{Color32, RichText, Ui};
use place_map_lib::{Geometry, RelatedHeading};

/// Render the sidebar toggle button (overlaid on top-right of map)
pub fn sidebar_toggle_button(ui: &mut Ui, state: &mut AppState) {
    let button_size = egui::vec2(40.0, 40.0);
    let margin = 10.0;

    let rect = ui.max_rect();
    let button_pos = rect.right_top() + egui::vec2(-button_size.x - margin, margin);
    let button_rect = egui::Rect::from_min_size(button_pos, button_size);

    let response = ui.allocate_rect(button_rect, egui::Sense::click());
    if response.clicked() {
        state.sidebar_open = !state.sidebar_open;
    }

    let bg_color = if response.hovered() {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.inactive.bg_fill
    };
    ui.painter().rect_filled(button_rect, 5.0, bg_color);

    let icon = if state.sidebar_open { "✕" } else { "☰" };
    ui.painter().text(
        button_rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(20.0),
        ui.visuals().text_color(),
    );
}

/// Render the related-features sidebar
pub fn render_sidebar(ctx: &egui::Context, state: &mut AppState) {
    if !state.sidebar_open {
        return;
    }

    egui::SidePanel::right("related_panel")
        .default_width(300.0)
        .min_width(260.0)
        .max_width(450.0)
        .resizable(true)
        .show(ctx, |ui| {
            render_related_content(ui, state);
        });
}

fn render_related_content(ui: &mut Ui, state: &mut AppState) {
    let heading = match &state.session.related().heading {
        RelatedHeading::All => "Things on this map:".to_string(),
        RelatedHeading::Inside(label) => format!("Things inside {}:", anchor_text(label)),
        RelatedHeading::Near(label) => format!("Things near {}:", anchor_text(label)),
    };
    ui.heading(heading);

    if state.session.selected_geometry().is_some() && ui.small_button("Clear selection").clicked() {
        state.unselect_from_panel();
    }

    ui.separator();

    let entries: Vec<(String, Geometry)> = state
        .session
        .related()
        .entries
        .iter()
        .map(|entry| (anchor_text(&entry.html), entry.geometry.clone()))
        .collect();

    if entries.is_empty() {
        ui.label(RichText::new("Nothing to show here.").weak());
        return;
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for (label, geometry) in entries {
                if ui.link(label).clicked() {
                    state.select_entry(geometry);
                }
            }
        });
}

/// Transient banner shown while the last refresh failed
pub fn fetch_error_banner(ctx: &egui::Context, state: &mut AppState) {
    let Some(error) = state.fetch_error.clone() else {
        return;
    };
    egui::TopBottomPanel::top("fetch_error_banner").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.colored_label(
                Color32::from_rgb(200, 60, 60),
                "Could not refresh the map; showing the last loaded data.",
            );
            ui.label(RichText::new(error).weak().small());
            if ui.small_button("Dismiss").clicked() {
                state.fetch_error = None;
            }
        });
    });
}

/// Show the mouse wheel zoom hint overlay
pub fn show_wheel_zoom_hint(ui: &mut Ui, state: &mut AppState) {
    let rect = ui.max_rect();
    let text_pos = rect.center();
    ui.painter().rect_filled(
        egui::Rect::from_center_size(text_pos, egui::vec2(340.0, 40.0)),
        8.0,
        Color32::from_black_alpha(160),
    );
    ui.painter().text(
        text_pos,
        egui::Align2::CENTER_CENTER,
        "Use Ctrl + scroll to zoom the map",
        egui::FontId::proportional(16.0),
        Color32::WHITE,
    );
    if state.should_hide_wheel_hint() {
        state.hide_wheel_zoom_hint();
    }
}

/// Small activity indicator while fetches are outstanding
pub fn fetch_activity_indicator(ui: &mut Ui, state: &AppState) {
    if state.fetches_in_flight == 0 {
        return;
    }
    let rect = ui.max_rect();
    let pos = rect.left_top() + egui::vec2(18.0, 18.0);
    egui::Area::new(egui::Id::new("fetch_spinner"))
        .fixed_pos(pos)
        .show(ui.ctx(), |ui| {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(RichText::new("Updating map…").small());
            });
        });
}

/// Extract the link text from anchor markup for plain display; payloads
/// are HTML-like and the panel renders text only
pub fn anchor_text(html: &str) -> String {
    let mut text = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    if text.trim().is_empty() {
        html.to_string()
    } else {
        text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_text_extraction() {
        assert_eq!(anchor_text("<a href=\"/city-hall\">City Hall</a>"), "City Hall");
        assert_eq!(anchor_text("plain name"), "plain name");
        assert_eq!(anchor_text("<a href=\"/x\"></a>"), "<a href=\"/x\"></a>");
    }
}
