//! Place Map Viewer - Application Library
//!
//! Integrates the clustering/loading engine with an egui map view to form
//! the complete interactive viewer.

mod app;

pub use app::PlaceMapApp;

/// Native entry point; expects to run inside a tokio runtime so fetches
/// can be spawned as background tasks.
pub async fn native_main() {
    tracing_subscriber::fmt::init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("Place Map Viewer"),
        ..Default::default()
    };

    let _ = eframe::run_native(
        "Place Map Viewer",
        native_options,
        Box::new(|cc| Ok(Box::new(PlaceMapApp::new(cc)))),
    );
}
