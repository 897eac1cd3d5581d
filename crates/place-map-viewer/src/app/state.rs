//! Application state: the engine session, viewport settling, selection
//! routing and fetch bookkeeping

use crate::app::fetch::{FetchResult, ObjectsEndpoint, spawn_fetch};
use crate::app::settings::Settings;
use place_map_lib::{
    ApplyOutcome, Geometry, MapSession, SettleAction, Viewport,
};
use std::sync::{Arc, RwLock, mpsc};

/// How long the viewport must hold still before it counts as settled
const SETTLE_DELAY_SECS: f32 = 0.25;

/// What a map click hit
#[derive(Debug, Clone)]
pub enum ClickTarget {
    /// A rendered cluster, identified by its display geometry
    Cluster(Geometry),
    /// Empty map; clears the selection
    Background,
}

/// State written by the map plugin during painting and drained by the
/// update loop afterwards
#[derive(Default)]
pub struct PluginShared {
    /// Viewport observed while painting the last frame
    pub viewport: Option<Viewport>,
    /// Click registered on the last frame, if any
    pub click: Option<ClickTarget>,
}

/// Debounces viewport changes into settle events
#[derive(Default)]
struct ViewportWatcher {
    last_seen: Option<Viewport>,
    seen_at: Option<instant::Instant>,
    last_processed: Option<Viewport>,
}

impl ViewportWatcher {
    /// Feed the viewport observed this frame; returns it once it has held
    /// still long enough and has not been processed yet
    fn observe(&mut self, viewport: Viewport) -> Option<Viewport> {
        if self.last_seen.as_ref() != Some(&viewport) {
            self.last_seen = Some(viewport);
            self.seen_at = Some(instant::Instant::now());
            return None;
        }
        let held_still = self
            .seen_at
            .is_some_and(|at| at.elapsed().as_secs_f32() >= SETTLE_DELAY_SECS);
        if held_still && self.last_processed.as_ref() != Some(&viewport) {
            self.last_processed = Some(viewport);
            return Some(viewport);
        }
        None
    }

    /// A viewport change was seen but not yet processed
    fn has_pending(&self) -> bool {
        self.last_seen != self.last_processed
    }
}

/// Main application state
pub struct AppState {
    pub session: MapSession,
    pub settings: Settings,

    endpoint: ObjectsEndpoint,
    runtime: tokio::runtime::Handle,
    fetch_tx: mpsc::Sender<FetchResult>,
    fetch_rx: mpsc::Receiver<FetchResult>,
    watcher: ViewportWatcher,

    /// State shared with the map plugin
    pub shared: Arc<RwLock<PluginShared>>,
    /// Viewport of the most recent frame
    pub current_viewport: Option<Viewport>,
    /// Extent to zoom the map to (set when a non-point feature is selected)
    pub pending_zoom_to: Option<Geometry>,
    /// Fetches issued but not yet completed
    pub fetches_in_flight: usize,
    /// Last fetch failure still worth showing
    pub fetch_error: Option<String>,

    /// Whether sidebar is open
    pub sidebar_open: bool,
    /// Whether to show the mouse wheel zoom hint
    pub show_wheel_hint: bool,
    pub wheel_hint_shown_at: Option<instant::Instant>,
}

impl AppState {
    pub fn new(settings: Settings, runtime: tokio::runtime::Handle) -> Self {
        let session = MapSession::new(settings.map_config());
        let endpoint = ObjectsEndpoint::new(settings.objects_url.clone());
        let (fetch_tx, fetch_rx) = mpsc::channel();
        Self {
            session,
            settings,
            endpoint,
            runtime,
            fetch_tx,
            fetch_rx,
            watcher: ViewportWatcher::default(),
            shared: Arc::new(RwLock::new(PluginShared::default())),
            current_viewport: None,
            pending_zoom_to: None,
            fetches_in_flight: 0,
            fetch_error: None,
            sidebar_open: true,
            show_wheel_hint: false,
            wheel_hint_shown_at: None,
        }
    }

    /// Drain plugin observations from the last frame: viewport changes and
    /// clicks. Call once per update, before rendering the panels.
    pub fn process_frame(&mut self, ctx: &egui::Context) {
        let (viewport, click) = {
            let mut shared = self.shared.write().unwrap();
            (shared.viewport, shared.click.take())
        };

        if let Some(viewport) = viewport {
            self.current_viewport = Some(viewport);
            if let Some(settled) = self.watcher.observe(viewport) {
                self.on_viewport_settled(settled, ctx);
            } else if self.watcher.has_pending() {
                // Keep repainting until the settle delay elapses.
                ctx.request_repaint_after(std::time::Duration::from_millis(100));
            }
        }

        if let Some(click) = click {
            self.on_click(click);
        }

        self.drain_fetch_results();
    }

    fn on_viewport_settled(&mut self, viewport: Viewport, ctx: &egui::Context) {
        match self.session.on_viewport_settled(&viewport) {
            SettleAction::Refreshed => {}
            SettleAction::Fetch(request) => {
                self.fetches_in_flight += 1;
                spawn_fetch(
                    &self.runtime,
                    &self.endpoint,
                    request,
                    self.fetch_tx.clone(),
                    ctx.clone(),
                );
            }
        }
    }

    fn drain_fetch_results(&mut self) {
        while let Ok(result) = self.fetch_rx.try_recv() {
            self.fetches_in_flight = self.fetches_in_flight.saturating_sub(1);
            let Some(viewport) = self.current_viewport else {
                continue;
            };
            match result.rows {
                Ok(rows) => {
                    match self.session.apply_fetch(result.token, rows, &viewport) {
                        ApplyOutcome::Applied => self.fetch_error = None,
                        ApplyOutcome::Stale => {}
                    }
                }
                Err(err) => {
                    // Only a failure of the current request matters; a
                    // superseded one changes nothing either way.
                    if self.session.is_current_request(result.token) {
                        self.fetch_error = Some(err.to_string());
                    }
                }
            }
        }
    }

    fn on_click(&mut self, click: ClickTarget) {
        let Some(viewport) = self.current_viewport else {
            return;
        };
        match click {
            ClickTarget::Cluster(geometry) => {
                if let Some(display) = self.session.select(geometry, &viewport)
                    && !display.is_point()
                {
                    self.pending_zoom_to = Some(display);
                }
            }
            ClickTarget::Background => self.session.unselect(&viewport),
        }
    }

    /// Select a feature from the related panel
    pub fn select_entry(&mut self, geometry: Geometry) {
        self.on_click(ClickTarget::Cluster(geometry));
    }

    /// Clear the selection from the related panel
    pub fn unselect_from_panel(&mut self) {
        self.on_click(ClickTarget::Background);
    }

    /// Show the mouse wheel zoom hint
    pub fn show_wheel_zoom_hint(&mut self) {
        self.show_wheel_hint = true;
        self.wheel_hint_shown_at = Some(instant::Instant::now());
    }

    pub fn hide_wheel_zoom_hint(&mut self) {
        self.show_wheel_hint = false;
    }

    /// Check if the hint should auto-hide (after 0.5 seconds)
    pub fn should_hide_wheel_hint(&self) -> bool {
        self.wheel_hint_shown_at
            .is_some_and(|at| at.elapsed().as_secs_f32() >= 0.5)
    }
}
