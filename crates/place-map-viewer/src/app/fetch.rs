//! HTTP feature source and the channel that delivers results back to the
//! UI thread
//!
//! Fetches run as tokio tasks; there is no cancellation. The engine
//! discards superseded responses by token, so a slow fetch simply
//! completes into the channel and is ignored.

use place_map_lib::{DataSource, FeatureRow, FetchRequest, MapError, RequestToken, Result};
use std::sync::mpsc;

/// The `_objects/` endpoint supplying feature rows for a bounding box
#[derive(Clone)]
pub struct ObjectsEndpoint {
    url: String,
    client: reqwest::Client,
}

impl ObjectsEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl DataSource for ObjectsEndpoint {
    fn fetch(
        &self,
        request: FetchRequest,
    ) -> impl std::future::Future<Output = Result<Vec<FeatureRow>>> + Send + 'static {
        let url = self.url.clone();
        let client = self.client.clone();
        async move {
            let extent = &request.extent_wgs84;
            let bbox = format!(
                "{},{},{},{}",
                extent.min().x,
                extent.min().y,
                extent.max().x,
                extent.max().y
            );
            let zoom = (request.zoom.round() as i64).to_string();
            let response = client
                .get(&url)
                .query(&[("bbox", bbox.as_str()), ("zoom", zoom.as_str())])
                .send()
                .await
                .map_err(|err| MapError::DataFetch(err.to_string()))?;
            let response = response
                .error_for_status()
                .map_err(|err| MapError::DataFetch(err.to_string()))?;
            response
                .json::<Vec<FeatureRow>>()
                .await
                .map_err(|err| MapError::DataFetch(err.to_string()))
        }
    }
}

/// One completed fetch, stale or not; the session decides
pub struct FetchResult {
    pub token: RequestToken,
    pub rows: Result<Vec<FeatureRow>>,
}

/// Run a fetch in the background and deliver its result to the UI thread.
///
/// Repaint is requested on completion so the result is applied promptly
/// even while the UI is otherwise idle.
pub fn spawn_fetch(
    runtime: &tokio::runtime::Handle,
    source: &ObjectsEndpoint,
    request: FetchRequest,
    tx: mpsc::Sender<FetchResult>,
    ctx: egui::Context,
) {
    let token = request.token;
    let future = source.fetch(request);
    runtime.spawn(async move {
        let rows = future.await;
        if let Err(err) = &rows {
            tracing::warn!(%err, "feature fetch failed");
        }
        // The receiver only disappears on shutdown.
        let _ = tx.send(FetchResult { token, rows });
        ctx.request_repaint();
    });
}
