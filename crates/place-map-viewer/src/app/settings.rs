use clap::Parser;
use place_map_lib::{ClusterOptions, MapConfig};

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Place Map Viewer - An interactive map of place features with
/// viewport-driven clustering and incremental loading
pub struct Settings {
    /// Feature data endpoint queried with `bbox` and `zoom` parameters
    #[clap(short, long, default_value = "http://localhost:8000/map/_objects/")]
    pub objects_url: String,

    /// Refresh features from the server as the viewport moves
    #[clap(long, default_value = "true")]
    pub dynamic: bool,

    /// Merge radius for clustering, in screen pixels
    #[clap(long, default_value = "20.0")]
    pub cluster_distance: f64,

    /// Minimum cluster size; smaller clusters render as individual features
    #[clap(long, default_value = "1")]
    pub cluster_threshold: usize,

    /// Keep clustering active at every zoom level
    #[clap(long, default_value = "true")]
    pub cluster_all_zoom_levels: bool,

    /// Proximity threshold for the "things near" list, in map units
    #[clap(long, default_value = "500.0")]
    pub related_distance: f64,

    /// Initial map center latitude
    #[clap(long, default_value = "37.7749")]
    pub start_lat: f64,

    /// Initial map center longitude
    #[clap(long, default_value = "-122.4194")]
    pub start_lon: f64,

    /// Initial zoom level
    #[clap(long, default_value = "14.0")]
    pub start_zoom: f64,
}

impl Settings {
    pub fn from_cli() -> Self {
        Settings::parse()
    }

    /// Engine configuration derived from the CLI flags
    pub fn map_config(&self) -> MapConfig {
        MapConfig {
            dynamic: self.dynamic,
            cluster: ClusterOptions {
                pixel_distance: self.cluster_distance,
                threshold: self.cluster_threshold,
                cluster_all_zoom_levels: self.cluster_all_zoom_levels,
            },
            related_distance: self.related_distance,
            padding_factor: 1.5,
        }
    }
}
