pub mod cache;
pub mod config;
pub mod detection;
pub mod models;
pub mod pipeline;
pub mod prediction;
pub mod render;

pub use cache::{Asset, AssetCache, AssetFetcher, AssetSource, CacheLifecycle};
pub use config::ScanConfig;
pub use detection::{HandDetector, LandmarkEngine};
pub use models::{HandDetection, Keypoint};
pub use pipeline::{PalmScanner, ScanError, ScanEvent, ScanOutcome, UiState};
pub use render::{palm_curves, CurveSpec};
