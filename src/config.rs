use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline tunables. Defaults are what the CLI ships with; every field
/// can be overridden by a flag.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Upper bound on a single detection call.
    #[serde(with = "duration_secs")]
    pub detect_timeout: Duration,
    /// Directory holding the `.rten` landmark model. `None` means the
    /// standard cache location.
    pub model_dir: Option<PathBuf>,
    /// Hand-presence scores below this count as "no hand".
    pub score_threshold: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detect_timeout: Duration::from_secs(30),
            model_dir: None,
            score_threshold: crate::detection::engine::DEFAULT_SCORE_THRESHOLD,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
