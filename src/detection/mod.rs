pub mod engine;
pub mod preprocessing;

use image::DynamicImage;

use crate::models::HandDetection;

pub use engine::LandmarkEngine;

/// The external hand-landmark capability.
///
/// The scan pipeline only ever talks to this trait; the concrete engine
/// (a pretrained model under `rten`) is attached at startup and can be
/// swapped for a stub in tests.
pub trait HandDetector: Send + Sync {
    /// Estimate hand landmarks in the image. Returns one entry per
    /// detected hand, ordered by confidence; an empty vector means no
    /// hand was found.
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<HandDetection>>;
}
