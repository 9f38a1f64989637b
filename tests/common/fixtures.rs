#![allow(dead_code)]

use image::{DynamicImage, ImageBuffer, Rgb};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::NamedTempFile;

use palm_predictor::cache::{Asset, AssetFetcher};
use palm_predictor::detection::HandDetector;
use palm_predictor::models::{HandDetection, Keypoint, LANDMARK_COUNT};

/// A 320x240 flat test photo, decodable by the pipeline.
pub fn test_photo() -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(320, 240, |_, _| {
        Rgb([180u8, 150u8, 130u8])
    }))
}

/// Writes a decodable PNG to a temp file and returns the handle.
/// The file is cleaned up when the handle drops.
pub fn test_photo_file() -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    test_photo()
        .save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// A full 21-landmark hand with the anchor points the renderer uses at
/// known positions: wrist (100, 200), index base (150, 120), pinky
/// base (80, 130).
pub fn full_hand_keypoints() -> Vec<Keypoint> {
    let mut keypoints = vec![Keypoint::new(0.0, 0.0); LANDMARK_COUNT];
    keypoints[0] = Keypoint::new(100.0, 200.0);
    keypoints[5] = Keypoint::new(150.0, 120.0);
    keypoints[17] = Keypoint::new(80.0, 130.0);
    keypoints
}

/// Detector stub that always reports the given hands.
pub struct FakeDetector {
    pub hands: Vec<HandDetection>,
}

impl FakeDetector {
    pub fn one_hand() -> Self {
        Self {
            hands: vec![HandDetection {
                keypoints: full_hand_keypoints(),
                score: 0.9,
            }],
        }
    }

    pub fn no_hands() -> Self {
        Self { hands: Vec::new() }
    }
}

impl HandDetector for FakeDetector {
    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<HandDetection>> {
        Ok(self.hands.clone())
    }
}

/// Detector stub that blocks for a fixed time before answering, for
/// exercising the timeout and in-flight paths.
pub struct SlowDetector {
    pub delay: Duration,
    pub hands: Vec<HandDetection>,
}

impl HandDetector for SlowDetector {
    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<HandDetection>> {
        std::thread::sleep(self.delay);
        Ok(self.hands.clone())
    }
}

/// Detector stub whose inference always errors.
pub struct BrokenDetector;

impl HandDetector for BrokenDetector {
    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<HandDetection>> {
        anyhow::bail!("model backend unavailable")
    }
}

/// In-memory fetcher with a call counter, standing in for the network.
pub struct MemoryFetcher {
    bodies: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new(bodies: &[(&str, &[u8])]) -> Self {
        Self {
            bodies: bodies
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_vec()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fetcher preloaded with plausible bodies for the full manifest.
    pub fn site() -> Self {
        Self::new(&[
            ("/", b"<html>index</html>".as_slice()),
            ("/index.html", b"<html>index</html>".as_slice()),
            ("/style.css", b"body { margin: 0 }".as_slice()),
            ("/app.js", b"console.log('palm')".as_slice()),
            ("/manifest.json", b"{\"name\":\"palm-predictor\"}".as_slice()),
        ])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AssetFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<Asset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| anyhow::anyhow!("404 for {}", url))?
            .clone();
        Ok(Asset {
            url: url.to_string(),
            content_type: None,
            body,
        })
    }
}
