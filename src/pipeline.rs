use image::{DynamicImage, RgbaImage};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ScanConfig;
use crate::detection::HandDetector;
use crate::models::{HandDetection, Keypoint};
use crate::prediction::{self, NO_HAND_ADVICE};
use crate::render;

/// The mutually-exclusive display mode of the app at any instant.
///
/// Exactly one state holds at a time; the scanner is the sole owner and
/// every transition goes through [`UiState::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    Idle,
    ModelLoading,
    Scanning,
    ResultReady,
    NoHandDetected,
}

/// Pipeline events that drive UI state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    ModelRequested,
    ModelReady,
    ScanStarted,
    HandFound,
    NoHand,
    ScanFailed,
}

impl UiState {
    /// Total transition function. Events that make no sense in the
    /// current state leave it unchanged rather than panicking.
    pub fn apply(self, event: ScanEvent) -> UiState {
        use ScanEvent::*;
        use UiState::*;
        match (self, event) {
            (_, ModelRequested) => ModelLoading,
            (ModelLoading, ModelReady) => Idle,
            (Idle | ResultReady | NoHandDetected, ScanStarted) => Scanning,
            (Scanning, HandFound) => ResultReady,
            (Scanning, NoHand) => NoHandDetected,
            (Scanning, ScanFailed) => Idle,
            (state, _) => state,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Detector is not ready; the scan was ignored")]
    DetectorNotReady,
    #[error("A scan is already in flight; concurrent scans are rejected")]
    ScanInFlight,
    #[error("Hand detection timed out after {0:?}")]
    DetectionTimeout(Duration),
    #[error("Hand detection failed: {0}")]
    DetectionFailed(#[source] anyhow::Error),
    #[error("Detection carried only {got} landmarks; palm lines need the pinky base")]
    TooFewLandmarks { got: usize },
}

/// What a completed scan produced.
#[derive(Debug)]
pub enum ScanOutcome {
    /// A hand was found: the photo with palm lines drawn over it, the
    /// landmarks that anchored them and the sampled fortune.
    Reading {
        canvas: RgbaImage,
        keypoints: Vec<Keypoint>,
        prediction: &'static str,
    },
    /// No hand in the picture; `advice` is the fixed user-facing message.
    NoHand { advice: &'static str },
}

/// Drives the upload -> detect -> render -> predict pipeline.
///
/// Owns the UI state and the (optional) detector handle. One scan may be
/// in flight at a time; a second call while one is pending is rejected,
/// and scans without an attached detector are rejected without touching
/// the UI state.
pub struct PalmScanner {
    detector: Mutex<Option<Arc<dyn HandDetector>>>,
    state: Mutex<UiState>,
    in_flight: AtomicBool,
    config: ScanConfig,
}

/// Clears the in-flight flag even when a scan future is dropped mid-way.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PalmScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            detector: Mutex::new(None),
            state: Mutex::new(UiState::Idle),
            in_flight: AtomicBool::new(false),
            config,
        }
    }

    pub fn state(&self) -> UiState {
        *self.state.lock().expect("ui state lock poisoned")
    }

    fn transition(&self, event: ScanEvent) {
        let mut state = self.state.lock().expect("ui state lock poisoned");
        let from = *state;
        let next = from.apply(event);
        debug!(?event, ?from, to = ?next, "ui transition");
        *state = next;
    }

    pub fn detector_ready(&self) -> bool {
        self.detector
            .lock()
            .expect("detector lock poisoned")
            .is_some()
    }

    fn detector_handle(&self) -> Option<Arc<dyn HandDetector>> {
        self.detector
            .lock()
            .expect("detector lock poisoned")
            .clone()
    }

    /// Attach the detection capability produced by `loader`, surfacing the
    /// `ModelLoading` state while it runs. The loader executes on a
    /// blocking task since model deserialization is CPU-bound.
    pub async fn initialize<F>(&self, loader: F) -> anyhow::Result<()>
    where
        F: FnOnce() -> anyhow::Result<Arc<dyn HandDetector>> + Send + 'static,
    {
        self.transition(ScanEvent::ModelRequested);
        let result = tokio::task::spawn_blocking(loader)
            .await
            .map_err(|e| anyhow::anyhow!("model loader task panicked: {}", e))?;
        self.transition(ScanEvent::ModelReady);

        match result {
            Ok(detector) => {
                *self.detector.lock().expect("detector lock poisoned") = Some(detector);
                info!("hand landmark model ready");
                Ok(())
            }
            // No recovery path: the scanner stays without a handle and
            // every scan is rejected until a later initialize succeeds.
            Err(e) => Err(e),
        }
    }

    /// Attach an already-built detector (used by tests and embedders).
    pub fn attach_detector(&self, detector: Arc<dyn HandDetector>) {
        *self.detector.lock().expect("detector lock poisoned") = Some(detector);
    }

    /// Decode an image file and scan it.
    pub async fn scan_path(&self, path: &Path) -> Result<ScanOutcome, ScanError> {
        let image = image::open(path).map_err(ScanError::Decode)?;
        self.scan(image).await
    }

    /// Run the full pipeline on a decoded image.
    pub async fn scan(&self, image: DynamicImage) -> Result<ScanOutcome, ScanError> {
        let Some(detector) = self.detector_handle() else {
            debug!("scan ignored: no detector handle");
            return Err(ScanError::DetectorNotReady);
        };
        if self.in_flight.swap(true, Ordering::AcqRel) {
            warn!("scan rejected: another scan is in flight");
            return Err(ScanError::ScanInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let scan_id = Uuid::new_v4();
        debug!(%scan_id, width = image.width(), height = image.height(), "scan started");

        // Canvas sized to the image's native dimensions, photo painted first.
        let mut canvas = image.to_rgba8();

        self.transition(ScanEvent::ScanStarted);

        let hands = match self.run_detection(detector, image).await {
            Ok(hands) => hands,
            Err(e) => {
                self.transition(ScanEvent::ScanFailed);
                return Err(e);
            }
        };

        let Some(first) = hands.into_iter().next() else {
            info!(%scan_id, "no hand detected");
            self.transition(ScanEvent::NoHand);
            return Ok(ScanOutcome::NoHand {
                advice: NO_HAND_ADVICE,
            });
        };

        if let Err(e) = render::draw_palm_lines(&mut canvas, &first.keypoints) {
            self.transition(ScanEvent::ScanFailed);
            return Err(e);
        }

        let prediction = prediction::draw_prediction(&mut rand::rng());
        self.transition(ScanEvent::HandFound);
        info!(%scan_id, score = first.score, "palm reading ready");

        Ok(ScanOutcome::Reading {
            canvas,
            keypoints: first.keypoints,
            prediction,
        })
    }

    /// Run the blocking detection call off the runtime, bounded by the
    /// configured timeout so a stalled model cannot hang the pipeline.
    async fn run_detection(
        &self,
        detector: Arc<dyn HandDetector>,
        image: DynamicImage,
    ) -> Result<Vec<HandDetection>, ScanError> {
        let timeout = self.config.detect_timeout;
        let task = tokio::task::spawn_blocking(move || detector.detect(&image));

        match tokio::time::timeout(timeout, task).await {
            Err(_) => Err(ScanError::DetectionTimeout(timeout)),
            Ok(Err(join_err)) => Err(ScanError::DetectionFailed(anyhow::anyhow!(
                "detection task panicked: {}",
                join_err
            ))),
            Ok(Ok(Err(e))) => Err(ScanError::DetectionFailed(e)),
            Ok(Ok(Ok(hands))) => Ok(hands),
        }
    }
}
