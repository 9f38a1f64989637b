mod common;

use common::fixtures::{
    test_photo, test_photo_file, BrokenDetector, FakeDetector, SlowDetector,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use palm_predictor::models::{HandDetection, Keypoint};
use palm_predictor::pipeline::{PalmScanner, ScanError, ScanEvent, ScanOutcome, UiState};
use palm_predictor::prediction::{NO_HAND_ADVICE, PREDICTIONS};
use palm_predictor::ScanConfig;

fn scanner_with(detector: impl palm_predictor::HandDetector + 'static) -> PalmScanner {
    let scanner = PalmScanner::new(ScanConfig::default());
    scanner.attach_detector(Arc::new(detector));
    scanner
}

#[tokio::test]
async fn scan_with_hand_ends_result_ready() -> anyhow::Result<()> {
    let scanner = scanner_with(FakeDetector::one_hand());

    let outcome = scanner.scan(test_photo()).await?;
    assert_eq!(scanner.state(), UiState::ResultReady);

    match outcome {
        ScanOutcome::Reading {
            canvas,
            keypoints,
            prediction,
        } => {
            assert_eq!(canvas.dimensions(), (320, 240));
            assert_eq!(keypoints[0], Keypoint::new(100.0, 200.0));
            assert_eq!(keypoints[5], Keypoint::new(150.0, 120.0));
            assert_eq!(keypoints[17], Keypoint::new(80.0, 130.0));
            assert!(PREDICTIONS.contains(&prediction));
        }
        other => panic!("expected a reading, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn scan_paints_photo_and_lines_onto_canvas() -> anyhow::Result<()> {
    let scanner = scanner_with(FakeDetector::one_hand());

    let outcome = scanner.scan(test_photo()).await?;
    let ScanOutcome::Reading { canvas, .. } = outcome else {
        panic!("expected a reading");
    };

    // The canvas starts as the photo; the stroke color only appears
    // because the renderer drew over it.
    let teal = image::Rgba([0u8, 255, 204, 255]);
    assert!(canvas.pixels().any(|p| *p == teal));
    // Untouched corner still holds the photo pixel.
    assert_eq!(*canvas.get_pixel(0, 0), image::Rgba([180, 150, 130, 255]));
    Ok(())
}

#[tokio::test]
async fn scan_with_no_hand_shows_advice() -> anyhow::Result<()> {
    let scanner = scanner_with(FakeDetector::no_hands());

    let outcome = scanner.scan(test_photo()).await?;
    assert_eq!(scanner.state(), UiState::NoHandDetected);

    match outcome {
        ScanOutcome::NoHand { advice } => assert_eq!(advice, NO_HAND_ADVICE),
        other => panic!("expected no-hand outcome, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn scan_without_detector_is_rejected_without_transition() {
    let scanner = PalmScanner::new(ScanConfig::default());
    assert!(!scanner.detector_ready());

    let result = scanner.scan(test_photo()).await;
    assert!(matches!(result, Err(ScanError::DetectorNotReady)));
    assert_eq!(scanner.state(), UiState::Idle);
}

#[tokio::test]
async fn concurrent_scan_is_rejected() {
    let scanner = scanner_with(SlowDetector {
        delay: Duration::from_millis(200),
        hands: Vec::new(),
    });

    let (first, second) = tokio::join!(scanner.scan(test_photo()), scanner.scan(test_photo()));

    // The overlapping call fails fast; the original run completes.
    assert!(matches!(second, Err(ScanError::ScanInFlight)));
    assert!(matches!(first, Ok(ScanOutcome::NoHand { .. })));
}

#[tokio::test]
async fn slow_detection_trips_the_timeout() {
    let config = ScanConfig {
        detect_timeout: Duration::from_millis(50),
        ..ScanConfig::default()
    };
    let scanner = PalmScanner::new(config);
    scanner.attach_detector(Arc::new(SlowDetector {
        delay: Duration::from_millis(500),
        hands: Vec::new(),
    }));

    let result = scanner.scan(test_photo()).await;
    assert!(matches!(result, Err(ScanError::DetectionTimeout(_))));
    assert_eq!(scanner.state(), UiState::Idle);
}

#[tokio::test]
async fn failed_detection_returns_to_idle() {
    let scanner = scanner_with(BrokenDetector);

    let result = scanner.scan(test_photo()).await;
    assert!(matches!(result, Err(ScanError::DetectionFailed(_))));
    assert_eq!(scanner.state(), UiState::Idle);

    // The pipeline is usable again after the failure.
    scanner.attach_detector(Arc::new(FakeDetector::no_hands()));
    let outcome = scanner.scan(test_photo()).await.unwrap();
    assert!(matches!(outcome, ScanOutcome::NoHand { .. }));
}

#[tokio::test]
async fn short_landmark_run_is_an_error_not_a_panic() {
    let scanner = scanner_with(FakeDetector {
        hands: vec![HandDetection {
            keypoints: vec![Keypoint::new(1.0, 2.0); 5],
            score: 0.9,
        }],
    });

    let result = scanner.scan(test_photo()).await;
    assert!(matches!(
        result,
        Err(ScanError::TooFewLandmarks { got: 5 })
    ));
    assert_eq!(scanner.state(), UiState::Idle);
}

#[tokio::test]
async fn undecodable_file_is_a_decode_error() -> anyhow::Result<()> {
    let scanner = scanner_with(FakeDetector::one_hand());

    let mut file = tempfile::Builder::new().suffix(".png").tempfile()?;
    file.write_all(b"not an image at all")?;

    let result = scanner.scan_path(file.path()).await;
    assert!(matches!(result, Err(ScanError::Decode(_))));
    assert_eq!(scanner.state(), UiState::Idle);
    Ok(())
}

#[tokio::test]
async fn scan_path_reads_a_real_file() -> anyhow::Result<()> {
    let scanner = scanner_with(FakeDetector::one_hand());
    let file = test_photo_file();

    let outcome = scanner.scan_path(file.path()).await?;
    assert!(matches!(outcome, ScanOutcome::Reading { .. }));
    Ok(())
}

#[tokio::test]
async fn rescan_after_result_works() -> anyhow::Result<()> {
    let scanner = scanner_with(FakeDetector::one_hand());

    scanner.scan(test_photo()).await?;
    assert_eq!(scanner.state(), UiState::ResultReady);

    scanner.scan(test_photo()).await?;
    assert_eq!(scanner.state(), UiState::ResultReady);
    Ok(())
}

#[test]
fn transition_function_is_total() {
    use ScanEvent::*;
    use UiState::*;

    assert_eq!(Idle.apply(ModelRequested), ModelLoading);
    assert_eq!(ModelLoading.apply(ModelReady), Idle);
    assert_eq!(Idle.apply(ScanStarted), Scanning);
    assert_eq!(Scanning.apply(HandFound), ResultReady);
    assert_eq!(Scanning.apply(NoHand), NoHandDetected);
    assert_eq!(Scanning.apply(ScanFailed), Idle);
    assert_eq!(ResultReady.apply(ScanStarted), Scanning);
    assert_eq!(NoHandDetected.apply(ScanStarted), Scanning);

    // Nonsensical events leave the state alone.
    assert_eq!(Idle.apply(HandFound), Idle);
    assert_eq!(ResultReady.apply(NoHand), ResultReady);
    assert_eq!(Scanning.apply(ScanStarted), Scanning);
    assert_eq!(Idle.apply(ModelReady), Idle);
}
