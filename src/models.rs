/// Number of landmarks the hand model reports for a single hand.
pub const LANDMARK_COUNT: usize = 21;

/// Landmark indices used by the palm line renderer.
/// The model orders keypoints anatomically: 0 is the wrist, 5 the base of
/// the index finger, 17 the base of the pinky.
pub const WRIST: usize = 0;
pub const INDEX_FINGER_BASE: usize = 5;
pub const PINKY_BASE: usize = 17;

/// A single hand landmark in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One detected hand: an ordered run of keypoints plus the model's
/// presence score. Discarded after the render pass that consumes it.
#[derive(Debug, Clone)]
pub struct HandDetection {
    pub keypoints: Vec<Keypoint>,
    pub score: f32,
}

impl HandDetection {
    /// Whether the detection carries enough landmarks for the palm line
    /// renderer (it indexes up to the pinky base).
    pub fn has_palm_landmarks(&self) -> bool {
        self.keypoints.len() > PINKY_BASE
    }
}
