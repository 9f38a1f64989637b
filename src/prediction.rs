use rand::Rng;

/// The fixed fortune catalog. Loaded once, never mutated.
pub const PREDICTIONS: [&str; 4] = [
    "Your Heart line shows great emotional depth. You connect with others on a profound level.",
    "The shape of your palm suggests a highly analytical mind. You are a natural problem solver.",
    "A strong Life line energy is detected! You have the resilience to overcome upcoming obstacles.",
    "Your fate line is aligned. A major positive shift is coming in your career within 6 months.",
];

/// Advisory shown when no hand could be found in the uploaded image.
pub const NO_HAND_ADVICE: &str = "No hand detected. Please upload a clearer image.";

/// Draw one fortune uniformly at random. Each call resamples
/// independently; no state carries over between draws.
pub fn draw_prediction<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    PREDICTIONS[rng.random_range(0..PREDICTIONS.len())]
}
