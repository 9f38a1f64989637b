use anyhow::{anyhow, Context};
use image::DynamicImage;
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::{NdTensor, Tensor};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::preprocessing;
use super::HandDetector;
use crate::models::{HandDetection, Keypoint, LANDMARK_COUNT};

/// Filename of the pretrained landmark model inside the model directory.
const MODEL_FILE: &str = "hand-landmark.rten";
/// Side length of the model's square input.
const INPUT_SIZE: u32 = 224;
/// Presence scores below this are treated as "no hand".
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;

/// Hand-landmark inference engine.
///
/// Wraps a pretrained single-hand landmark model: input is a 224x224 RGB
/// image normalized to `[0, 1]`, the first output is a flat run of
/// 21 x (x, y, z) coordinates in input space, and an optional second
/// output carries a hand-presence score.
pub struct LandmarkEngine {
    model: Model,
    score_threshold: f32,
}

impl LandmarkEngine {
    /// Load the model from the given directory, or from the standard
    /// cache location when none is given.
    pub fn load(model_dir: Option<&Path>) -> anyhow::Result<Self> {
        let model_path = match model_dir {
            Some(dir) => dir.join(MODEL_FILE),
            None => default_model_dir()?.join(MODEL_FILE),
        };

        if !model_path.exists() {
            anyhow::bail!(
                "Hand landmark model not found at {}.\n\
                 Convert a MediaPipe hand-landmark model with rten-convert and \
                 place it there, or pass --model-dir.",
                model_path.display()
            );
        }

        let model = Model::load_file(&model_path)
            .with_context(|| format!("Failed to load landmark model {}", model_path.display()))?;
        debug!("loaded landmark model from {}", model_path.display());

        Ok(Self {
            model,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        })
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    fn run_model(&self, image: &DynamicImage) -> anyhow::Result<(Vec<f32>, f32)> {
        let data = preprocessing::to_model_input(image, INPUT_SIZE);
        let input = NdTensor::from_data(
            [1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3],
            data,
        );

        let input_id = *self
            .model
            .input_ids()
            .first()
            .ok_or_else(|| anyhow!("landmark model declares no inputs"))?;
        let output_ids = self.model.output_ids().to_vec();

        let mut outputs = self
            .model
            .run(vec![(input_id, input.view().into())], &output_ids, None)
            .map_err(|e| anyhow!("landmark inference failed: {}", e))?;

        if outputs.is_empty() {
            anyhow::bail!("landmark model produced no outputs");
        }

        // Remaining outputs (presence score first, if the model has one).
        let score = if outputs.len() > 1 {
            let tensor: Tensor<f32> = outputs
                .remove(1)
                .try_into()
                .map_err(|_| anyhow!("unexpected score output type"))?;
            tensor.iter().next().copied().unwrap_or(0.0)
        } else {
            1.0
        };

        let landmarks: Tensor<f32> = outputs
            .remove(0)
            .try_into()
            .map_err(|_| anyhow!("unexpected landmark output type"))?;
        let coords: Vec<f32> = landmarks.iter().copied().collect();

        Ok((coords, score))
    }
}

impl HandDetector for LandmarkEngine {
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<HandDetection>> {
        let (coords, score) = self.run_model(image)?;

        if score < self.score_threshold {
            debug!("hand presence score {:.3} below threshold", score);
            return Ok(Vec::new());
        }

        if coords.len() < LANDMARK_COUNT * 3 {
            anyhow::bail!(
                "landmark model returned {} values, expected at least {}",
                coords.len(),
                LANDMARK_COUNT * 3
            );
        }

        // Coordinates arrive as (x, y, z) triples in input space; z is
        // depth relative to the wrist and is not used here.
        let (width, height) = (image.width(), image.height());
        let keypoints = coords
            .chunks_exact(3)
            .take(LANDMARK_COUNT)
            .map(|triple| {
                Keypoint::new(
                    preprocessing::to_source_coord(triple[0], INPUT_SIZE, width),
                    preprocessing::to_source_coord(triple[1], INPUT_SIZE, height),
                )
            })
            .collect();

        Ok(vec![HandDetection { keypoints, score }])
    }
}

/// Standard model cache location, mirroring where other model-backed
/// tools on this machine keep their weights.
fn default_model_dir() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
    Ok(Path::new(&home_dir).join(".cache/palm-predictor"))
}
