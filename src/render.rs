//! Decorative palm-line rendering.
//!
//! The two curves drawn here ("heart line" and "life line") are purely
//! cosmetic. The keypoints only serve as anchor/offset positions; nothing
//! analytical is derived from the geometry.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_cubic_bezier_curve_mut;

use crate::models::{Keypoint, INDEX_FINGER_BASE, PINKY_BASE, WRIST};
use crate::pipeline::ScanError;

/// Stroke color for the palm lines (the original's glowing teal).
const LINE_COLOR: Rgba<u8> = Rgba([0, 255, 204, 255]);
/// Dimmer halo painted underneath the core stroke.
const GLOW_COLOR: Rgba<u8> = Rgba([0, 140, 112, 255]);
/// Half-width of the core stroke in pixels.
const CORE_RADIUS: i32 = 2;
/// Half-width of the glow pass in pixels.
const GLOW_RADIUS: i32 = 4;

/// A single quadratic curve: start, control and end anchors in image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSpec {
    pub start: (f32, f32),
    pub control: (f32, f32),
    pub end: (f32, f32),
}

/// Compute the two palm curves from a landmark run.
///
/// Requires the wrist (0), index-finger base (5) and pinky base (17)
/// landmarks to be present. The offsets are fixed; they position the
/// curves over the palm rather than tracing any anatomical feature.
pub fn palm_curves(keypoints: &[Keypoint]) -> Result<[CurveSpec; 2], ScanError> {
    if keypoints.len() <= PINKY_BASE {
        return Err(ScanError::TooFewLandmarks {
            got: keypoints.len(),
        });
    }

    let wrist = keypoints[WRIST];
    let index_base = keypoints[INDEX_FINGER_BASE];
    let pinky_base = keypoints[PINKY_BASE];

    // Heart line: pinky base curving toward the index base.
    let heart = CurveSpec {
        start: (pinky_base.x, pinky_base.y + 20.0),
        control: (index_base.x, index_base.y + 40.0),
        end: (index_base.x - 20.0, index_base.y + 10.0),
    };

    // Life line: between index and thumb, curving down to the wrist.
    let life = CurveSpec {
        start: (index_base.x - 30.0, index_base.y + 30.0),
        control: (wrist.x + 40.0, wrist.y - 50.0),
        end: (wrist.x + 10.0, wrist.y - 10.0),
    };

    Ok([heart, life])
}

/// Stroke both palm lines onto an already image-painted canvas.
pub fn draw_palm_lines(canvas: &mut RgbaImage, keypoints: &[Keypoint]) -> Result<(), ScanError> {
    let curves = palm_curves(keypoints)?;
    for curve in &curves {
        stroke_quadratic(canvas, curve, GLOW_RADIUS, GLOW_COLOR);
    }
    for curve in &curves {
        stroke_quadratic(canvas, curve, CORE_RADIUS, LINE_COLOR);
    }
    Ok(())
}

/// Stroke a quadratic curve with the given half-width by drawing offset
/// passes of the raster bezier routine (which draws single-pixel lines).
fn stroke_quadratic(canvas: &mut RgbaImage, curve: &CurveSpec, radius: i32, color: Rgba<u8>) {
    let (c1, c2) = elevate_to_cubic(curve);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let (ox, oy) = (dx as f32, dy as f32);
            draw_cubic_bezier_curve_mut(
                canvas,
                (curve.start.0 + ox, curve.start.1 + oy),
                (curve.end.0 + ox, curve.end.1 + oy),
                (c1.0 + ox, c1.1 + oy),
                (c2.0 + ox, c2.1 + oy),
                color,
            );
        }
    }
}

/// Degree-elevate a quadratic bezier to the cubic form the raster routine
/// expects. The shape is identical.
fn elevate_to_cubic(curve: &CurveSpec) -> ((f32, f32), (f32, f32)) {
    let c1 = (
        curve.start.0 + 2.0 / 3.0 * (curve.control.0 - curve.start.0),
        curve.start.1 + 2.0 / 3.0 * (curve.control.1 - curve.start.1),
    );
    let c2 = (
        curve.end.0 + 2.0 / 3.0 * (curve.control.0 - curve.end.0),
        curve.end.1 + 2.0 / 3.0 * (curve.control.1 - curve.end.1),
    );
    (c1, c2)
}
