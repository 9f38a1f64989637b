use image::{imageops, DynamicImage};

/// Resize the source image to the model's square input and normalize the
/// pixels to `[0, 1]` floats in NHWC order.
pub fn to_model_input(image: &DynamicImage, input_size: u32) -> Vec<f32> {
    let rgb = image.to_rgb8();
    let resized = imageops::resize(
        &rgb,
        input_size,
        input_size,
        imageops::FilterType::Triangle,
    );

    let mut data = Vec::with_capacity((input_size * input_size * 3) as usize);
    for pixel in resized.pixels() {
        for channel in pixel.0 {
            data.push(channel as f32 / 255.0);
        }
    }
    data
}

/// Map a coordinate from model-input space back into source-image pixels.
pub fn to_source_coord(value: f32, input_size: u32, source_extent: u32) -> f32 {
    value / input_size as f32 * source_extent as f32
}
