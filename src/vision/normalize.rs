//! Image normalization into the model's expected pixel band.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage, GenericImageView, RgbImage};

use super::VisionError;

/// A resized, RGB-flattened image together with its embeddable encoding.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// The image as fed to the model (RGB, dimensions inside the band).
    pub image: RgbImage,
    /// `data:image;base64,…` JPEG payload for the model endpoint.
    pub data_uri: String,
}

impl NormalizedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Decode raw bytes into an image.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, VisionError> {
    let image = image::load_from_memory(bytes)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(VisionError::EmptyImage);
    }
    Ok(image)
}

/// Resize `image` so its area lands inside `[min_pixels, max_pixels]`,
/// flatten to RGB, and encode as a JPEG data URI.
///
/// Images already inside the band keep their dimensions. Out-of-band images
/// are scaled by `sqrt(bound / area)` on both axes, so the post-resize area
/// sits at the nearest bound (up to rounding).
pub fn normalize(
    image: &DynamicImage,
    min_pixels: u32,
    max_pixels: u32,
) -> Result<NormalizedImage, VisionError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(VisionError::EmptyImage);
    }

    let (new_width, new_height) = fit_dimensions(width, height, min_pixels, max_pixels);
    let resized = if (new_width, new_height) == (width, height) {
        image.clone()
    } else {
        image.resize_exact(new_width, new_height, FilterType::Triangle)
    };

    // Alpha and palette images must be flattened to the model's 3-channel input.
    let rgb = resized.to_rgb8();
    let data_uri = encode_data_uri(&rgb)?;

    Ok(NormalizedImage {
        image: rgb,
        data_uri,
    })
}

/// Scale `(width, height)` into the pixel band, rounding to the nearest
/// integer and never below 1 per axis.
fn fit_dimensions(width: u32, height: u32, min_pixels: u32, max_pixels: u32) -> (u32, u32) {
    let area = width as f64 * height as f64;
    let factor = if area > max_pixels as f64 {
        (max_pixels as f64 / area).sqrt()
    } else if area < min_pixels as f64 {
        (min_pixels as f64 / area).sqrt()
    } else {
        return (width, height);
    };

    let scale = |dim: u32| ((dim as f64 * factor).round() as u32).max(1);
    (scale(width), scale(height))
}

fn encode_data_uri(rgb: &RgbImage) -> Result<String, VisionError> {
    let mut jpeg = Vec::new();
    JpegEncoder::new(&mut jpeg).encode_image(rgb)?;
    Ok(format!("data:image;base64,{}", STANDARD.encode(&jpeg)))
}
