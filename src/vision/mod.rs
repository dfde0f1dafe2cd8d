//! Image handling: normalization into the model's pixel band and
//! coordinate remapping for crop actions.
//!
//! The model only ever sees *normalized* images, so it issues crop
//! coordinates in normalized space; cropping runs against the *raw*
//! full-resolution image to avoid compounding quality loss. [`normalize`]
//! and [`remap_bbox`] are the two halves of that translation.

mod crop;
mod normalize;

pub use crop::{crop_raw, remap_bbox, CropRegion};
pub use normalize::{decode, normalize, NormalizedImage};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    /// The input bytes could not be decoded (or re-encoded) as an image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Zero-area input; rejected before any scale-factor math.
    #[error("image has zero area")]
    EmptyImage,

    /// The crop box collapsed to zero or negative area after clamping.
    #[error("crop region [{x1:.1}, {y1:.1}, {x2:.1}, {y2:.1}] is empty after clamping")]
    InvalidCropRegion { x1: f64, y1: f64, x2: f64, y2: f64 },
}
