//! Crop-region remapping from normalized to raw image space.

use image::DynamicImage;

use super::VisionError;

/// A crop box in raw-image pixel space, clamped to the image bounds.
///
/// Coordinates stay fractional until [`CropRegion::to_pixels`] so the
/// identity remap (equal sizes, zero padding) is exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CropRegion {
    /// Integer pixel box `[x1, y1, x2, y2]`, outward-rounded so the crop
    /// never loses the requested region.
    pub fn to_pixels(&self) -> [u32; 4] {
        [
            self.x1.floor() as u32,
            self.y1.floor() as u32,
            self.x2.ceil() as u32,
            self.y2.ceil() as u32,
        ]
    }
}

/// Translate a box from normalized-image space into raw-image space.
///
/// Each coordinate is scaled by the per-axis raw/normalized ratio, the box is
/// expanded by `padding` raw pixels on every side, and the result is clamped
/// to `[0, raw_width]` × `[0, raw_height]`. A box that collapses to zero or
/// negative area after clamping is rejected.
pub fn remap_bbox(
    bbox: [f64; 4],
    normalized: (u32, u32),
    raw: (u32, u32),
    padding: u32,
) -> Result<CropRegion, VisionError> {
    let (norm_w, norm_h) = normalized;
    let (raw_w, raw_h) = raw;
    if norm_w == 0 || norm_h == 0 || raw_w == 0 || raw_h == 0 {
        return Err(VisionError::EmptyImage);
    }

    let ratio_x = raw_w as f64 / norm_w as f64;
    let ratio_y = raw_h as f64 / norm_h as f64;
    let pad = padding as f64;

    let region = CropRegion {
        x1: (bbox[0] * ratio_x - pad).clamp(0.0, raw_w as f64),
        y1: (bbox[1] * ratio_y - pad).clamp(0.0, raw_h as f64),
        x2: (bbox[2] * ratio_x + pad).clamp(0.0, raw_w as f64),
        y2: (bbox[3] * ratio_y + pad).clamp(0.0, raw_h as f64),
    };

    if region.x1 >= region.x2 || region.y1 >= region.y2 {
        return Err(VisionError::InvalidCropRegion {
            x1: region.x1,
            y1: region.y1,
            x2: region.x2,
            y2: region.y2,
        });
    }

    Ok(region)
}

/// Cut `region` out of the raw image.
pub fn crop_raw(image: &DynamicImage, region: &CropRegion) -> DynamicImage {
    let [x1, y1, x2, y2] = region.to_pixels();
    image.crop_imm(x1, y1, x2 - x1, y2 - y1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn identity_remap_is_exact() {
        let region = remap_bbox([10.0, 20.0, 100.0, 200.0], (640, 480), (640, 480), 0).unwrap();
        assert_eq!(region.x1, 10.0);
        assert_eq!(region.y1, 20.0);
        assert_eq!(region.x2, 100.0);
        assert_eq!(region.y2, 200.0);
    }

    #[test]
    fn coordinates_scale_by_per_axis_ratio() {
        // raw is 2x wider and 3x taller than the normalized image
        let region = remap_bbox([10.0, 10.0, 20.0, 20.0], (100, 100), (200, 300), 0).unwrap();
        assert_eq!(region.x1, 20.0);
        assert_eq!(region.y1, 30.0);
        assert_eq!(region.x2, 40.0);
        assert_eq!(region.y2, 60.0);
    }

    #[test]
    fn padding_expands_every_side() {
        let region = remap_bbox([50.0, 50.0, 60.0, 60.0], (100, 100), (100, 100), 5).unwrap();
        assert_eq!(region.x1, 45.0);
        assert_eq!(region.y1, 45.0);
        assert_eq!(region.x2, 65.0);
        assert_eq!(region.y2, 65.0);
    }

    #[test]
    fn clamping_keeps_box_inside_image() {
        // Out-of-range model coordinates plus generous padding
        let boxes = [
            [-50.0, -50.0, 90.0, 90.0],
            [0.0, 0.0, 500.0, 500.0],
            [10.0, 90.0, 120.0, 130.0],
        ];
        for bbox in boxes {
            let region = remap_bbox(bbox, (100, 100), (80, 60), 56).unwrap();
            assert!(region.x1 >= 0.0 && region.x1 < region.x2 && region.x2 <= 80.0);
            assert!(region.y1 >= 0.0 && region.y1 < region.y2 && region.y2 <= 60.0);
        }
    }

    #[test]
    fn degenerate_box_is_rejected() {
        let result = remap_bbox([50.0, 50.0, 50.0, 50.0], (100, 100), (100, 100), 0);
        assert!(matches!(result, Err(VisionError::InvalidCropRegion { .. })));
    }

    #[test]
    fn inverted_box_is_rejected() {
        let result = remap_bbox([80.0, 80.0, 20.0, 20.0], (100, 100), (100, 100), 0);
        assert!(matches!(result, Err(VisionError::InvalidCropRegion { .. })));
    }

    #[test]
    fn padding_can_rescue_a_point_box() {
        // A zero-area request still crops a padded neighborhood.
        let region = remap_bbox([50.0, 50.0, 50.0, 50.0], (100, 100), (100, 100), 10).unwrap();
        assert_eq!(region.to_pixels(), [40, 40, 60, 60]);
    }

    #[test]
    fn crop_raw_matches_region_dimensions() {
        let raw = DynamicImage::new_rgb8(200, 100);
        let region = remap_bbox([10.0, 10.0, 50.0, 40.0], (200, 100), (200, 100), 0).unwrap();
        let crop = crop_raw(&raw, &region);
        assert_eq!(crop.width(), 40);
        assert_eq!(crop.height(), 30);
    }
}
