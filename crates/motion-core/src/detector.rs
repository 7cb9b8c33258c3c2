//! Frame differencing and changed-region extraction.
//!
//! The detector compares each incoming grayscale frame against a reference
//! frame: absolute difference, binary threshold, morphological dilation to
//! merge nearby changed pixels, then connected-component labelling. A
//! region counts as motion once its changed-pixel area meets the
//! configured minimum; the first qualifying region is reported and the
//! scan stops there (one detection is enough to act on).

use std::collections::BTreeMap;

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::map::map_colors2;
use imageproc::morphology::dilate;
use imageproc::region_labelling::{connected_components, Connectivity};

/// Tuning for the background-subtraction detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Minimum changed-pixel area (px^2) for a region to count as motion.
    pub min_area: u32,

    /// Per-pixel absolute difference above which a pixel is "changed".
    pub diff_threshold: u8,

    /// Dilation radius (L-inf) used to merge nearby changed pixels.
    /// Dilation only affects how pixels group into regions; region area is
    /// measured on the pre-dilation mask.
    pub dilate_radius: u8,

    /// Gaussian blur sigma applied by [`MotionDetector::preprocess`].
    pub blur_sigma: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_area: 500,
            diff_threshold: 25,
            dilate_radius: 2,
            blur_sigma: 3.5,
        }
    }
}

/// A changed region that met the minimum area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionRegion {
    /// Number of changed pixels in the region (pre-dilation).
    pub area: u32,

    /// Bounding box of the changed pixels.
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Background-subtraction motion detector over grayscale frames.
pub struct MotionDetector {
    config: DetectorConfig,
}

#[derive(Debug, Clone, Copy)]
struct RegionAcc {
    area: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl MotionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(DetectorConfig::default())
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Blur a raw frame so sensor noise does not register as change.
    ///
    /// Both the reference frame and every compared frame must go through
    /// this with the same settings, so callers preprocess once per frame
    /// and keep the result.
    pub fn preprocess(&self, frame: &GrayImage) -> GrayImage {
        gaussian_blur_f32(frame, self.config.blur_sigma)
    }

    /// Compare a preprocessed frame against the reference frame.
    ///
    /// Returns the first region whose changed-pixel area meets
    /// `min_area`, or `None` when nothing qualifies. Frames of different
    /// dimensions never match (the caller reseeds its reference instead).
    pub fn detect(&self, reference: &GrayImage, frame: &GrayImage) -> Option<MotionRegion> {
        if reference.dimensions() != frame.dimensions() {
            return None;
        }

        let mask = self.delta_mask(reference, frame);
        let merged = dilate(&mask, Norm::LInf, self.config.dilate_radius);
        let labels = connected_components(&merged, Connectivity::Eight, Luma([0u8]));

        // Accumulate changed-pixel counts and bounding boxes per label.
        // Labels are assigned in raster order, so ascending label order is
        // "first region found" order.
        let mut regions: BTreeMap<u32, RegionAcc> = BTreeMap::new();
        for (x, y, px) in mask.enumerate_pixels() {
            if px[0] == 0 {
                continue;
            }
            let label = labels.get_pixel(x, y)[0];
            regions
                .entry(label)
                .and_modify(|acc| {
                    acc.area += 1;
                    acc.min_x = acc.min_x.min(x);
                    acc.min_y = acc.min_y.min(y);
                    acc.max_x = acc.max_x.max(x);
                    acc.max_y = acc.max_y.max(y);
                })
                .or_insert(RegionAcc {
                    area: 1,
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                });
        }

        for acc in regions.values() {
            if acc.area < self.config.min_area {
                continue;
            }
            let region = MotionRegion {
                area: acc.area,
                x: acc.min_x,
                y: acc.min_y,
                width: acc.max_x - acc.min_x + 1,
                height: acc.max_y - acc.min_y + 1,
            };
            tracing::debug!(
                area = region.area,
                x = region.x,
                y = region.y,
                "Changed region met minimum area"
            );
            return Some(region);
        }

        None
    }

    /// Threshold the absolute difference into a binary mask in one pass.
    fn delta_mask(&self, reference: &GrayImage, frame: &GrayImage) -> GrayImage {
        let threshold = self.config.diff_threshold;
        map_colors2(reference, frame, |r, f| {
            if r[0].abs_diff(f[0]) > threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }
}
