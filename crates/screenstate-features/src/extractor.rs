use image::{imageops, GrayImage};

use crate::brief::{self, BriefPattern, Descriptor};
use crate::fast::{self, Keypoint};

/// Seed for the default BRIEF sampling pattern. Changing it invalidates any
/// descriptors computed with the previous pattern.
const DEFAULT_PATTERN_SEED: u64 = 0x5eed_b81e_f256;

/// Tuning knobs for [`Extractor`].
#[derive(Clone, Copy, Debug)]
pub struct ExtractorConfig {
    /// FAST intensity threshold.
    pub fast_threshold: u8,
    /// Consecutive circle pixels required by FAST (9 = FAST-9).
    pub arc_length: u8,
    /// Keypoint budget: strongest corners kept after suppression.
    pub max_keypoints: usize,
    /// Gaussian sigma applied before descriptor sampling.
    pub blur_sigma: f32,
    /// Seed for the BRIEF test-pair pattern.
    pub pattern_seed: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            arc_length: 9,
            max_keypoints: 500,
            blur_sigma: 2.0,
            pattern_seed: DEFAULT_PATTERN_SEED,
        }
    }
}

/// Keypoints and their index-aligned descriptors for one image.
#[derive(Clone, Debug, Default)]
pub struct Features {
    /// Detected keypoints that received a descriptor.
    pub keypoints: Vec<Keypoint>,
    /// One packed descriptor per keypoint.
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    /// True when the image produced no usable features.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// FAST + BRIEF feature extractor.
///
/// Extraction is deterministic for a fixed image and configuration: the
/// sampling pattern is derived from the configured seed once at construction
/// and corner ordering is fully tie-broken.
pub struct Extractor {
    config: ExtractorConfig,
    pattern: BriefPattern,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl Extractor {
    /// Build an extractor from a configuration.
    pub fn new(config: ExtractorConfig) -> Self {
        let pattern = BriefPattern::from_seed(config.pattern_seed);
        Self { config, pattern }
    }

    /// The configuration this extractor was built with.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Detect corners and describe them.
    ///
    /// Returns empty [`Features`] for images with no detectable corners or
    /// too small to fit a descriptor patch; that is a valid outcome, not an
    /// error.
    pub fn extract(&self, image: &GrayImage) -> Features {
        let mut keypoints =
            fast::detect_corners_nms(image, self.config.fast_threshold, self.config.arc_length);
        keypoints.truncate(self.config.max_keypoints);

        if keypoints.is_empty() {
            return Features::default();
        }

        let smoothed = imageops::blur(image, self.config.blur_sigma);
        let (keypoints, descriptors) = brief::describe(&smoothed, &keypoints, &self.pattern);

        Features {
            keypoints,
            descriptors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// Screenshot-like synthetic content: random uniform 8x8 tiles, which
    /// give FAST plenty of high-contrast corners.
    fn tiled_noise(width: u32, height: u32, seed: u64) -> GrayImage {
        let mut rng = StdRng::seed_from_u64(seed);
        let tiles_x = width.div_ceil(8);
        let tiles_y = height.div_ceil(8);
        let values: Vec<u8> = (0..tiles_x * tiles_y).map(|_| rng.random()).collect();
        GrayImage::from_fn(width, height, |x, y| {
            image::Luma([values[((y / 8) * tiles_x + x / 8) as usize]])
        })
    }

    #[test]
    fn test_extract_finds_features_on_tiles() {
        let img = tiled_noise(160, 120, 3);
        let features = Extractor::default().extract(&img);
        assert!(features.descriptors.len() > 20, "{}", features.descriptors.len());
        assert_eq!(features.keypoints.len(), features.descriptors.len());
    }

    #[test]
    fn test_extract_is_deterministic() {
        let img = tiled_noise(160, 120, 3);
        let extractor = Extractor::default();
        let a = extractor.extract(&img);
        let b = extractor.extract(&img);
        assert_eq!(a.keypoints, b.keypoints);
        assert_eq!(a.descriptors, b.descriptors);
    }

    #[test]
    fn test_extract_flat_image_is_empty() {
        let img = GrayImage::from_pixel(128, 128, image::Luma([90]));
        let features = Extractor::default().extract(&img);
        assert!(features.is_empty());
        assert!(features.keypoints.is_empty());
    }

    #[test]
    fn test_keypoint_budget_respected() {
        let img = tiled_noise(320, 240, 9);
        let config = ExtractorConfig {
            max_keypoints: 10,
            ..Default::default()
        };
        let features = Extractor::new(config).extract(&img);
        assert!(features.keypoints.len() <= 10);
    }
}
