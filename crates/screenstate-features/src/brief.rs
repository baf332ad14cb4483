use image::GrayImage;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::fast::Keypoint;

/// Number of bytes in a packed descriptor.
pub const DESCRIPTOR_BYTES: usize = 32;

/// Number of intensity tests per descriptor (one bit each).
pub const DESCRIPTOR_BITS: usize = DESCRIPTOR_BYTES * 8;

/// Half-width of the square sampling patch around a keypoint.
pub const PATCH_RADIUS: u32 = 15;

/// A packed 256-bit BRIEF descriptor, compared by Hamming distance.
pub type Descriptor = [u8; DESCRIPTOR_BYTES];

/// One pairwise intensity test, both points relative to the keypoint.
#[derive(Clone, Copy, Debug)]
struct TestPair {
    ax: i32,
    ay: i32,
    bx: i32,
    by: i32,
}

/// The fixed set of pairwise intensity tests shared by every descriptor.
///
/// Patterns built from the same seed are identical, which makes descriptor
/// extraction a pure function of the image and the extractor configuration.
#[derive(Clone, Debug)]
pub struct BriefPattern {
    pairs: Vec<TestPair>,
}

impl BriefPattern {
    /// Build a sampling pattern from a seed. Test points are drawn uniformly
    /// from the 31x31 patch.
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let r = PATCH_RADIUS as i32;
        let pairs = (0..DESCRIPTOR_BITS)
            .map(|_| TestPair {
                ax: rng.random_range(-r..=r),
                ay: rng.random_range(-r..=r),
                bx: rng.random_range(-r..=r),
                by: rng.random_range(-r..=r),
            })
            .collect();
        Self { pairs }
    }
}

/// Compute BRIEF descriptors for a set of keypoints.
///
/// `smoothed` should be a blurred copy of the detection image; BRIEF's single
/// pixel tests are noise-sensitive without smoothing. Keypoints whose patch
/// does not fully fit inside the image are dropped, so the returned keypoint
/// and descriptor sequences are index-aligned and equally long.
pub fn describe(
    smoothed: &GrayImage,
    keypoints: &[Keypoint],
    pattern: &BriefPattern,
) -> (Vec<Keypoint>, Vec<Descriptor>) {
    let (width, height) = (smoothed.width(), smoothed.height());
    if width < 2 * PATCH_RADIUS + 1 || height < 2 * PATCH_RADIUS + 1 {
        return (Vec::new(), Vec::new());
    }

    let data = smoothed.as_raw().as_slice();
    let cols = width as i32;

    let mut kept = Vec::with_capacity(keypoints.len());
    let mut descriptors = Vec::with_capacity(keypoints.len());

    for &kp in keypoints {
        if kp.x < PATCH_RADIUS
            || kp.y < PATCH_RADIUS
            || kp.x >= width - PATCH_RADIUS
            || kp.y >= height - PATCH_RADIUS
        {
            continue;
        }

        let (cx, cy) = (kp.x as i32, kp.y as i32);
        let sample = |dx: i32, dy: i32| data[((cy + dy) * cols + cx + dx) as usize];

        let mut descriptor: Descriptor = [0; DESCRIPTOR_BYTES];
        for (bit, pair) in pattern.pairs.iter().enumerate() {
            if sample(pair.ax, pair.ay) < sample(pair.bx, pair.by) {
                descriptor[bit / 8] |= 1 << (bit % 8);
            }
        }

        kept.push(kp);
        descriptors.push(descriptor);
    }

    (kept, descriptors)
}
