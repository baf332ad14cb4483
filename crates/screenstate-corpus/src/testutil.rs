//! Shared helpers for this crate's tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use image::GrayImage;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::loader::ImageLoader;
use crate::CorpusError;

/// In-memory loader mapping declared paths to prebuilt images; anything not
/// staged fails with a not-found error.
#[derive(Default)]
pub struct MemoryLoader {
    images: HashMap<PathBuf, GrayImage>,
}

impl MemoryLoader {
    pub fn with(mut self, path: &str, image: GrayImage) -> Self {
        self.images.insert(PathBuf::from(path), image);
        self
    }
}

impl ImageLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<GrayImage, CorpusError> {
        self.images.get(path).cloned().ok_or_else(|| {
            CorpusError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not staged", path.display()),
            ))
        })
    }
}

/// Screenshot-like synthetic content: random uniform 8x8 tiles, giving FAST
/// plenty of high-contrast corners and BRIEF distinctive patches.
pub fn tiled_noise(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let tiles_x = width.div_ceil(8);
    let tiles_y = height.div_ceil(8);
    let values: Vec<u8> = (0..tiles_x * tiles_y).map(|_| rng.random()).collect();
    GrayImage::from_fn(width, height, |x, y| {
        image::Luma([values[((y / 8) * tiles_x + x / 8) as usize]])
    })
}
