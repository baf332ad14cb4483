//! Image loading collaborator used by the corpus builder.

use std::path::{Path, PathBuf};

use image::GrayImage;

use crate::CorpusError;

/// Supplies grayscale pixel data for declared image paths.
///
/// The corpus builder treats loading as an external concern: a failed load is
/// reported back as an error value and the traversal moves on. Tests inject
/// in-memory implementations to exercise the builder without touching disk.
pub trait ImageLoader {
    /// Load the image at `path` as grayscale.
    fn load(&self, path: &Path) -> Result<GrayImage, CorpusError>;
}

/// Loads images from the filesystem, resolving relative paths against a base
/// directory.
#[derive(Clone, Debug)]
pub struct FsImageLoader {
    base_dir: PathBuf,
}

impl FsImageLoader {
    /// Create a loader rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl ImageLoader for FsImageLoader {
    fn load(&self, path: &Path) -> Result<GrayImage, CorpusError> {
        let full_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        Ok(image::open(full_path)?.to_luma8())
    }
}
