//! Filesystem categorization sink.

use std::fs;
use std::path::PathBuf;

use image::DynamicImage;
use screenstate::corpus::{Classification, KEY_SEPARATOR};
use thiserror::Error;
use uuid::Uuid;

/// Subdirectory receiving captures no state claimed.
pub const UNCLASSIFIED_DIR: &str = "default";

/// Errors while persisting a capture.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The target directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying io error.
        source: std::io::Error,
    },
    /// The image could not be written.
    #[error("failed to write image {path}: {source}")]
    Write {
        /// File that could not be written.
        path: PathBuf,
        /// Underlying encode error.
        source: image::ImageError,
    },
}

/// Persists a classified capture under a location derived from its verdict.
pub trait CategorizationSink {
    /// Write `image` to the location for `verdict`, returning the final path.
    fn persist(&self, verdict: &Classification, image: &DynamicImage)
        -> Result<PathBuf, SinkError>;
}

/// Writes captures into an output tree: the flattened key, split on the key
/// separator, becomes nested directories; unclassified captures land in
/// [`UNCLASSIFIED_DIR`]. Filenames are fresh UUIDs so captures filed into the
/// same state never collide.
pub struct FsSink {
    output_root: PathBuf,
}

impl FsSink {
    /// Create a sink rooted at `output_root`.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    fn target_dir(&self, verdict: &Classification) -> PathBuf {
        match verdict.as_state() {
            Some(key) => {
                let mut dir = self.output_root.clone();
                for segment in key.split(KEY_SEPARATOR) {
                    dir.push(segment);
                }
                dir
            }
            None => self.output_root.join(UNCLASSIFIED_DIR),
        }
    }
}

impl CategorizationSink for FsSink {
    fn persist(
        &self,
        verdict: &Classification,
        image: &DynamicImage,
    ) -> Result<PathBuf, SinkError> {
        let dir = self.target_dir(verdict);
        fs::create_dir_all(&dir).map_err(|source| SinkError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(format!("{}.png", Uuid::new_v4().simple()));
        image.save(&path).map_err(|source| SinkError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn capture() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, image::Luma([60])))
    }

    #[test]
    fn test_state_key_becomes_nested_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FsSink::new(tmp.path());

        let verdict = Classification::State("battle_intro_confirm".to_string());
        let path = sink.persist(&verdict, &capture()).unwrap();

        assert!(path.starts_with(tmp.path().join("battle").join("intro").join("confirm")));
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "png");
    }

    #[test]
    fn test_unclassified_goes_to_default_bucket() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FsSink::new(tmp.path());

        let path = sink.persist(&Classification::Unclassified, &capture()).unwrap();
        assert!(path.starts_with(tmp.path().join(UNCLASSIFIED_DIR)));
        assert!(path.exists());
    }

    #[test]
    fn test_repeated_persists_never_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FsSink::new(tmp.path());
        let verdict = Classification::State("menu".to_string());

        let first = sink.persist(&verdict, &capture()).unwrap();
        let second = sink.persist(&verdict, &capture()).unwrap();
        assert_ne!(first, second);
        assert!(first.exists() && second.exists());
    }
}
