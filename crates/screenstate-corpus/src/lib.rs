#![doc = env!("CARGO_PKG_DESCRIPTION")]

pub mod classify;
pub mod corpus;
pub mod loader;
pub mod tree;

#[cfg(test)]
mod testutil;

pub use classify::{Classification, Classifier, ClassifyTrace, NoopTrace};
pub use corpus::{build_corpus, ReferenceCorpus, ReferenceImage, KEY_SEPARATOR};
pub use loader::{FsImageLoader, ImageLoader};
pub use tree::{ImageDecl, StateMap, StateNode};

use thiserror::Error;

/// Errors surfaced while loading reference or candidate images.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// The image file could not be read.
    #[error("failed to read image file: {0}")]
    Io(#[from] std::io::Error),
    /// The image file could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}
