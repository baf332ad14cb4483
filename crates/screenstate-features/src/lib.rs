#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// BRIEF binary descriptor module.
pub mod brief;

/// keypoint extraction entry point.
pub mod extractor;

/// FAST corner detection module.
pub mod fast;

/// brute-force descriptor matching module.
pub mod matcher;

pub use brief::{BriefPattern, Descriptor, DESCRIPTOR_BITS, DESCRIPTOR_BYTES, PATCH_RADIUS};
pub use extractor::{Extractor, ExtractorConfig, Features};
pub use fast::Keypoint;
pub use matcher::{count_good_matches, MatchConfig};
