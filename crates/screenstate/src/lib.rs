#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use screenstate_features as features;

#[doc(inline)]
pub use screenstate_corpus as corpus;
