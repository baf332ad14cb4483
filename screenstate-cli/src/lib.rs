#![doc = env!("CARGO_PKG_DESCRIPTION")]

pub mod driver;
pub mod sink;

pub use driver::{run, AppError, RunConfig, RunSummary};
pub use sink::{CategorizationSink, FsSink, SinkError, UNCLASSIFIED_DIR};
