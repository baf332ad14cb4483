//! Batch run driver: corpus setup, candidate processing and bookkeeping.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use screenstate::corpus::{
    build_corpus, Classification, Classifier, FsImageLoader, NoopTrace, ReferenceCorpus, StateMap,
};
use screenstate::features::Extractor;
use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::sink::{CategorizationSink, FsSink, SinkError, UNCLASSIFIED_DIR};

/// Fatal errors for a batch run. Per-image failures are counted and logged
/// instead of surfacing here.
#[derive(Debug, Error)]
pub enum AppError {
    /// The reference description file could not be read.
    #[error("failed to read reference description {path}: {source}")]
    ReadReferences {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying io error.
        source: std::io::Error,
    },
    /// The reference description file is not valid.
    #[error("failed to parse reference description {path}: {source}")]
    ParseReferences {
        /// File that could not be parsed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
    /// The run log could not be appended to.
    #[error("failed to append to run log {path}: {source}")]
    Log {
        /// Log file path.
        path: PathBuf,
        /// Underlying io error.
        source: std::io::Error,
    },
    /// The run summary could not be encoded.
    #[error("failed to encode run summary: {0}")]
    EncodeSummary(serde_json::Error),
    /// The run summary could not be written.
    #[error("failed to write run summary {path}: {source}")]
    WriteSummary {
        /// Summary file path.
        path: PathBuf,
        /// Underlying io error.
        source: std::io::Error,
    },
}

/// Where a batch run reads and writes. All file names are resolved relative
/// to `batch_dir`.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Directory holding the candidate screenshots and reference description.
    pub batch_dir: PathBuf,
    /// Reference description file name.
    pub references_file: String,
    /// Output subdirectory for sorted captures.
    pub output_dir: String,
    /// Run log file name.
    pub log_file: String,
}

impl RunConfig {
    /// Defaults for a batch directory: `references.json`, `sorted/`,
    /// `processing.log`.
    pub fn new(batch_dir: impl Into<PathBuf>) -> Self {
        Self {
            batch_dir: batch_dir.into(),
            references_file: "references.json".to_string(),
            output_dir: "sorted".to_string(),
            log_file: "processing.log".to_string(),
        }
    }
}

/// Counts reported at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Candidate images seen.
    pub total: usize,
    /// Candidates classified and persisted (including the default bucket).
    pub succeeded: usize,
    /// Candidates that could not be decoded or persisted.
    pub failed: usize,
}

#[derive(Debug, Error)]
enum ProcessError {
    #[error("failed to decode: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Run a full batch: build the corpus, classify every top-level PNG in the
/// batch directory, route each through the sink, delete consumed originals
/// and write the run log and summary.
pub fn run(config: &RunConfig) -> Result<RunSummary, AppError> {
    let references_path = config.batch_dir.join(&config.references_file);
    let tree = load_tree(&references_path)?;

    let extractor = Extractor::default();
    let loader = FsImageLoader::new(&config.batch_dir);
    let corpus = build_corpus(&tree, &loader, &extractor);
    if corpus.is_empty() {
        log::warn!(
            "no reference images loaded from {}; every capture will be filed under `{UNCLASSIFIED_DIR}`",
            references_path.display()
        );
    } else {
        log::info!("reference corpus ready: {} states", corpus.len());
    }

    let classifier = Classifier::default();
    let sink = FsSink::new(config.batch_dir.join(&config.output_dir));
    let log_path = config.batch_dir.join(&config.log_file);

    append_log(&log_path, &format!("run started: {}", Local::now()))?;

    let mut summary = RunSummary::default();
    for path in candidate_images(&config.batch_dir) {
        summary.total += 1;
        match process_one(&path, &extractor, &classifier, &corpus, &sink) {
            Ok(verdict) => {
                summary.succeeded += 1;
                log::info!(
                    "{} -> {}",
                    path.display(),
                    verdict.as_state().unwrap_or(UNCLASSIFIED_DIR)
                );
            }
            Err(err) => {
                summary.failed += 1;
                log::error!("{}: {err}", path.display());
            }
        }
    }

    append_log(
        &log_path,
        &format!(
            "run finished: {} — total: {}, succeeded: {}, failed: {}",
            Local::now(),
            summary.total,
            summary.succeeded,
            summary.failed
        ),
    )?;
    write_summary(&config.batch_dir.join("summary.json"), &summary)?;

    Ok(summary)
}

fn load_tree(path: &Path) -> Result<StateMap, AppError> {
    let raw = fs::read_to_string(path).map_err(|source| AppError::ReadReferences {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| AppError::ParseReferences {
        path: path.to_path_buf(),
        source,
    })
}

/// Top-level PNG files of the batch directory, sorted by file name so runs
/// are reproducible. Reference images and the output tree live in
/// subdirectories and are never picked up.
fn candidate_images(batch_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(batch_dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect()
}

fn process_one(
    path: &Path,
    extractor: &Extractor,
    classifier: &Classifier,
    corpus: &ReferenceCorpus,
    sink: &dyn CategorizationSink,
) -> Result<Classification, ProcessError> {
    let capture = image::open(path)?;
    let gray = capture.to_luma8();

    let verdict = classifier.classify_image(&gray, extractor, corpus, &mut NoopTrace);
    sink.persist(&verdict, &capture)?;

    // The capture is only consumed once its sorted copy is on disk.
    if let Err(err) = fs::remove_file(path) {
        log::warn!("could not remove consumed capture {}: {err}", path.display());
    }

    Ok(verdict)
}

fn append_log(path: &Path, line: &str) -> Result<(), AppError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AppError::Log {
            path: path.to_path_buf(),
            source,
        })?;
    writeln!(file, "{line}").map_err(|source| AppError::Log {
        path: path.to_path_buf(),
        source,
    })
}

fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), AppError> {
    let encoded = serde_json::to_string_pretty(summary).map_err(AppError::EncodeSummary)?;
    fs::write(path, encoded).map_err(|source| AppError::WriteSummary {
        path: path.to_path_buf(),
        source,
    })
}
