//! The scan/decision policy over the flattened corpus.

use image::GrayImage;
use screenstate_features::{count_good_matches, Descriptor, Extractor, MatchConfig};

use crate::corpus::ReferenceCorpus;

/// Verdict for one capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Flattened key of the accepted state.
    State(String),
    /// No reference image cleared the acceptance threshold.
    Unclassified,
}

impl Classification {
    /// The accepted state key, if any.
    pub fn as_state(&self) -> Option<&str> {
        match self {
            Classification::State(key) => Some(key),
            Classification::Unclassified => None,
        }
    }

    /// True when no state matched.
    pub fn is_unclassified(&self) -> bool {
        matches!(self, Classification::Unclassified)
    }
}

/// Observer for scoring decisions, called in scan order.
///
/// Every hook defaults to a no-op so the decision logic runs without any
/// side channel; diagnostic sinks (match visualizations, debug dumps) hang
/// off this trait instead of living inside the classifier.
pub trait ClassifyTrace {
    /// A reference image was scored.
    fn reference_scored(&mut self, key: &str, reference_id: &str, good_matches: usize) {
        let _ = (key, reference_id, good_matches);
    }

    /// A reference landed in the near-miss tier: notable, never decisive.
    fn near_miss(&mut self, key: &str, reference_id: &str, good_matches: usize) {
        let _ = (key, reference_id, good_matches);
    }

    /// A reference was accepted and the scan stopped.
    fn accepted(&mut self, key: &str, reference_id: &str, good_matches: usize) {
        let _ = (key, reference_id, good_matches);
    }
}

/// The default trace: records nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTrace;

impl ClassifyTrace for NoopTrace {}

/// State classifier configuration and entry points.
///
/// The policy is first-match-wins: the corpus is scanned in insertion order
/// and the first reference image whose good-match count is strictly above
/// `accept_threshold` decides the state immediately. This is a contract, not
/// an optimization — when several states could match a capture, declaration
/// order picks the winner, and match-count magnitude never does.
#[derive(Clone, Copy, Debug)]
pub struct Classifier {
    /// Configuration forwarded to the descriptor matcher.
    pub match_config: MatchConfig,
    /// Accept a reference when its good-match count is strictly above this.
    pub accept_threshold: usize,
    /// Counts strictly above this (but not accepted) are near misses.
    pub near_miss_threshold: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            match_config: MatchConfig::default(),
            accept_threshold: 20,
            near_miss_threshold: 15,
        }
    }
}

impl Classifier {
    /// Classify a capture's descriptor set against the corpus.
    pub fn classify(&self, query: &[Descriptor], corpus: &ReferenceCorpus) -> Classification {
        self.classify_traced(query, corpus, &mut NoopTrace)
    }

    /// [`Classifier::classify`] with an injected trace observer.
    ///
    /// An empty query descriptor set scores zero against everything and falls
    /// through to [`Classification::Unclassified`]; that is not an error.
    pub fn classify_traced(
        &self,
        query: &[Descriptor],
        corpus: &ReferenceCorpus,
        trace: &mut dyn ClassifyTrace,
    ) -> Classification {
        for (key, references) in corpus.iter() {
            for reference in references {
                let good_matches =
                    count_good_matches(query, &reference.descriptors, &self.match_config);
                trace.reference_scored(key, &reference.id, good_matches);

                if good_matches > self.accept_threshold {
                    trace.accepted(key, &reference.id, good_matches);
                    return Classification::State(key.to_string());
                }
                if good_matches > self.near_miss_threshold {
                    trace.near_miss(key, &reference.id, good_matches);
                }
            }
        }
        Classification::Unclassified
    }

    /// Extract features from a grayscale capture and classify it in one step.
    pub fn classify_image(
        &self,
        image: &GrayImage,
        extractor: &Extractor,
        corpus: &ReferenceCorpus,
        trace: &mut dyn ClassifyTrace,
    ) -> Classification {
        let features = extractor.extract(image);
        self.classify_traced(&features.descriptors, corpus, trace)
    }
}
