//! Flattening of the state tree into the reference corpus.

use screenstate_features::{Descriptor, Extractor};

use crate::loader::ImageLoader;
use crate::tree::{StateMap, StateNode};

/// Separator joining state path segments into a flattened key.
pub const KEY_SEPARATOR: char = '_';

/// A reference image after feature extraction: only the descriptor set is
/// kept, raw pixels are discarded.
#[derive(Clone, Debug)]
pub struct ReferenceImage {
    /// Identifier from the reference declaration.
    pub id: String,
    /// Precomputed descriptors, never empty.
    pub descriptors: Vec<Descriptor>,
}

/// The flattened reference corpus: flattened state key to reference images.
///
/// Entries keep the build traversal order (depth-first, a state before its
/// substates, substates in declaration order) and the corpus is read-only
/// once built. The classifier's first-match-wins scan depends on this order.
#[derive(Debug, Default)]
pub struct ReferenceCorpus {
    entries: Vec<(String, Vec<ReferenceImage>)>,
}

impl ReferenceCorpus {
    /// True when no state contributed any reference image; the caller should
    /// surface this as a configuration problem.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of flattened states with at least one reference image.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate entries in build insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ReferenceImage])> {
        self.entries
            .iter()
            .map(|(key, references)| (key.as_str(), references.as_slice()))
    }

    /// Look up one state's references by flattened key.
    pub fn get(&self, key: &str) -> Option<&[ReferenceImage]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, references)| references.as_slice())
    }

    pub(crate) fn insert(&mut self, key: String, mut references: Vec<ReferenceImage>) {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            // Two tree paths can flatten to the same key (e.g. a state named
            // "a_b" next to "a" -> "b"); their references are pooled.
            log::warn!("flattened key `{key}` declared more than once; merging references");
            existing.append(&mut references);
        } else {
            self.entries.push((key, references));
        }
    }
}

/// Flatten a state tree into a [`ReferenceCorpus`].
///
/// Descends the tree to arbitrary depth. For every node the declared images
/// are loaded and extracted; the node registers under its flattened key only
/// when at least one image yields a non-empty descriptor set. Load or
/// extraction failures are logged and skipped — they never abort the
/// traversal, and children are visited whether or not the parent contributed.
pub fn build_corpus(
    tree: &StateMap,
    loader: &dyn ImageLoader,
    extractor: &Extractor,
) -> ReferenceCorpus {
    let mut corpus = ReferenceCorpus::default();
    for (name, node) in tree.iter() {
        flatten_node(&mut corpus, name.to_string(), node, loader, extractor);
    }
    if corpus.is_empty() {
        log::warn!("reference corpus is empty; every capture will fall through to unclassified");
    }
    corpus
}

fn flatten_node(
    corpus: &mut ReferenceCorpus,
    key: String,
    node: &StateNode,
    loader: &dyn ImageLoader,
    extractor: &Extractor,
) {
    let mut references = Vec::with_capacity(node.images.len());
    for decl in &node.images {
        let image = match loader.load(&decl.path) {
            Ok(image) => image,
            Err(err) => {
                log::warn!(
                    "state `{key}`: failed to load reference `{}` from {}: {err}",
                    decl.id,
                    decl.path.display()
                );
                continue;
            }
        };
        let features = extractor.extract(&image);
        if features.is_empty() {
            log::warn!(
                "state `{key}`: reference `{}` has no extractable features; skipping",
                decl.id
            );
            continue;
        }
        references.push(ReferenceImage {
            id: decl.id.clone(),
            descriptors: features.descriptors,
        });
    }

    if !references.is_empty() {
        corpus.insert(key.clone(), references);
    } else if !node.images.is_empty() {
        log::warn!("state `{key}` contributed no references and cannot be matched");
    }

    for (child, child_node) in node.substates.iter() {
        flatten_node(
            corpus,
            format!("{key}{KEY_SEPARATOR}{child}"),
            child_node,
            loader,
            extractor,
        );
    }
}
