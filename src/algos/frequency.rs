//! Term frequencies and information content from an annotation corpus.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::{common::TermListRow, ontology::OntologyGraph};

/// Raw term identifiers by entity, as used for the frequency statistics.
pub type AnnotationCorpus = IndexMap<String, Vec<String>>;

/// Build the corpus from table rows; repeated entities extend their term list.
pub fn corpus_from_rows(rows: &[TermListRow]) -> AnnotationCorpus {
    let mut corpus = AnnotationCorpus::new();
    for row in rows {
        corpus
            .entry(row.entity_id.clone())
            .or_default()
            .extend(row.terms.iter().cloned());
    }
    corpus
}

/// Ancestor-inclusive term counts over the corpus entities.
#[derive(Debug, Clone)]
pub struct FrequencyModel<'a> {
    /// The ontology the counts are indexed by.
    graph: &'a OntologyGraph,
    /// Number of entities carrying each term or one of its descendants.
    counts: Vec<u32>,
    /// Number of corpus entities.
    population: usize,
}

impl<'a> FrequencyModel<'a> {
    /// Count term occurrences in `corpus`.
    ///
    /// Each entity increments each term reachable from its annotations at most once, no
    /// matter by how many paths the term is reached. Terms unknown to `graph` are skipped.
    pub fn build(graph: &'a OntologyGraph, corpus: &AnnotationCorpus) -> Self {
        let mut counts = vec![0u32; graph.len()];
        let mut unknown = 0usize;
        for terms in corpus.values() {
            let mut seen = HashSet::new();
            for term in terms {
                if let Some(idx) = graph.index_of(term) {
                    seen.extend(graph.ancestor_indices(idx).iter().copied());
                } else {
                    unknown += 1;
                }
            }
            for idx in seen {
                counts[idx] += 1;
            }
        }

        if unknown > 0 {
            tracing::debug!("skipped {} corpus annotations with unknown terms", unknown);
        }

        Self {
            graph,
            counts,
            population: corpus.len(),
        }
    }

    /// The ontology the model was built for.
    pub fn graph(&self) -> &'a OntologyGraph {
        self.graph
    }

    /// Number of corpus entities.
    pub fn population(&self) -> usize {
        self.population
    }

    /// Occurrence count of the term, 0 if unknown.
    pub fn count(&self, term_id: &str) -> u32 {
        self.graph
            .index_of(term_id)
            .map_or(0, |idx| self.counts[idx])
    }

    /// Relative frequency of the term at graph index `idx`.
    #[allow(clippy::cast_precision_loss)]
    pub fn frequency_at(&self, idx: usize) -> f64 {
        if self.population == 0 {
            0.0
        } else {
            f64::from(self.counts[idx]) / self.population as f64
        }
    }

    /// Relative frequency of the term among corpus entities, 0 if unseen.
    pub fn frequency(&self, term_id: &str) -> f64 {
        self.graph
            .index_of(term_id)
            .map_or(0.0, |idx| self.frequency_at(idx))
    }

    /// Information content of the term at graph index `idx`.
    pub fn information_content_at(&self, idx: usize) -> Option<f64> {
        let frequency = self.frequency_at(idx);
        if frequency > 0.0 {
            Some(-frequency.ln())
        } else {
            None
        }
    }

    /// Information content `-ln(frequency)`, `None` for terms never observed.
    pub fn information_content(&self, term_id: &str) -> Option<f64> {
        self.graph
            .index_of(term_id)
            .and_then(|idx| self.information_content_at(idx))
    }

    /// Iterate `(term_id, count, frequency)` for all observed terms in ontology order.
    pub fn observed_terms(&self) -> impl Iterator<Item = (&'a str, u32, f64)> + '_ {
        self.graph
            .terms()
            .enumerate()
            .filter(|(idx, _)| self.counts[*idx] > 0)
            .map(|(idx, term)| (term.id.as_str(), self.counts[idx], self.frequency_at(idx)))
    }
}
