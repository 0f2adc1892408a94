//! Pairwise term similarity and the symmetric best-match average over term sets.

use itertools::{EitherOrBoth, Itertools};

use crate::{
    algos::frequency::FrequencyModel,
    common::{Namespace, Score},
};

/// A predicted term for which the entity has no known term in the same namespace.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UnknownTermRecord {
    /// The predicted term.
    #[serde(rename = "Predicted_GO_Term_ID")]
    pub term_id: String,
    /// The predicted term's name.
    #[serde(rename = "Predicted_GO_Term_Name")]
    pub term_name: String,
    /// The predicted term's namespace.
    #[serde(rename = "Subontology")]
    pub namespace: Option<Namespace>,
    /// The entity the term was predicted for.
    #[serde(rename = "ProteinID")]
    pub entity_id: String,
}

/// Information content based similarity of terms and term sets.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityEngine<'a> {
    model: &'a FrequencyModel<'a>,
}

impl<'a> SimilarityEngine<'a> {
    /// Construct a new engine on top of the given frequency model.
    pub fn new(model: &'a FrequencyModel<'a>) -> Self {
        Self { model }
    }

    /// Information content at graph index, 0 if the term was never observed.
    fn ic_at(&self, idx: usize) -> f64 {
        self.model.information_content_at(idx).unwrap_or_default()
    }

    /// IC of the most informative common ancestor of the terms at `a` and `b`.
    fn mica_ic_at(&self, a: usize, b: usize) -> f64 {
        let graph = self.model.graph();
        graph
            .ancestor_indices(a)
            .iter()
            .merge_join_by(graph.ancestor_indices(b).iter(), |lhs, rhs| lhs.cmp(rhs))
            .filter_map(|either| match either {
                EitherOrBoth::Both(idx, _) => Some(self.ic_at(*idx)),
                EitherOrBoth::Left(_) | EitherOrBoth::Right(_) => None,
            })
            .fold(0.0, f64::max)
    }

    /// Resnik similarity, the IC of the most informative common ancestor.
    ///
    /// Returns 0 if one of the terms is unknown.
    pub fn resnik_similarity(&self, a: &str, b: &str) -> f64 {
        let graph = self.model.graph();
        match (graph.index_of(a), graph.index_of(b)) {
            (Some(a), Some(b)) => self.mica_ic_at(a, b),
            _ => 0.0,
        }
    }

    /// Similarity of two terms, normalized to `[0, 1]`.
    ///
    /// This is `IC(MICA(a, b)) / max(IC(a), IC(b))` and 0 for unknown terms or when
    /// neither term has a positive information content.
    pub fn term_pair_similarity(&self, a: &str, b: &str) -> f64 {
        let graph = self.model.graph();
        let (Some(a), Some(b)) = (graph.index_of(a), graph.index_of(b)) else {
            return 0.0;
        };

        let max_ic = self.ic_at(a).max(self.ic_at(b));
        if max_ic > 0.0 {
            self.mica_ic_at(a, b) / max_ic
        } else {
            0.0
        }
    }

    /// Best-match average of `known` and `predicted` terms of one namespace.
    ///
    /// Without known terms the score is `NA` and every predicted term is returned as an
    /// unknown term record for `entity_id`. Without predicted terms the score is 0.
    /// Otherwise, the row maxima and column maxima of the pairwise similarity matrix are
    /// summed and divided by the total number of terms.
    #[allow(clippy::cast_precision_loss)]
    pub fn bma_similarity(
        &self,
        known: &[String],
        predicted: &[String],
        entity_id: &str,
    ) -> (Score, Vec<UnknownTermRecord>) {
        if known.is_empty() {
            let graph = self.model.graph();
            let unknown = predicted
                .iter()
                .filter_map(|term_id| graph.term(term_id).map(|term| (term_id, term)))
                .map(|(term_id, term)| UnknownTermRecord {
                    term_id: term_id.clone(),
                    term_name: term.name.clone(),
                    namespace: term.namespace,
                    entity_id: entity_id.to_string(),
                })
                .collect();
            return (Score::NotApplicable, unknown);
        }
        if predicted.is_empty() {
            return (Score::Value(0.0), Vec::new());
        }

        let matrix = known
            .iter()
            .map(|k| {
                predicted
                    .iter()
                    .map(|p| self.term_pair_similarity(k, p))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let row_max_sum: f64 = matrix
            .iter()
            .map(|row| row.iter().copied().fold(0.0, f64::max))
            .sum();
        let col_max_sum: f64 = (0..predicted.len())
            .map(|j| matrix.iter().map(|row| row[j]).fold(0.0, f64::max))
            .sum();

        let score = (row_max_sum + col_max_sum) / (known.len() + predicted.len()) as f64;
        (Score::Value(score), Vec::new())
    }
}

#[cfg(test)]
mod test {
    use super::SimilarityEngine;
    use crate::algos::frequency::{AnnotationCorpus, FrequencyModel};
    use crate::common::{Namespace, Score};
    use crate::ontology::{
        test::{go, graph_from_str},
        OntologyGraph,
    };

    fn corpus(entries: &[(&str, &[&str])]) -> AnnotationCorpus {
        entries
            .iter()
            .map(|(entity, terms)| {
                (
                    (*entity).to_string(),
                    terms.iter().map(|t| (*t).to_string()).collect(),
                )
            })
            .collect()
    }

    fn terms(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| (*id).to_string()).collect()
    }

    fn go_corpus() -> AnnotationCorpus {
        corpus(&[
            ("P1", &["GO:0016787"]),
            ("P2", &["GO:0016740"]),
            ("P3", &["GO:0005515"]),
            ("P4", &["GO:0004386"]),
        ])
    }

    /// Three unrelated molecular function terms without a shared root.
    const FLAT_OBO: &str = "format-version: 1.2\n\n\
        [Term]\nid: GO:0001\nname: first\nnamespace: molecular_function\n\n\
        [Term]\nid: GO:0002\nname: second\nnamespace: molecular_function\n\n\
        [Term]\nid: GO:0003\nname: third\nnamespace: molecular_function\n";

    #[rstest::rstest]
    fn self_similarity_is_one(go: &OntologyGraph) {
        let corpus = go_corpus();
        let model = FrequencyModel::build(go, &corpus);
        let engine = SimilarityEngine::new(&model);

        for term in ["GO:0016787", "GO:0016740", "GO:0005515", "GO:0004386"] {
            assert!(model.information_content(term).unwrap_or_default() > 0.0);
            assert!((engine.term_pair_similarity(term, term) - 1.0).abs() < 1e-12);
        }
    }

    #[rstest::rstest]
    fn pair_similarity_is_mica_over_max_ic(go: &OntologyGraph) {
        let corpus = go_corpus();
        let model = FrequencyModel::build(go, &corpus);
        let engine = SimilarityEngine::new(&model);

        // MICA is `catalytic activity` (3 of 4), the transferase is seen once.
        let expected = (4f64 / 3f64).ln() / 4f64.ln();
        let actual = engine.term_pair_similarity("GO:0016787", "GO:0016740");
        assert!((actual - expected).abs() < 1e-12, "{actual}");
        assert!(
            (engine.resnik_similarity("GO:0016787", "GO:0016740") - (4f64 / 3f64).ln()).abs()
                < 1e-12
        );

        // Symmetric.
        let reverse = engine.term_pair_similarity("GO:0016740", "GO:0016787");
        assert!((actual - reverse).abs() < 1e-12);
    }

    #[rstest::rstest]
    #[case("GO:0016787", "GO:9999999")]
    #[case("GO:9999999", "GO:9999999")]
    #[case("GO:0003674", "GO:0003674")]
    #[case("GO:0005634", "GO:0005634")]
    fn pair_similarity_zero_cases(go: &OntologyGraph, #[case] a: &str, #[case] b: &str) {
        let corpus = go_corpus();
        let model = FrequencyModel::build(go, &corpus);
        let engine = SimilarityEngine::new(&model);

        assert_eq!(engine.term_pair_similarity(a, b), 0.0);
    }

    #[rstest::rstest]
    fn pair_similarity_within_bounds(go: &OntologyGraph) {
        let corpus = go_corpus();
        let model = FrequencyModel::build(go, &corpus);
        let engine = SimilarityEngine::new(&model);

        for a in go.terms() {
            for b in go.terms() {
                let sim = engine.term_pair_similarity(&a.id, &b.id);
                assert!((0.0..=1.0).contains(&sim), "{} {} {sim}", a.id, b.id);
            }
        }
    }

    #[test]
    fn bma_of_unrelated_terms() -> Result<(), anyhow::Error> {
        let graph = graph_from_str(FLAT_OBO)?;
        let corpus = corpus(&[
            ("E1", &["GO:0001", "GO:0002"]),
            ("E2", &["GO:0003"]),
            ("E3", &["GO:0003"]),
        ]);
        let model = FrequencyModel::build(&graph, &corpus);
        let engine = SimilarityEngine::new(&model);
        assert_eq!(
            model.information_content("GO:0001"),
            model.information_content("GO:0002")
        );

        let (score, unknown) =
            engine.bma_similarity(&terms(&["GO:0001", "GO:0002"]), &terms(&["GO:0001"]), "E1");

        // Row maxima 1 + 0, column maximum 1, over 2 + 1 terms.
        let Score::Value(value) = score else {
            panic!("expected a value, got {score:?}");
        };
        assert!((value - 2.0 / 3.0).abs() < 1e-12, "{value}");
        assert!(unknown.is_empty());

        Ok(())
    }

    #[rstest::rstest]
    fn bma_without_known_terms(go: &OntologyGraph) {
        let corpus = go_corpus();
        let model = FrequencyModel::build(go, &corpus);
        let engine = SimilarityEngine::new(&model);

        let (score, unknown) =
            engine.bma_similarity(&[], &terms(&["GO:0016787", "GO:0045308"]), "P9");

        assert_eq!(score, Score::NotApplicable);
        insta::assert_debug_snapshot!(unknown, @r###"
        [
            UnknownTermRecord {
                term_id: "GO:0016787",
                term_name: "hydrolase activity",
                namespace: Some(
                    MolecularFunction,
                ),
                entity_id: "P9",
            },
            UnknownTermRecord {
                term_id: "GO:0045308",
                term_name: "protein binding",
                namespace: Some(
                    MolecularFunction,
                ),
                entity_id: "P9",
            },
        ]
        "###);
    }

    #[rstest::rstest]
    fn bma_without_known_terms_skips_terms_not_in_graph(go: &OntologyGraph) {
        let corpus = go_corpus();
        let model = FrequencyModel::build(go, &corpus);
        let engine = SimilarityEngine::new(&model);

        let (score, unknown) =
            engine.bma_similarity(&[], &terms(&["GO:9999999", "GO:0005737"]), "P9");

        assert_eq!(score, Score::NotApplicable);
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].namespace, Some(Namespace::CellularComponent));
    }

    #[rstest::rstest]
    fn bma_without_predicted_terms(go: &OntologyGraph) {
        let corpus = go_corpus();
        let model = FrequencyModel::build(go, &corpus);
        let engine = SimilarityEngine::new(&model);

        let (score, unknown) = engine.bma_similarity(&terms(&["GO:0016787"]), &[], "P1");

        assert_eq!(score, Score::Value(0.0));
        assert!(unknown.is_empty());
    }

    #[rstest::rstest]
    fn bma_with_unknown_terms_contributes_zero(go: &OntologyGraph) {
        let corpus = go_corpus();
        let model = FrequencyModel::build(go, &corpus);
        let engine = SimilarityEngine::new(&model);

        let (score, _) = engine.bma_similarity(
            &terms(&["GO:0016740"]),
            &terms(&["GO:0016740", "GO:9999999"]),
            "P2",
        );

        // Row maximum 1, column maxima 1 + 0, over 1 + 2 terms.
        assert_eq!(score, Score::Value(2.0 / 3.0));
    }

    #[rstest::rstest]
    fn bma_is_symmetric(go: &OntologyGraph) {
        let corpus = go_corpus();
        let model = FrequencyModel::build(go, &corpus);
        let engine = SimilarityEngine::new(&model);

        let lhs = terms(&["GO:0016787", "GO:0005515"]);
        let rhs = terms(&["GO:0016740", "GO:0004386", "GO:0005488"]);
        let (forward, _) = engine.bma_similarity(&lhs, &rhs, "P1");
        let (backward, _) = engine.bma_similarity(&rhs, &lhs, "P1");

        let (Some(forward), Some(backward)) = (forward.value(), backward.value()) else {
            panic!("expected values");
        };
        assert!((forward - backward).abs() < 1e-12);
        assert!(forward > 0.0 && forward < 1.0);
    }
}
