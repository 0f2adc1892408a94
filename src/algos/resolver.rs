//! Resolution of obsolete terms and partitioning of term lists by namespace.

use crate::{common::Namespace, ontology::OntologyGraph};

/// Resolves raw term lists against an ontology.
#[derive(Debug, Clone, Copy)]
pub struct TermResolver<'a> {
    graph: &'a OntologyGraph,
}

/// Resolved terms split by namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partitioned {
    /// Molecular function terms.
    pub molecular_function: Vec<String>,
    /// Cellular component terms.
    pub cellular_component: Vec<String>,
    /// Biological process terms.
    pub biological_process: Vec<String>,
}

impl Partitioned {
    /// The terms of the given namespace.
    pub fn get(&self, namespace: Namespace) -> &[String] {
        match namespace {
            Namespace::MolecularFunction => &self.molecular_function,
            Namespace::CellularComponent => &self.cellular_component,
            Namespace::BiologicalProcess => &self.biological_process,
        }
    }
}

impl<'a> TermResolver<'a> {
    /// Construct a new resolver for `graph`.
    pub fn new(graph: &'a OntologyGraph) -> Self {
        Self { graph }
    }

    /// Resolve a single term.
    ///
    /// Unknown and current terms are returned unchanged. An obsolete term is replaced by
    /// its first replacement candidate that is not already in `sibling_terms`, or dropped
    /// if there is none.
    pub fn resolve<'t>(&self, term_id: &'t str, sibling_terms: &[String]) -> Option<&'t str>
    where
        'a: 't,
    {
        if !self.graph.is_obsolete(term_id) {
            return Some(term_id);
        }
        self.graph
            .replacement_candidates(term_id)
            .into_iter()
            .find(|candidate| !sibling_terms.iter().any(|sibling| sibling == candidate))
    }

    /// Resolve `raw_terms` and keep those of the given namespace, in input order.
    ///
    /// Each term is resolved against the unresolved `raw_terms`; duplicates are kept.
    pub fn partition_by_namespace(&self, raw_terms: &[String], namespace: Namespace) -> Vec<String> {
        raw_terms
            .iter()
            .filter_map(|term| self.resolve(term, raw_terms))
            .filter(|term| self.graph.namespace_of(term) == Some(namespace))
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Partition `raw_terms` into all three namespaces.
    pub fn partition(&self, raw_terms: &[String]) -> Partitioned {
        Partitioned {
            molecular_function: self
                .partition_by_namespace(raw_terms, Namespace::MolecularFunction),
            cellular_component: self
                .partition_by_namespace(raw_terms, Namespace::CellularComponent),
            biological_process: self
                .partition_by_namespace(raw_terms, Namespace::BiologicalProcess),
        }
    }
}
