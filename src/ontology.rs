//! Loading and indexing of the Gene Ontology from OBO files.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use indexmap::IndexMap;

use crate::{common::Namespace, Error};

/// A single ontology term.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Term {
    /// The primary term identifier, e.g., `GO:0003674`.
    pub id: String,
    /// The human-readable term name.
    pub name: String,
    /// The term's namespace, `None` if missing or not a GO namespace.
    pub namespace: Option<Namespace>,
    /// Whether the term is obsolete.
    pub is_obsolete: bool,
    /// Terms from `replaced_by` clauses.
    pub replaced_by: Vec<String>,
    /// Terms from `consider` clauses.
    pub consider: Vec<String>,
    /// Alternative identifiers of the term.
    pub alt_ids: Vec<String>,
}

/// The ontology with precomputed ancestor closure.
#[derive(Debug, Clone)]
pub struct OntologyGraph {
    /// Terms by primary identifier, in file order.
    terms: IndexMap<String, Term>,
    /// Alternative identifier to index into `terms`.
    alt_ids: HashMap<String, usize>,
    /// Sorted ancestor indices for each term, including the term itself.
    ancestors: Vec<Vec<usize>>,
    /// The `data-version` header value, if any.
    data_version: Option<String>,
}

/// Convert ident to String.
fn ident_to_string(ident: &fastobo::ast::Ident) -> String {
    match ident {
        fastobo::ast::Ident::Prefixed(val) => format!("{}:{}", val.prefix(), val.local()),
        fastobo::ast::Ident::Unprefixed(val) => val.as_str().to_string(),
        fastobo::ast::Ident::Url(val) => val.as_str().to_string(),
    }
}

/// Convert class ident to String.
fn class_id_to_string(id: &fastobo::ast::ClassIdent) -> String {
    ident_to_string(id.as_ref())
}

// Code for constructing an `OntologyGraph`.
impl OntologyGraph {
    /// Load the ontology from an OBO file.
    ///
    /// Besides `is_a`, the relationships named in `relations` (e.g., `part_of`) are followed
    /// when computing ancestors.
    ///
    /// # Errors
    ///
    /// In the case that the file cannot be parsed, contains no terms, or has cycles.
    pub fn load<P: AsRef<std::path::Path>>(path: P, relations: &[String]) -> Result<Self, Error> {
        let source = format!("{}", path.as_ref().display());
        let doc = fastobo::from_file(path.as_ref()).map_err(|e| Error::Load {
            path: source.clone(),
            message: e.to_string(),
        })?;
        Self::build(&doc, relations, &source)
    }

    /// Load the ontology from a reader with OBO contents.
    ///
    /// # Errors
    ///
    /// In the case that the contents cannot be parsed, contain no terms, or have cycles.
    pub fn from_reader<R: std::io::BufRead>(reader: R, relations: &[String]) -> Result<Self, Error> {
        let doc = fastobo::from_reader(reader).map_err(|e| Error::Load {
            path: String::from("<reader>"),
            message: e.to_string(),
        })?;
        Self::build(&doc, relations, "<reader>")
    }

    /// Build the graph from a parsed OBO document.
    ///
    /// # Errors
    ///
    /// In the case that the document contains no terms (reported as `Error::Load`) or the
    /// graph has cycles.
    pub fn from_obo_doc(doc: &fastobo::ast::OboDoc, relations: &[String]) -> Result<Self, Error> {
        Self::build(doc, relations, "<document>")
    }

    /// Build the graph, naming `source` in load errors.
    fn build(
        doc: &fastobo::ast::OboDoc,
        relations: &[String],
        source: &str,
    ) -> Result<Self, Error> {
        let data_version = doc.header().iter().find_map(|clause| match clause {
            fastobo::ast::HeaderClause::DataVersion(version) => Some(version.as_str().to_string()),
            _ => None,
        });

        let mut terms: IndexMap<String, Term> = IndexMap::new();
        let mut raw_parents: Vec<Vec<String>> = Vec::new();
        for term_frame in doc
            .entities()
            .iter()
            .filter_map(fastobo::ast::EntityFrame::as_term)
        {
            let mut term = Term {
                id: ident_to_string(term_frame.id().as_inner().as_ref()),
                ..Term::default()
            };
            let mut parents = Vec::new();

            for line in term_frame
                .clauses()
                .iter()
                .map(fastobo::ast::Line::as_inner)
            {
                match line {
                    fastobo::ast::TermClause::Name(name) => {
                        term.name = name.as_str().to_string();
                    }
                    fastobo::ast::TermClause::Namespace(namespace) => {
                        term.namespace = Namespace::from_str(&namespace.to_string()).ok();
                    }
                    fastobo::ast::TermClause::AltId(alt_id) => {
                        term.alt_ids.push(ident_to_string(alt_id));
                    }
                    fastobo::ast::TermClause::IsA(parent) => {
                        parents.push(class_id_to_string(parent));
                    }
                    fastobo::ast::TermClause::Relationship(relation, target) => {
                        let relation = relation.to_string();
                        if relations.iter().any(|r| r == &relation) {
                            parents.push(class_id_to_string(target));
                        }
                    }
                    fastobo::ast::TermClause::IsObsolete(is_obsolete) => {
                        term.is_obsolete = *is_obsolete;
                    }
                    fastobo::ast::TermClause::ReplacedBy(replacement) => {
                        term.replaced_by.push(class_id_to_string(replacement));
                    }
                    fastobo::ast::TermClause::Consider(candidate) => {
                        term.consider.push(class_id_to_string(candidate));
                    }
                    _ => (),
                }
            }

            if terms.contains_key(&term.id) {
                tracing::warn!("skipping duplicate term frame for {}", &term.id);
                continue;
            }
            terms.insert(term.id.clone(), term);
            raw_parents.push(parents);
        }

        if terms.is_empty() {
            return Err(Error::Load {
                path: source.to_string(),
                message: String::from("no term frames found"),
            });
        }

        let mut alt_ids = HashMap::new();
        for (idx, term) in terms.values().enumerate() {
            for alt_id in &term.alt_ids {
                if !terms.contains_key(alt_id) {
                    alt_ids.insert(alt_id.clone(), idx);
                }
            }
        }

        let parents = raw_parents
            .iter()
            .enumerate()
            .map(|(idx, parents)| {
                parents
                    .iter()
                    .filter_map(|parent| {
                        let parent_idx = terms.get_index_of(parent);
                        if parent_idx.is_none() {
                            tracing::debug!(
                                "ignoring edge from {} to unknown term {}",
                                terms[idx].id,
                                parent
                            );
                        }
                        parent_idx
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let ancestors = ancestor_closure(&parents)
            .map_err(|idx| Error::Cycle(terms[idx].id.clone()))?;

        Ok(Self {
            terms,
            alt_ids,
            ancestors,
            data_version,
        })
    }
}

/// Visitation state for the closure computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Compute the reflexive-transitive ancestor closure from the parent lists.
///
/// Returns the index of a term on a cycle if there is one.
fn ancestor_closure(parents: &[Vec<usize>]) -> Result<Vec<Vec<usize>>, usize> {
    fn visit(
        idx: usize,
        parents: &[Vec<usize>],
        marks: &mut [Mark],
        closure: &mut [Vec<usize>],
    ) -> Result<(), usize> {
        match marks[idx] {
            Mark::Done => return Ok(()),
            Mark::Visiting => return Err(idx),
            Mark::Unvisited => (),
        }
        marks[idx] = Mark::Visiting;

        let mut ancestors = BTreeSet::from([idx]);
        for &parent in &parents[idx] {
            visit(parent, parents, marks, closure)?;
            ancestors.extend(closure[parent].iter().copied());
        }

        closure[idx] = ancestors.into_iter().collect();
        marks[idx] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; parents.len()];
    let mut closure = vec![Vec::new(); parents.len()];
    for idx in 0..parents.len() {
        visit(idx, parents, &mut marks, &mut closure)?;
    }
    Ok(closure)
}

// Accessor code.
impl OntologyGraph {
    /// Number of terms (by primary identifier).
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether there are no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The `data-version` from the OBO header.
    pub fn data_version(&self) -> Option<&str> {
        self.data_version.as_deref()
    }

    /// Index of a term by primary or alternative identifier.
    pub fn index_of(&self, term_id: &str) -> Option<usize> {
        self.terms
            .get_index_of(term_id)
            .or_else(|| self.alt_ids.get(term_id).copied())
    }

    /// Term at the given index.
    ///
    /// # Panics
    ///
    /// If `idx` is out of bounds.
    pub fn term_at(&self, idx: usize) -> &Term {
        &self.terms[idx]
    }

    /// Sorted ancestor indices of the term at `idx`, including `idx`.
    pub fn ancestor_indices(&self, idx: usize) -> &[usize] {
        &self.ancestors[idx]
    }

    /// Iterate all terms in file order.
    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.terms.values()
    }

    /// Look up a term by primary or alternative identifier.
    pub fn term(&self, term_id: &str) -> Option<&Term> {
        self.index_of(term_id).map(|idx| self.term_at(idx))
    }

    /// Whether the term is known.
    pub fn contains(&self, term_id: &str) -> bool {
        self.index_of(term_id).is_some()
    }

    /// The namespace of the term, `None` if unknown or without GO namespace.
    pub fn namespace_of(&self, term_id: &str) -> Option<Namespace> {
        self.term(term_id).and_then(|term| term.namespace)
    }

    /// Whether the term is obsolete; `false` for unknown terms.
    pub fn is_obsolete(&self, term_id: &str) -> bool {
        self.term(term_id).is_some_and(|term| term.is_obsolete)
    }

    /// Replacement candidates: `replaced_by` entries first, then `consider` entries.
    pub fn replacement_candidates(&self, term_id: &str) -> Vec<&str> {
        self.term(term_id)
            .map(|term| {
                term.replaced_by
                    .iter()
                    .chain(term.consider.iter())
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ancestors of the term, including the term itself; empty for unknown terms.
    pub fn ancestors_of(&self, term_id: &str) -> BTreeSet<&str> {
        self.index_of(term_id)
            .map(|idx| {
                self.ancestor_indices(idx)
                    .iter()
                    .map(|&ancestor| self.term_at(ancestor).id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::OntologyGraph;
    use crate::{common::Namespace, Error};

    /// Load the small GO excerpt used throughout the tests.
    pub fn load_go() -> Result<OntologyGraph, Error> {
        OntologyGraph::load("tests/data/go/go-mini.obo", &[])
    }

    #[rstest::fixture]
    #[once]
    pub fn go() -> OntologyGraph {
        load_go().expect("could not load test ontology")
    }

    /// Build a graph from OBO text.
    pub fn graph_from_str(obo: &str) -> Result<OntologyGraph, Error> {
        OntologyGraph::from_reader(std::io::Cursor::new(obo.as_bytes()), &[])
    }

    #[rstest::rstest]
    fn load_header_and_terms(go: &OntologyGraph) {
        assert_eq!(go.data_version(), Some("releases/2024-01-17"));
        assert_eq!(go.len(), 26);
        assert!(!go.is_empty());
        assert_eq!(
            go.term("GO:0016787").map(|t| t.name.as_str()),
            Some("hydrolase activity")
        );
    }

    #[rstest::rstest]
    fn namespaces(go: &OntologyGraph) {
        assert_eq!(
            go.namespace_of("GO:0016787"),
            Some(Namespace::MolecularFunction)
        );
        assert_eq!(
            go.namespace_of("GO:0005737"),
            Some(Namespace::CellularComponent)
        );
        assert_eq!(
            go.namespace_of("GO:0034641"),
            Some(Namespace::BiologicalProcess)
        );
        assert_eq!(go.namespace_of("GO:9999999"), None);
    }

    #[rstest::rstest]
    fn alt_ids_resolve_to_primary_term(go: &OntologyGraph) {
        assert!(go.contains("GO:0045308"));
        assert_eq!(
            go.term("GO:0045308").map(|t| t.id.as_str()),
            Some("GO:0005515")
        );
    }

    #[rstest::rstest]
    fn obsolete_terms(go: &OntologyGraph) {
        assert!(go.is_obsolete("GO:0016788"));
        assert!(!go.is_obsolete("GO:0016787"));
        assert!(!go.is_obsolete("GO:9999999"));
        assert_eq!(go.replacement_candidates("GO:0016788"), vec!["GO:0016787"]);
        assert_eq!(
            go.replacement_candidates("GO:0003823"),
            vec!["GO:0005515", "GO:0005488"]
        );
        assert!(go.replacement_candidates("GO:0004437").is_empty());
        assert!(go.replacement_candidates("GO:9999999").is_empty());
    }

    #[rstest::rstest]
    fn ancestors_are_reflexive(go: &OntologyGraph) {
        for term in go.terms() {
            assert!(go.ancestors_of(&term.id).contains(term.id.as_str()));
        }
        assert!(go.ancestors_of("GO:9999999").is_empty());
    }

    #[rstest::rstest]
    fn ancestors_with_multiple_inheritance(go: &OntologyGraph) {
        insta::assert_debug_snapshot!(go.ancestors_of("GO:0034641"), @r###"
        {
            "GO:0006807",
            "GO:0008150",
            "GO:0008152",
            "GO:0009987",
            "GO:0034641",
            "GO:0044237",
        }
        "###);
    }

    #[test]
    fn relationships_are_followed_when_configured() -> Result<(), anyhow::Error> {
        let path = "tests/data/go/go-mini.obo";
        let is_a_only = OntologyGraph::load(path, &[])?;
        assert!(!is_a_only.ancestors_of("GO:0005886").contains("GO:0071944"));

        let part_of = OntologyGraph::load(path, &[String::from("part_of")])?;
        assert!(part_of.ancestors_of("GO:0005886").contains("GO:0071944"));

        Ok(())
    }

    #[test]
    fn edges_to_unknown_terms_are_ignored() -> Result<(), anyhow::Error> {
        let graph = graph_from_str(
            "format-version: 1.2\n\n\
            [Term]\nid: GO:0000001\nname: one\nnamespace: molecular_function\n\
            is_a: GO:0000404 ! not in file\n",
        )?;
        assert_eq!(graph.ancestors_of("GO:0000001").len(), 1);
        Ok(())
    }

    #[test]
    fn cycle_is_an_error() {
        let result = graph_from_str(
            "format-version: 1.2\n\n\
            [Term]\nid: GO:0000001\nname: one\nnamespace: molecular_function\nis_a: GO:0000002\n\n\
            [Term]\nid: GO:0000002\nname: two\nnamespace: molecular_function\nis_a: GO:0000001\n",
        );
        assert!(matches!(result, Err(Error::Cycle(_))), "{result:?}");
    }

    #[test]
    fn empty_ontology_is_a_load_error() {
        let result = graph_from_str("format-version: 1.2\n");
        match result {
            Err(Error::Load { path, message }) => {
                assert_eq!(path, "<reader>");
                assert_eq!(message, "no term frames found");
            }
            other => panic!("expected a load error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let result = OntologyGraph::load("tests/data/go/does-not-exist.obo", &[]);
        assert!(matches!(result, Err(Error::Load { .. })), "{result:?}");
    }
}
