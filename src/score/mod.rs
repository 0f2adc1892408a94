//! Scoring of predicted against known GO annotations.

use std::collections::HashMap;
use std::time::Instant;

use clap::Parser;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

use crate::{
    algos::{
        frequency::{corpus_from_rows, FrequencyModel},
        resolver::TermResolver,
        similarity::{SimilarityEngine, UnknownTermRecord},
    },
    common::{load_term_table, tsv_writer, Namespace, Score, TermListRow},
    ontology::OntologyGraph,
};

/// Command line arguments for `score` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Score predicted against known GO terms", long_about = None)]
pub struct Args {
    /// Path to the GO in OBO format (e.g., `go-basic.obo`).
    #[arg(long, required = true)]
    pub path_obo: String,
    /// Path to the TSV file with the known terms of each entity.
    #[arg(long, required = true)]
    pub path_known: String,
    /// Path to the TSV file with the predicted terms of each entity.
    #[arg(long, required = true)]
    pub path_predicted: String,
    /// Path to the TSV file with the annotation corpus for term frequencies (default is to
    /// use the known terms).
    #[arg(long)]
    pub path_corpus: Option<String>,

    /// Path to the output TSV file with the scores.
    #[arg(long, required = true)]
    pub path_out_scores: String,
    /// Path to the output TSV file with predicted terms that had no known counterpart.
    #[arg(long, required = true)]
    pub path_out_unknown: String,
    /// Optional path to output TSV file with the corpus term frequencies.
    #[arg(long)]
    pub path_out_frequencies: Option<String>,

    /// Relationship to follow in addition to `is_a` (e.g., `part_of`), may be repeated.
    #[arg(long = "relationship")]
    pub relationships: Vec<String>,
    /// Number of threads to use for scoring (default is 1 thread per core).
    #[arg(long)]
    pub num_threads: Option<usize>,
}

/// The scores of one entity.
#[derive(serde::Serialize, Debug, Clone, PartialEq)]
pub struct ScoredEntity {
    /// The entity identifier.
    #[serde(rename = "ProteinID")]
    pub entity_id: String,
    /// Molecular function score.
    #[serde(rename = "MF_Score")]
    pub molecular_function: Score,
    /// Cellular component score.
    #[serde(rename = "CC_Score")]
    pub cellular_component: Score,
    /// Biological process score.
    #[serde(rename = "BP_Score")]
    pub biological_process: Score,
    /// Mean of the applicable namespace scores.
    #[serde(rename = "Total_Score")]
    pub overall: Score,
}

impl ScoredEntity {
    /// The score of the given namespace.
    pub fn get(&self, namespace: Namespace) -> Score {
        match namespace {
            Namespace::MolecularFunction => self.molecular_function,
            Namespace::CellularComponent => self.cellular_component,
            Namespace::BiologicalProcess => self.biological_process,
        }
    }
}

/// Header of the score table.
pub const SCORE_HEADER: [&str; 5] = ["ProteinID", "MF_Score", "CC_Score", "BP_Score", "Total_Score"];

/// Header of the unknown terms table.
pub const UNKNOWN_HEADER: [&str; 4] = [
    "Predicted_GO_Term_ID",
    "Predicted_GO_Term_Name",
    "Subontology",
    "ProteinID",
];

/// Drives the per-entity scoring.
#[derive(Debug, Clone, Copy)]
pub struct ScoreAggregator<'a> {
    resolver: TermResolver<'a>,
    engine: SimilarityEngine<'a>,
}

impl<'a> ScoreAggregator<'a> {
    /// Construct a new aggregator from the frequency model and its ontology.
    pub fn new(model: &'a FrequencyModel<'a>) -> Self {
        Self {
            resolver: TermResolver::new(model.graph()),
            engine: SimilarityEngine::new(model),
        }
    }

    /// Score one entity from its raw known and predicted terms.
    pub fn score_entity(
        &self,
        entity_id: &str,
        known: &[String],
        predicted: &[String],
    ) -> (ScoredEntity, Vec<UnknownTermRecord>) {
        let known = self.resolver.partition(known);
        let predicted = self.resolver.partition(predicted);

        let bma = |namespace: Namespace| {
            self.engine
                .bma_similarity(known.get(namespace), predicted.get(namespace), entity_id)
        };
        let (biological_process, mut unknown) = bma(Namespace::BiologicalProcess);
        let (cellular_component, unknown_cc) = bma(Namespace::CellularComponent);
        let (molecular_function, unknown_mf) = bma(Namespace::MolecularFunction);
        // Unknown terms are reported in the order BP, CC, MF.
        unknown.extend(unknown_cc);
        unknown.extend(unknown_mf);

        let scored = ScoredEntity {
            entity_id: entity_id.to_string(),
            molecular_function,
            cellular_component,
            biological_process,
            overall: Score::mean([molecular_function, cellular_component, biological_process]),
        };

        (scored, unknown)
    }

    /// Score all entities present in both `known` and `predicted`.
    ///
    /// Rows are joined on the entity identifier in the order of `known`; entities present
    /// in only one of the tables are skipped.
    pub fn score_all(
        &self,
        known: &[TermListRow],
        predicted: &[TermListRow],
    ) -> (Vec<ScoredEntity>, Vec<UnknownTermRecord>) {
        let joined = inner_join(known, predicted);
        tracing::debug!(
            "joined {} rows from {} known and {} predicted rows",
            joined.len(),
            known.len(),
            predicted.len()
        );

        let (scored, unknown): (Vec<_>, Vec<_>) = joined
            .par_iter()
            .progress_with(crate::common::progress_bar(joined.len()))
            .map(|(known, predicted)| {
                self.score_entity(&known.entity_id, &known.terms, &predicted.terms)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .unzip();

        (scored, unknown.into_iter().flatten().collect())
    }
}

/// Pair each known row with each predicted row of the same entity.
fn inner_join<'r>(
    known: &'r [TermListRow],
    predicted: &'r [TermListRow],
) -> Vec<(&'r TermListRow, &'r TermListRow)> {
    let mut by_entity: HashMap<&str, Vec<&TermListRow>> = HashMap::new();
    for row in predicted {
        by_entity.entry(row.entity_id.as_str()).or_default().push(row);
    }

    known
        .iter()
        .flat_map(|known_row| {
            by_entity
                .get(known_row.entity_id.as_str())
                .into_iter()
                .flatten()
                .map(move |predicted_row| (known_row, *predicted_row))
        })
        .collect()
}

/// Write the score table.
///
/// # Errors
///
/// In the case that the file cannot be written.
pub fn write_scores<P: AsRef<std::path::Path>>(
    path: P,
    scored: &[ScoredEntity],
) -> Result<(), anyhow::Error> {
    let mut writer = tsv_writer(path)?;
    writer.write_record(SCORE_HEADER)?;
    for record in scored {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the unknown terms table.
///
/// # Errors
///
/// In the case that the file cannot be written.
pub fn write_unknown<P: AsRef<std::path::Path>>(
    path: P,
    unknown: &[UnknownTermRecord],
) -> Result<(), anyhow::Error> {
    let mut writer = tsv_writer(path)?;
    writer.write_record(UNKNOWN_HEADER)?;
    for record in unknown {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the observed term frequencies.
///
/// # Errors
///
/// In the case that the file cannot be written.
pub fn write_frequencies<P: AsRef<std::path::Path>>(
    path: P,
    model: &FrequencyModel<'_>,
) -> Result<(), anyhow::Error> {
    let mut writer = tsv_writer(path)?;
    writer.write_record(["term_id", "count", "frequency"])?;
    for (term_id, count, frequency) in model.observed_terms() {
        let count = count.to_string();
        let frequency = frequency.to_string();
        writer.write_record([term_id, count.as_str(), frequency.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Main entry point for `score` sub command.
///
/// # Errors
///
/// In the case that loading the ontology or any table fails, or the output cannot be
/// written.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    crate::common::init_env_logger(args_common);

    tracing::info!("Loading GO...");
    let before_loading = Instant::now();
    let graph = OntologyGraph::load(&args.path_obo, &args.relationships)?;
    tracing::info!("...done loading GO in {:?}", before_loading.elapsed());
    tracing::info!(
        "Ontology [{}] with {} terms",
        graph.data_version().unwrap_or("unknown version"),
        graph.len()
    );

    tracing::info!("Loading annotation tables...");
    let before_tables = Instant::now();
    let known = load_term_table(&args.path_known)?;
    let predicted = load_term_table(&args.path_predicted)?;
    let corpus_rows = if let Some(path_corpus) = args.path_corpus.as_ref() {
        load_term_table(path_corpus)?
    } else {
        known.clone()
    };
    tracing::info!(
        "...done loading {} known, {} predicted, and {} corpus rows in {:?}",
        known.len(),
        predicted.len(),
        corpus_rows.len(),
        before_tables.elapsed()
    );

    tracing::info!("Computing term frequencies...");
    let before_frequencies = Instant::now();
    let corpus = corpus_from_rows(&corpus_rows);
    let model = FrequencyModel::build(&graph, &corpus);
    tracing::info!(
        "...done computing frequencies over {} entities in {:?}",
        model.population(),
        before_frequencies.elapsed()
    );
    if let Some(path_out_frequencies) = args.path_out_frequencies.as_ref() {
        write_frequencies(path_out_frequencies, &model)?;
        tracing::info!("  wrote term frequencies to {}", path_out_frequencies);
    }

    if let Some(num_threads) = args.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()?;
    }

    tracing::info!("Scoring entities...");
    let before_scoring = Instant::now();
    let aggregator = ScoreAggregator::new(&model);
    let (scored, unknown) = aggregator.score_all(&known, &predicted);
    tracing::info!(
        "...done scoring {} entities ({} unknown predicted terms) in {:?}",
        scored.len(),
        unknown.len(),
        before_scoring.elapsed()
    );

    tracing::info!("Writing output...");
    write_scores(&args.path_out_scores, &scored)?;
    write_unknown(&args.path_out_unknown, &unknown)?;
    tracing::info!(
        "...wrote scores to {} and unknown terms to {}",
        &args.path_out_scores,
        &args.path_out_unknown
    );

    tracing::info!("All done. Have a nice day!");
    Ok(())
}
