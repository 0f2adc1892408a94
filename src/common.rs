//! Functionality shared across the crate.

use std::io::BufRead;
use std::str::FromStr;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use strum::{EnumIter, IntoEnumIterator};

use crate::Error;

/// Shared command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

/// Route `log` records through `env_logger` when running at debug or trace level.
pub fn init_env_logger(args_common: &Args) {
    if let Some(log::Level::Trace | log::Level::Debug) = args_common.verbose.log_level() {
        std::env::set_var("RUST_LOG", "debug");
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }
}

/// Construct the `indicatif` style for progress bars.
///
/// # Panics
///
/// In the case when writing the ETA seconds could not be written to the progress bar.
pub fn indicatif_style() -> indicatif::ProgressStyle {
    let tpl = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
    {human_pos}/{human_len} ({per_sec})";
    indicatif::ProgressStyle::with_template(tpl)
        .unwrap()
        .with_key(
            "eta",
            |state: &indicatif::ProgressState, w: &mut dyn std::fmt::Write| {
                write!(w, "{:.1}s", state.eta().as_secs_f64())
                    .expect("could not write the ETA as seconds to progress bar");
            },
        )
        .progress_chars("#>-")
}

/// Construct an `indicatif` progress bar with the common style.
///
/// Also, we will enable a steady tick every 0.1s and hide in tests.
pub fn progress_bar(#[allow(unused_variables)] len: usize) -> indicatif::ProgressBar {
    #[cfg(test)]
    let pb = indicatif::ProgressBar::hidden();
    #[cfg(not(test))]
    let pb = indicatif::ProgressBar::new(len as u64).with_style(indicatif_style());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// The three top-level branches of the Gene Ontology.
///
/// The iteration order is the column order of the score table.
#[derive(
    Debug,
    Clone,
    Copy,
    EnumIter,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Display,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Molecular function.
    #[display("molecular_function")]
    MolecularFunction,
    /// Cellular component.
    #[display("cellular_component")]
    CellularComponent,
    /// Biological process.
    #[display("biological_process")]
    BiologicalProcess,
}

impl Namespace {
    /// Name of the score column for this namespace.
    pub fn score_column(self) -> &'static str {
        match self {
            Namespace::MolecularFunction => "MF_Score",
            Namespace::CellularComponent => "CC_Score",
            Namespace::BiologicalProcess => "BP_Score",
        }
    }
}

impl FromStr for Namespace {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::iter()
            .find(|m| m.to_string().as_str().eq(s))
            .ok_or(anyhow::anyhow!("unknown namespace: {}", s))
    }
}

/// A similarity score that may be not applicable.
///
/// `NotApplicable` marks a namespace without any known terms and is never averaged as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    /// A computed score.
    Value(f64),
    /// No score could be computed.
    NotApplicable,
}

impl Score {
    /// Return the numeric value, if any.
    pub fn value(self) -> Option<f64> {
        match self {
            Score::Value(value) => Some(value),
            Score::NotApplicable => None,
        }
    }

    /// Whether this is `NotApplicable`.
    pub fn is_na(self) -> bool {
        matches!(self, Score::NotApplicable)
    }

    /// Arithmetic mean over the applicable scores, `NotApplicable` if there are none.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean<I: IntoIterator<Item = Score>>(scores: I) -> Score {
        let values = scores
            .into_iter()
            .filter_map(Score::value)
            .collect::<Vec<_>>();
        if values.is_empty() {
            Score::NotApplicable
        } else {
            Score::Value(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Score::Value(value) => write!(f, "{value}"),
            Score::NotApplicable => write!(f, "NA"),
        }
    }
}

impl serde::Serialize for Score {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Open a file for buffered reading, transparently decompressing `.gz` files.
///
/// # Errors
///
/// In the case that the file cannot be opened.
pub fn open_read<P: AsRef<std::path::Path>>(path: P) -> Result<Box<dyn BufRead>, Error> {
    let file = std::fs::File::open(path.as_ref())?;
    if path.as_ref().extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(std::io::BufReader::new(
            flate2::read::MultiGzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(std::io::BufReader::new(file)))
    }
}

/// Construct the TSV reader configuration shared by all input tables.
pub fn tsv_reader_builder(has_headers: bool) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(b'\t')
        .has_headers(has_headers)
        .flexible(true);
    builder
}

/// Construct a TSV writer for the given path.
///
/// Headers are not derived from the records, write them explicitly so that empty tables
/// still get a header line.
///
/// # Errors
///
/// In the case that the file cannot be created.
pub fn tsv_writer<P: AsRef<std::path::Path>>(path: P) -> Result<csv::Writer<std::fs::File>, Error> {
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(std::fs::File::create(path.as_ref())?))
}

/// Split a comma-separated term list, trimming items and dropping empty ones.
pub fn split_terms(terms: &str) -> Vec<String> {
    terms
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// One row of an `entity<TAB>comma-separated terms` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermListRow {
    /// The entity identifier.
    pub entity_id: String,
    /// The raw term identifiers, in input order.
    pub terms: Vec<String>,
}

/// Load a two-column term list table, skipping its header row.
///
/// Rows without a second column yield an empty term list.
///
/// # Errors
///
/// In the case that the file cannot be read, is not a valid TSV file, or its header has
/// less than two columns.
pub fn load_term_table<P: AsRef<std::path::Path>>(path: P) -> Result<Vec<TermListRow>, Error> {
    let table_error = |e: csv::Error| Error::Table {
        path: format!("{}", path.as_ref().display()),
        message: e.to_string(),
    };

    let mut reader = tsv_reader_builder(true).from_reader(open_read(path.as_ref())?);
    let header = reader.headers().map_err(table_error)?;
    if header.len() < 2 {
        return Err(Error::MissingColumn {
            path: format!("{}", path.as_ref().display()),
            column: String::from("terms"),
        });
    }

    let mut result = Vec::new();
    for record in reader.records() {
        let record = record.map_err(table_error)?;
        let entity_id = record.get(0).unwrap_or_default().trim();
        if entity_id.is_empty() {
            continue;
        }
        result.push(TermListRow {
            entity_id: entity_id.to_string(),
            terms: split_terms(record.get(1).unwrap_or_default()),
        });
    }

    Ok(result)
}
