//! Conversion of raw predictor output into one row of comma-joined terms per entity.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;
use indexmap::IndexSet;
use strum::{EnumIter, IntoEnumIterator};

use crate::{
    common::{open_read, tsv_reader_builder, tsv_writer},
    Error,
};

/// Line prefix of the predictions in the predictor's log output.
pub const PREDICTION_PREFIX: &str = "query_prot";

/// Layout of the predictor output.
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    EnumIter,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    derive_more::Display,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum InputFormat {
    /// Result table with header, entity in first and term in second column.
    #[default]
    #[display("table")]
    Table,
    /// Rows of entity and the predictor's log line, only lines with the prediction prefix
    /// are used.
    #[display("predictor-log")]
    PredictorLog,
}

impl FromStr for InputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InputFormat::iter()
            .find(|m| m.to_string().as_str().eq(s))
            .ok_or(anyhow::anyhow!("unknown input format: {}", s))
    }
}

/// Command line arguments for `aggregate` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Aggregate predictor output by entity", long_about = None)]
pub struct Args {
    /// Path to the predictor output.
    #[arg(long, required = true)]
    pub path_input: String,
    /// Layout of the predictor output.
    #[arg(long, default_value_t = InputFormat::default())]
    pub input_format: InputFormat,
    /// Path to the output TSV file.
    #[arg(long, required = true)]
    pub path_output: String,
}

/// Extract `(entity, term)` pairs from the predictor output.
///
/// # Errors
///
/// In the case that the input is not a valid TSV file.
pub fn read_predictions<R: std::io::Read>(
    reader: R,
    input_format: InputFormat,
) -> Result<Vec<(String, String)>, Error> {
    let mut reader = tsv_reader_builder(input_format == InputFormat::Table)
        .quoting(false)
        .from_reader(reader);

    let mut result = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::Table {
            path: String::from("<predictions>"),
            message: e.to_string(),
        })?;
        let entity = record.get(0).unwrap_or_default().trim();
        let value = record.get(1).unwrap_or_default().trim();
        let term = match input_format {
            InputFormat::Table => Some(value),
            InputFormat::PredictorLog => value
                .strip_prefix(PREDICTION_PREFIX)
                .and_then(|rest| rest.split_whitespace().next()),
        };
        match term {
            Some(term) if !entity.is_empty() && !term.is_empty() => {
                result.push((entity.to_string(), term.to_string()));
            }
            _ => tracing::trace!("skipping record {:?}", &record),
        }
    }

    Ok(result)
}

/// Group terms by entity, keeping the first occurrence of each term.
pub fn group_by_entity(predictions: &[(String, String)]) -> BTreeMap<&str, IndexSet<&str>> {
    let mut result: BTreeMap<&str, IndexSet<&str>> = BTreeMap::new();
    for (entity, term) in predictions {
        result.entry(entity.as_str()).or_default().insert(term.as_str());
    }
    result
}

/// Main entry point for `aggregate` sub command.
///
/// # Errors
///
/// In the case that the input cannot be read or the output cannot be written.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    crate::common::init_env_logger(args_common);

    tracing::info!("Reading predictions...");
    let before_reading = Instant::now();
    let predictions = read_predictions(open_read(&args.path_input)?, args.input_format)
        .map_err(|e| anyhow::anyhow!("problem reading {}: {}", &args.path_input, e))?;
    tracing::info!(
        "...done reading {} predictions in {:?}",
        predictions.len(),
        before_reading.elapsed()
    );

    let grouped = group_by_entity(&predictions);

    tracing::info!("Writing {} entities...", grouped.len());
    let mut writer = tsv_writer(&args.path_output)?;
    writer.write_record(["Protein", "GO_terms"])?;
    for (entity, terms) in &grouped {
        let terms = terms.iter().copied().collect::<Vec<_>>().join(",");
        writer.write_record([*entity, terms.as_str()])?;
    }
    writer.flush()?;

    tracing::info!("All done. Have a nice day!");
    Ok(())
}
