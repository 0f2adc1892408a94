//! Statistical comparison of two score tables.

use std::time::Instant;

use clap::Parser;
use indexmap::IndexMap;
use strum::IntoEnumIterator;

use crate::{
    algos::mann_whitney::{mann_whitney_u, MannWhitneyResult},
    common::{open_read, tsv_reader_builder, tsv_writer, Namespace},
    Error,
};

/// Significance level of the test.
pub const ALPHA: f64 = 0.05;

/// Header of the comparison table.
pub const COMPARISON_HEADER: [&str; 4] = [
    "Ontology",
    "MannWhitney_Stat",
    "P_Value",
    "Tool_With_Better_Performance",
];

/// Command line arguments for `compare` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Compare two score tables", long_about = None)]
pub struct Args {
    /// Path to the first score table.
    #[arg(long, required = true)]
    pub path_first: String,
    /// Path to the second score table.
    #[arg(long, required = true)]
    pub path_second: String,
    /// Path to the output TSV file.
    #[arg(long, required = true)]
    pub path_output: String,
}

/// Names of the compared columns, in output order.
pub fn score_columns() -> Vec<&'static str> {
    Namespace::iter()
        .map(Namespace::score_column)
        .chain(std::iter::once("Total_Score"))
        .collect()
}

/// Outcome of comparing one column.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum Verdict {
    /// The column is missing in one of the tables.
    #[display("Not Found")]
    NotFound,
    /// One of the tables has no numeric values in the column.
    #[display("No Data")]
    NoData,
    /// No significant difference.
    #[display("Tie")]
    Tie,
    /// The table at the given path performs significantly better.
    #[display("{_0}")]
    Better(String),
}

/// One row of the comparison table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnComparison {
    /// The compared column.
    pub column: String,
    /// The test result, if the test could be run.
    pub result: Option<MannWhitneyResult>,
    /// The outcome.
    pub verdict: Verdict,
}

/// Load the numeric values of all columns of a score table, keyed by trimmed header.
///
/// Values that do not parse as numbers and NaN values are dropped.
///
/// # Errors
///
/// In the case that the file cannot be read or is not a valid TSV file.
pub fn load_score_columns<P: AsRef<std::path::Path>>(
    path: P,
) -> Result<IndexMap<String, Vec<f64>>, Error> {
    let table_error = |e: csv::Error| Error::Table {
        path: format!("{}", path.as_ref().display()),
        message: e.to_string(),
    };

    let mut reader = tsv_reader_builder(true).from_reader(open_read(path.as_ref())?);
    let header = reader
        .headers()
        .map_err(table_error)?
        .iter()
        .map(|name| name.trim().to_string())
        .collect::<Vec<_>>();

    let mut result: IndexMap<String, Vec<f64>> =
        header.iter().map(|name| (name.clone(), Vec::new())).collect();
    for record in reader.records() {
        let record = record.map_err(table_error)?;
        for (name, value) in header.iter().zip(record.iter()) {
            match value.trim().parse::<f64>() {
                Ok(value) if !value.is_nan() => {
                    if let Some(values) = result.get_mut(name) {
                        values.push(value);
                    }
                }
                _ => (),
            }
        }
    }

    Ok(result)
}

/// Median of the values, `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Decide the outcome of a test; ties in the median favour the second table.
pub fn verdict(
    p_value: f64,
    median_first: f64,
    median_second: f64,
    path_first: &str,
    path_second: &str,
) -> Verdict {
    if p_value > ALPHA {
        Verdict::Tie
    } else if median_first > median_second {
        Verdict::Better(path_first.to_string())
    } else {
        Verdict::Better(path_second.to_string())
    }
}

/// Compare one column of the two tables, `None` marks a column missing from a table.
pub fn compare_column(
    column: &str,
    first: Option<&[f64]>,
    second: Option<&[f64]>,
    path_first: &str,
    path_second: &str,
) -> ColumnComparison {
    let (first, second) = match (first, second) {
        (Some(first), Some(second)) => (first, second),
        _ => {
            return ColumnComparison {
                column: column.to_string(),
                result: None,
                verdict: Verdict::NotFound,
            };
        }
    };

    match (
        mann_whitney_u(first, second),
        median(first),
        median(second),
    ) {
        (Some(result), Some(median_first), Some(median_second)) => ColumnComparison {
            column: column.to_string(),
            result: Some(result),
            verdict: verdict(
                result.p_value,
                median_first,
                median_second,
                path_first,
                path_second,
            ),
        },
        _ => ColumnComparison {
            column: column.to_string(),
            result: None,
            verdict: Verdict::NoData,
        },
    }
}

/// Write the comparison table.
///
/// # Errors
///
/// In the case that the file cannot be written.
pub fn write_comparisons<P: AsRef<std::path::Path>>(
    path: P,
    comparisons: &[ColumnComparison],
) -> Result<(), anyhow::Error> {
    let mut writer = tsv_writer(path)?;
    writer.write_record(COMPARISON_HEADER)?;
    for comparison in comparisons {
        let (statistic, p_value) = comparison
            .result
            .map(|result| (result.statistic.to_string(), result.p_value.to_string()))
            .unwrap_or_default();
        let verdict = comparison.verdict.to_string();
        writer.write_record([
            comparison.column.as_str(),
            statistic.as_str(),
            p_value.as_str(),
            verdict.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Main entry point for `compare` sub command.
///
/// # Errors
///
/// In the case that the inputs cannot be read or the output cannot be written.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    crate::common::init_env_logger(args_common);

    tracing::info!("Loading score tables...");
    let before_loading = Instant::now();
    let first = load_score_columns(&args.path_first)
        .map_err(|e| anyhow::anyhow!("problem loading {}: {}", &args.path_first, e))?;
    let second = load_score_columns(&args.path_second)
        .map_err(|e| anyhow::anyhow!("problem loading {}: {}", &args.path_second, e))?;
    tracing::info!("...done loading in {:?}", before_loading.elapsed());

    let comparisons = score_columns()
        .into_iter()
        .map(|column| {
            for (path, table) in [(&args.path_first, &first), (&args.path_second, &second)] {
                if !table.contains_key(column) {
                    let err = Error::MissingColumn {
                        path: path.clone(),
                        column: column.to_string(),
                    };
                    tracing::warn!("{}", err);
                }
            }
            compare_column(
                column,
                first.get(column).map(Vec::as_slice),
                second.get(column).map(Vec::as_slice),
                &args.path_first,
                &args.path_second,
            )
        })
        .collect::<Vec<_>>();
    for comparison in &comparisons {
        tracing::info!("{}: {}", &comparison.column, &comparison.verdict);
    }

    write_comparisons(&args.path_output, &comparisons)?;

    tracing::info!("All done. Have a nice day!");
    Ok(())
}
