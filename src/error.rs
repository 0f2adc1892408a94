//! Error type definition.

use thiserror::Error;

/// Error type for `gosim`
#[derive(Error, Debug)]
pub enum Error {
    /// The ontology could not be read or parsed, or contains no term frames.
    #[error("could not load ontology from {path}: {message}")]
    Load {
        /// Path of the ontology file.
        path: String,
        /// Description of the problem.
        message: String,
    },
    /// The ancestor relation of the ontology contains a cycle.
    #[error("cycle in ontology graph involving term {0}")]
    Cycle(String),
    /// An expected column is absent from an input table.
    #[error("column {column} not found in {path}")]
    MissingColumn {
        /// Path of the table.
        path: String,
        /// Name of the missing column.
        column: String,
    },
    /// An input table could not be parsed.
    #[error("problem reading table {path}: {message}")]
    Table {
        /// Path of the table.
        path: String,
        /// Description of the problem.
        message: String,
    },
    /// Low-level I/O problem.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
