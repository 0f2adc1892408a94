//! This is the `gosim` library.
//!
//! Semantic similarity between predicted and known Gene Ontology annotations, based on
//! information content derived from an annotation corpus.
#![deny(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod algos;
pub mod common;
pub mod compare;
mod error;
pub mod ontology;
pub mod score;

pub use crate::error::*;
