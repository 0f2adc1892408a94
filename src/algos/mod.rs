//! Algorithms for semantic similarity and score comparison.

pub mod frequency;
pub mod mann_whitney;
pub mod resolver;
pub mod similarity;
