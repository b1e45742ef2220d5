//! Labeled configurations and their containers.
//!
//! The core abstraction is [`Point`]: one candidate configuration's feature
//! vector plus its (precomputed) scalar target. Points are reference-counted
//! ([`PointHandle`]) and the target lives in an interior cell, so a point
//! stored in several containers stays one point: relabeling it in one place
//! is visible everywhere. The surrogate ensemble's online recalibration
//! depends on this.
//!
//! [`PointSet`] is the ordered container used for shards, histories, and
//! candidate pools before they are handed to the controller. [`ops`] holds
//! the sparse-merge vector algebra and column normalization.

pub mod ops;
mod point;
mod point_set;

pub use point::{Entries, Features, Point, PointHandle};
pub use point_set::PointSet;

/// Data validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DataError {
    /// Sparse key and value arrays differ in length.
    #[error("sparse keys and values differ in length: {keys} keys, {values} values")]
    SparseLengthMismatch { keys: usize, values: usize },

    /// Sparse keys must be strictly ascending (sorted, no duplicates).
    #[error("sparse keys must be strictly ascending: key {key} at position {position}")]
    UnsortedSparseKeys { key: u32, position: usize },

    /// A point addresses a feature index outside the set's declared width.
    #[error("point uses feature index {max_key} but the set is declared with {n_values} values")]
    DimensionMismatch { max_key: u32, n_values: usize },

    /// The operation only supports dense points.
    #[error("operation requires dense points (found a sparse point at index {index})")]
    UnsupportedRepresentation { index: usize },
}
