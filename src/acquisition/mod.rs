//! Candidate selection policies.
//!
//! An acquisition function picks the next point to evaluate out of a finite
//! candidate pool, trading off the surrogate's predicted value against its
//! uncertainty. [`ExpectedImprovement`] is the standard choice;
//! [`RandomAcquisition`] is the baseline every informed policy has to beat.

mod expected_improvement;
mod random;

pub use expected_improvement::ExpectedImprovement;
pub use random::RandomAcquisition;

use crate::data::{PointHandle, PointSet};
use crate::surrogate::SurrogateModel;

/// Errors from candidate selection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AcquisitionError {
    /// The candidate pool has no points left to select from.
    #[error("candidate pool is exhausted")]
    EmptyPool,

    /// The policy needs surrogate predictions but none was supplied.
    #[error("acquisition function requires a surrogate model")]
    SurrogateRequired,
}

/// A policy for choosing the next candidate to evaluate.
///
/// `select` returns a handle out of `pool`; the caller removes it from the
/// pool and reveals its target. Policies take `&mut self` so they can carry
/// random state.
pub trait AcquisitionFunction {
    /// Pick the next point from `pool`.
    ///
    /// `history` holds the points evaluated so far (used by policies that
    /// need the incumbent best). `surrogate` is absent in pure-exploration
    /// setups.
    ///
    /// # Errors
    ///
    /// Returns an [`AcquisitionError`] if the pool is empty or a required
    /// surrogate is missing.
    fn select(
        &mut self,
        pool: &[PointHandle],
        history: &PointSet,
        surrogate: Option<&dyn SurrogateModel>,
    ) -> Result<PointHandle, AcquisitionError>;
}
