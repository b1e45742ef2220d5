//! Surrogate models and the expert ensemble.
//!
//! A surrogate is a cheap probabilistic stand-in for the true objective. This
//! module defines the capability traits the SMBO controller drives —
//! [`SurrogateModel`] for batch fitting and [`OnlineLearnable`] for
//! incremental updates — plus the contract the external single-expert GP
//! regressor is consumed through ([`ExpertRegressor`]).
//!
//! The crate's own surrogate is [`ExpertEnsemble`]: independent per-shard
//! experts combined at query time by Product-of-Experts or robust BCM
//! precision weighting. [`SingleExpertSurrogate`] adapts one expert to the
//! controller-facing traits.

pub mod ensemble;
mod single;

pub use ensemble::{
    CombinationMode, EnsembleConfig, ExpertEnsemble, TargetModelUse, VARIANCE_FLOOR,
};
pub use single::SingleExpertSurrogate;

use crate::data::{DataError, Point, PointHandle, PointSet};

/// A predictive distribution summarized as mean and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted mean of the target.
    pub mean: f64,
    /// Predictive standard deviation.
    pub std_dev: f64,
}

impl Prediction {
    /// Create a prediction.
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    /// Predictive variance (`std_dev` squared).
    #[inline]
    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }
}

/// Surrogate configuration and fitting errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SurrogateError {
    /// The ensemble's experts are fitted at construction; batch re-training
    /// over a history is not supported.
    #[error("batch training is not supported by this surrogate")]
    BatchTrainUnsupported,

    /// An ensemble needs at least one shard.
    #[error("cannot fit an ensemble without shards")]
    NoShards,

    /// Every shard must contain at least one point.
    #[error("shard {index} is empty")]
    EmptyShard { index: usize },

    /// All shards must share one feature dimensionality.
    #[error("shard {index} is {got} values wide, expected {expected}")]
    ShardWidthMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },

    /// A replacement weight vector must cover every expert.
    #[error("expected {expected} expert weights, got {got}")]
    BetaCountMismatch { expected: usize, got: usize },

    /// Underlying data error.
    #[error(transparent)]
    Data(#[from] DataError),
}

/// Batch-trainable surrogate over a history of evaluated points.
///
/// `train` is always safe to call and replaces the model from scratch.
/// Incremental updating is an optional capability probed through
/// [`SurrogateModel::as_online_mut`]; callers branch on its result instead of
/// downcasting.
pub trait SurrogateModel {
    /// Fit the model from scratch on the full current history.
    fn train(&mut self, history: &PointSet) -> Result<(), SurrogateError>;

    /// Predictive mean and uncertainty for a point.
    fn predict(&self, point: &Point) -> Prediction;

    /// Probe for incremental-update support.
    fn as_online_mut(&mut self) -> Option<&mut dyn OnlineLearnable> {
        None
    }

    /// Whether the very first observed point must go through [`train`]
    /// rather than an online update (no model exists to update yet).
    ///
    /// [`train`]: SurrogateModel::train
    fn needs_initial_fit(&self) -> bool {
        false
    }
}

/// Optional capability: incorporate exactly one new point without a refit.
pub trait OnlineLearnable {
    /// Incorporate one newly observed point.
    ///
    /// After this call, predictions reflect the point.
    fn online_update(&mut self, point: &PointHandle);
}

/// The external single-expert Gaussian-process regressor, as consumed by this
/// crate.
///
/// Kernel evaluation, hyperparameter learning, and posterior computation are
/// the implementor's concern; the ensemble only drives this interface.
pub trait ExpertRegressor {
    /// Enable or disable internal kernel-hyperparameter learning.
    fn set_learn_kernel_parameters(&mut self, enabled: bool);

    /// Number of optimization epochs used when learning hyperparameters.
    fn set_epochs(&mut self, epochs: usize);

    /// Fit the regressor from scratch on a training set.
    fn train(&mut self, data: &PointSet);

    /// Predictive mean and standard deviation for a point.
    fn predict_with_uncertainty(&self, point: &Point) -> Prediction;

    /// Incorporate one additional point without a full refit.
    fn online_update(&mut self, point: &PointHandle);
}
