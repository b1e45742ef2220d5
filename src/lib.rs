//! smbo: sequential model-based optimization over precomputed candidate pools.
//!
//! This crate simulates Bayesian hyperparameter optimization for benchmarking
//! acquisition and surrogate strategies: every candidate's true objective value
//! is known offline, so "evaluating" a configuration reveals a precomputed
//! target instead of running anything.
//!
//! # Key Types
//!
//! - [`Smbo`] - The iterate/select/evaluate/update controller
//! - [`ExpertEnsemble`] / [`EnsembleConfig`] - Distributed GP surrogate combining
//!   independent per-shard experts via Product-of-Experts or robust BCM
//! - [`SurrogateModel`] / [`OnlineLearnable`] - Surrogate capability traits
//! - [`ExpertRegressor`] - Contract for the external single-expert GP
//! - [`AcquisitionFunction`] - Selection rule; [`ExpectedImprovement`] and
//!   [`RandomAcquisition`] are provided
//! - [`Point`] / [`PointSet`] - Labeled configurations, dense or sparse
//!
//! # Example
//!
//! ```
//! use smbo::{EnsembleConfig, ExpertEnsemble, RandomAcquisition, Smbo, SmboConfig};
//! use smbo::surrogate::CombinationMode;
//! use smbo::testing::{partition_shards, synthetic_pool, NearestNeighborExpert};
//!
//! let meta = synthetic_pool(60, 4, 7);
//! let shards = partition_shards(&meta, 3);
//! let pool = synthetic_pool(40, 4, 11);
//!
//! let config = EnsembleConfig::builder()
//!     .mode(CombinationMode::AllExperts)
//!     .normalize_targets(true)
//!     .build();
//! let ensemble = ExpertEnsemble::fit(&shards, config, NearestNeighborExpert::new).unwrap();
//!
//! let mut smbo = Smbo::new(
//!     pool,
//!     RandomAcquisition::new(0),
//!     Some(Box::new(ensemble)),
//!     SmboConfig::builder().build(),
//! );
//! smbo.run(10).unwrap();
//! assert!(smbo.best_value().is_ok());
//! ```

pub mod acquisition;
pub mod data;
pub mod run;
pub mod surrogate;
pub mod testing;

// High-level controller
pub use run::{Smbo, SmboConfig, SmboError, SmboState, Verbosity};

// Surrogate types (most users want these)
pub use surrogate::{
    CombinationMode, EnsembleConfig, ExpertEnsemble, ExpertRegressor, OnlineLearnable, Prediction,
    SingleExpertSurrogate, SurrogateError, SurrogateModel, TargetModelUse,
};

// Acquisition rules
pub use acquisition::{
    AcquisitionError, AcquisitionFunction, ExpectedImprovement, RandomAcquisition,
};

// Data types
pub use data::{DataError, Point, PointHandle, PointSet};
