//! Product-of-Experts / robust BCM expert ensemble.
//!
//! A single exact GP has cubic training cost in the number of points, so one
//! global model cannot be refitted as observations accumulate. The ensemble
//! sidesteps that: the training data is partitioned into disjoint shards, one
//! independent expert is fitted per shard, and their Gaussian predictions are
//! multiplied at query time — precision-weighted averaging. The lost
//! cross-shard correlation is approximated by the combination rule.
//!
//! # Combination rules
//!
//! With per-expert weight `β_i`, mean `μ_i` and precision `p_i = 1/σ_i²`:
//!
//! - plain PoE: `μ = Σ β_i p_i μ_i / Σ β_i p_i`, `σ = 1/√(Σ β_i p_i)`
//! - robust BCM: the divisor gains a `(1 − Σ β_i)` correction that removes
//!   the experts' shared-prior overconfidence; with `Σ β_i = 1` it degrades
//!   to plain precision combination.
//!
//! Weights are either fixed at construction or, with
//! [`EnsembleConfig::dynamic_weights`], derived per query from each expert's
//! differential entropy (`−½·ln σ_i²`): the more confident an expert is at
//! this particular point, the more it counts.
//!
//! # Online recalibration
//!
//! Each shard is (optionally) label-normalized once, at construction, using
//! only its own statistics. The online phase instead tracks one global
//! running mean/sd over everything revealed so far. That statistic drifts
//! with every new observation, so scaled labels issued earlier go stale and
//! are rewritten in place before the next prediction — through the shared
//! target cells, simultaneously in every expert that stored them.

use std::cell::Cell;
use std::rc::Rc;

use bon::Builder;

use crate::data::{PointHandle, PointSet};

use super::{
    ExpertRegressor, OnlineLearnable, Prediction, SurrogateError, SurrogateModel,
};

/// Lower bound on a predictive variance before inverting it.
///
/// An expert reporting zero variance would otherwise contribute infinite
/// precision and absorb the whole combination.
pub const VARIANCE_FLOOR: f64 = 1e-12;

/// How expert predictions are combined with the auxiliary target model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinationMode {
    /// Shard experts plus an auxiliary "target" expert trained only on the
    /// online-revealed sequence. Half the static weight mass is reserved for
    /// the target model.
    SingleExpert,
    /// Shard experts only; online points are pushed into every expert.
    AllExperts,
}

/// Lifetime of the auxiliary target model's contribution in
/// [`CombinationMode::SingleExpert`].
///
/// The reference behavior resets the "online point seen" flag at the end of
/// every prediction, which makes the target model's contribution a one-shot
/// effect after each update and forces the next update to re-fit the target
/// model from scratch on a single point. That looks unintended but is the
/// observed behavior, so it is the default here rather than being silently
/// "fixed"; `Persistent` is the plausible intended reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetModelUse {
    /// Reference behavior: the target model contributes only to the first
    /// prediction following each online update.
    #[default]
    FirstPredictionOnly,
    /// The target model accumulates observations and contributes to every
    /// prediction after the first online point.
    Persistent,
}

/// Construction parameters for an [`ExpertEnsemble`].
///
/// # Example
///
/// ```
/// use smbo::surrogate::{CombinationMode, EnsembleConfig};
///
/// let config = EnsembleConfig::builder()
///     .mode(CombinationMode::AllExperts)
///     .normalize_targets(true)
///     .robust_bcm(true)
///     .build();
/// assert!(!config.dynamic_weights);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct EnsembleConfig {
    /// Expert combination mode.
    #[builder(default = CombinationMode::AllExperts)]
    pub mode: CombinationMode,

    /// Normalize shard labels at construction and rescale online labels
    /// against the running global statistic.
    #[builder(default)]
    pub normalize_targets: bool,

    /// Use the robust-BCM divisor instead of plain PoE.
    #[builder(default)]
    pub robust_bcm: bool,

    /// Derive weights per query from predictive differential entropy instead
    /// of using the static weights.
    #[builder(default)]
    pub dynamic_weights: bool,

    /// Weight of the auxiliary target model in `SingleExpert` mode.
    #[builder(default = 0.5)]
    pub target_beta: f64,

    /// See [`TargetModelUse`].
    #[builder(default)]
    pub target_model_use: TargetModelUse,
}

/// Ensemble of independent per-shard expert regressors.
///
/// Fitted once over a fixed shard partition; thereafter it only learns
/// online, one revealed point at a time. Batch [`SurrogateModel::train`] is
/// deliberately unsupported.
///
/// # Example
///
/// ```
/// use smbo::surrogate::{CombinationMode, EnsembleConfig, ExpertEnsemble};
/// use smbo::testing::{partition_shards, synthetic_pool, NearestNeighborExpert};
///
/// let meta = synthetic_pool(30, 3, 5);
/// let shards = partition_shards(&meta, 3);
/// let config = EnsembleConfig::builder().mode(CombinationMode::AllExperts).build();
/// let ensemble = ExpertEnsemble::fit(&shards, config, NearestNeighborExpert::new).unwrap();
///
/// let query = smbo::Point::dense(0.0, vec![0.2, 0.4, 0.6]);
/// let prediction = ensemble.predict_with_uncertainty(&query);
/// assert!(prediction.std_dev > 0.0);
/// ```
pub struct ExpertEnsemble<E> {
    config: EnsembleConfig,
    n_values: usize,
    experts: Vec<E>,
    betas: Vec<f64>,

    /// Raw online observations, in arrival order.
    online_seen: PointSet,
    /// Scaled copies issued to experts/target model, parallel to
    /// `online_seen`. Their target cells are shared with every container the
    /// copies were pushed into.
    online_scaled: Vec<PointHandle>,
    /// Running (mean, sd) over the raw online targets.
    online_stats: (f64, f64),

    target_model: E,
    /// True until the target model has been fitted; flipped back by
    /// predictions under [`TargetModelUse::FirstPredictionOnly`].
    target_model_untrained: Cell<bool>,
}

impl<E: ExpertRegressor> ExpertEnsemble<E> {
    /// Fit one expert per shard and assemble the combiner.
    ///
    /// Shards are disjoint by contract and fixed for the ensemble's lifetime.
    /// With [`EnsembleConfig::normalize_targets`], each expert trains on a
    /// normalized copy of its shard (`(t − mean)/sd`, unbiased sd, a zero sd
    /// treated as 1); otherwise shards are used as-is, handles shared.
    ///
    /// # Errors
    ///
    /// Returns a [`SurrogateError`] if there are no shards, a shard is empty,
    /// or shard widths disagree.
    pub fn fit(
        shards: &[PointSet],
        config: EnsembleConfig,
        mut make_expert: impl FnMut() -> E,
    ) -> Result<Self, SurrogateError> {
        if shards.is_empty() {
            return Err(SurrogateError::NoShards);
        }
        let n_values = shards[0].n_values();
        for (index, shard) in shards.iter().enumerate() {
            if shard.is_empty() {
                return Err(SurrogateError::EmptyShard { index });
            }
            if shard.n_values() != n_values {
                return Err(SurrogateError::ShardWidthMismatch {
                    index,
                    expected: n_values,
                    got: shard.n_values(),
                });
            }
        }

        let n = shards.len();
        let static_beta = if config.robust_bcm {
            1.0
        } else {
            match config.mode {
                CombinationMode::SingleExpert => 1.0 / (2 * n) as f64,
                CombinationMode::AllExperts => 1.0 / n as f64,
            }
        };

        let mut experts = Vec::with_capacity(n);
        for shard in shards {
            let train_data = if config.normalize_targets {
                normalize_targets(shard).0
            } else {
                let mut shared = PointSet::with_capacity(n_values, shard.len());
                for point in shard {
                    shared.push_trusted(point.clone());
                }
                shared
            };
            let mut expert = make_expert();
            expert.set_learn_kernel_parameters(true);
            expert.train(&train_data);
            experts.push(expert);
        }

        Ok(Self {
            config,
            n_values,
            betas: vec![static_beta; n],
            experts,
            online_seen: PointSet::new(n_values),
            online_scaled: Vec::new(),
            online_stats: (0.0, 0.0),
            target_model: make_expert(),
            target_model_untrained: Cell::new(true),
        })
    }

    /// Number of shard experts.
    pub fn n_experts(&self) -> usize {
        self.experts.len()
    }

    /// The static combination weights.
    pub fn betas(&self) -> &[f64] {
        &self.betas
    }

    /// Replace the static combination weights (calibration hook).
    ///
    /// # Errors
    ///
    /// Returns [`SurrogateError::BetaCountMismatch`] unless one weight per
    /// expert is supplied.
    pub fn set_betas(&mut self, betas: Vec<f64>) -> Result<(), SurrogateError> {
        if betas.len() != self.experts.len() {
            return Err(SurrogateError::BetaCountMismatch {
                expected: self.experts.len(),
                got: betas.len(),
            });
        }
        self.betas = betas;
        Ok(())
    }

    /// The configuration this ensemble was built with.
    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Raw online observations incorporated so far (normalizing mode only;
    /// without normalization points flow straight to the experts).
    pub fn online_observed(&self) -> &PointSet {
        &self.online_seen
    }

    /// Running (mean, sd) over the raw online targets.
    pub fn online_stats(&self) -> (f64, f64) {
        self.online_stats
    }

    /// The shard experts.
    pub fn experts(&self) -> &[E] {
        &self.experts
    }

    /// Combined predictive mean and standard deviation for a point.
    pub fn predict_with_uncertainty(&self, point: &crate::data::Point) -> Prediction {
        let mut numerator = 0.0;
        let mut sum_precision = 0.0;
        let mut sum_betas = 0.0;

        for (expert, &static_beta) in self.experts.iter().zip(&self.betas) {
            let predicted = expert.predict_with_uncertainty(point);
            let variance = predicted.variance().max(VARIANCE_FLOOR);
            // Weights are a pure function of the query: the stored betas are
            // never overwritten by prediction.
            let beta = if self.config.dynamic_weights {
                -0.5 * variance.ln()
            } else {
                static_beta
            };
            let precision = 1.0 / variance;
            numerator += beta * precision * predicted.mean;
            sum_precision += beta * precision;
            sum_betas += beta;
        }

        if self.config.mode == CombinationMode::SingleExpert {
            if !self.target_model_untrained.get() {
                let predicted = self.target_model.predict_with_uncertainty(point);
                let variance = predicted.variance().max(VARIANCE_FLOOR);
                let precision = 1.0 / variance;
                numerator += self.config.target_beta * precision * predicted.mean;
                sum_precision += self.config.target_beta * precision;
                sum_betas += self.config.target_beta;
            }
            if self.config.target_model_use == TargetModelUse::FirstPredictionOnly {
                self.target_model_untrained.set(true);
            }
        }

        let divisor = if self.config.robust_bcm {
            sum_precision + (1.0 - sum_betas)
        } else {
            sum_precision
        };
        Prediction::new(numerator / divisor, 1.0 / divisor.sqrt())
    }

    fn update_target_model(&mut self, point: &PointHandle) {
        if self.target_model_untrained.get() {
            // No model to update yet (or the one-shot flag reset it): batch
            // fit on just this point.
            let mut seed = PointSet::with_capacity(self.n_values, 1);
            seed.push_trusted(point.clone());
            self.target_model.train(&seed);
            self.target_model_untrained.set(false);
        } else {
            self.target_model.online_update(point);
        }
    }
}

impl<E: ExpertRegressor> SurrogateModel for ExpertEnsemble<E> {
    fn train(&mut self, _history: &PointSet) -> Result<(), SurrogateError> {
        Err(SurrogateError::BatchTrainUnsupported)
    }

    fn predict(&self, point: &crate::data::Point) -> Prediction {
        self.predict_with_uncertainty(point)
    }

    fn as_online_mut(&mut self) -> Option<&mut dyn OnlineLearnable> {
        Some(self)
    }
}

impl<E: ExpertRegressor> OnlineLearnable for ExpertEnsemble<E> {
    fn online_update(&mut self, point: &PointHandle) {
        if self.config.normalize_targets {
            self.online_seen.push_trusted(point.clone());
            let (mean, sd) = self.online_seen.target_mean_sd();
            self.online_stats = (mean, sd);

            // The global statistic moved: rewrite every previously issued
            // scaled label in place. The cells are shared, so the rewrite is
            // visible at once in every expert that stored the copy.
            let previously_seen = self.online_seen.len() - 1;
            for (raw, scaled) in self
                .online_seen
                .iter()
                .take(previously_seen)
                .zip(&self.online_scaled)
            {
                scaled.set_target(normalize(raw.target(), mean, sd));
            }

            let scaled_new: PointHandle =
                Rc::new(point.copy_with_target(normalize(point.target(), mean, sd)));
            match self.config.mode {
                CombinationMode::AllExperts => {
                    for expert in &mut self.experts {
                        expert.online_update(&scaled_new);
                    }
                }
                // Shard experts are left untouched in this sub-mode; only the
                // target model tracks the online sequence.
                CombinationMode::SingleExpert => self.update_target_model(&scaled_new),
            }
            self.online_scaled.push(scaled_new);
        } else {
            match self.config.mode {
                CombinationMode::AllExperts => {
                    for expert in &mut self.experts {
                        expert.online_update(point);
                    }
                }
                CombinationMode::SingleExpert => {
                    self.update_target_model(point);
                    for expert in &mut self.experts {
                        expert.online_update(point);
                    }
                }
            }
        }
    }
}

/// `(value - mean) / sd`, with a zero sd treated as an identity scale.
fn normalize(value: f64, mean: f64, sd: f64) -> f64 {
    (value - mean) / if sd == 0.0 { 1.0 } else { sd }
}

/// Normalized copy of a shard (targets replaced by their z-scores) plus the
/// statistic used.
pub(crate) fn normalize_targets(shard: &PointSet) -> (PointSet, (f64, f64)) {
    let (mean, sd) = shard.target_mean_sd();
    let mut out = PointSet::with_capacity(shard.n_values(), shard.len());
    for point in shard {
        out.push_trusted(
            point
                .copy_with_target(normalize(point.target(), mean, sd))
                .into_handle(),
        );
    }
    (out, (mean, sd))
}
