//! Sequential model-based optimization loop.
//!
//! [`Smbo`] owns a finite candidate pool whose targets are treated as hidden
//! until selected. Each iteration the acquisition function picks a candidate,
//! the candidate leaves the pool, its target is revealed into the history,
//! the running best is updated, and the surrogate learns the new observation.
//!
//! The full pool is retained alongside the shrinking working copy so that
//! rank queries ("how does the best found compare against everything that
//! could have been chosen") stay answerable throughout the run.

mod logger;

pub use logger::Verbosity;

use bon::Builder;

use crate::acquisition::{AcquisitionError, AcquisitionFunction};
use crate::data::{ops, PointHandle, PointSet};
use crate::surrogate::{SurrogateError, SurrogateModel};

use logger::RunLogger;

/// Errors from the optimization loop.
#[derive(Debug, thiserror::Error)]
pub enum SmboError {
    /// `iterate` was called with no candidates left.
    #[error("candidate pool is exhausted")]
    PoolExhausted,

    /// The acquisition function returned a handle that is not in the pool.
    #[error("acquisition selected a point that is not in the candidate pool")]
    SelectionNotInPool,

    /// A best-so-far query before the first iteration.
    #[error("no iterations have run yet")]
    NotStarted,

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Surrogate(#[from] SurrogateError),
}

/// Loop phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmboState {
    /// No iteration has run.
    #[default]
    Idle,
    /// At least one candidate has been evaluated.
    Iterating,
    /// The pool ran out; further `iterate` calls fail.
    Exhausted,
}

/// Loop parameters.
///
/// Indicator counting inspects the feature window
/// `[indicator_offset, indicator_offset + indicator_range)` of each selected
/// candidate and counts, per position, how often the feature equals one.
/// With one-hot encoded provenance features this tallies how often each
/// source was chosen. A zero `indicator_range` disables counting.
#[derive(Debug, Clone, Builder)]
pub struct SmboConfig {
    /// First feature index of the indicator window.
    #[builder(default)]
    pub indicator_offset: usize,

    /// Width of the indicator window.
    #[builder(default)]
    pub indicator_range: usize,

    /// Run output level.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Sequential model-based optimizer over a finite candidate pool.
///
/// # Example
///
/// ```
/// use smbo::{RandomAcquisition, Smbo, SmboConfig};
/// use smbo::testing::synthetic_pool;
///
/// let pool = synthetic_pool(20, 3, 1);
/// let mut smbo = Smbo::new(
///     pool,
///     RandomAcquisition::new(0),
///     None,
///     SmboConfig::builder().build(),
/// );
/// let completed = smbo.run(5).unwrap();
/// assert_eq!(completed, 5);
/// assert_eq!(smbo.history().len(), 5);
/// assert!(smbo.best_value().is_ok());
/// ```
pub struct Smbo<A> {
    /// Working pool; shrinks as candidates are selected.
    pool: Vec<PointHandle>,
    /// The original pool, retained for rank queries.
    full_pool: PointSet,
    history: PointSet,
    acquisition: A,
    surrogate: Option<Box<dyn SurrogateModel>>,
    best: Option<PointHandle>,
    state: SmboState,
    selection_counts: Vec<usize>,
    iterations: usize,
    config: SmboConfig,
    logger: RunLogger,
}

impl<A: AcquisitionFunction> Smbo<A> {
    pub fn new(
        pool: PointSet,
        acquisition: A,
        surrogate: Option<Box<dyn SurrogateModel>>,
        config: SmboConfig,
    ) -> Self {
        let working = pool.as_slice().to_vec();
        let logger = RunLogger::new(config.verbosity);
        Self {
            pool: working,
            history: PointSet::new(pool.n_values()),
            full_pool: pool,
            acquisition,
            surrogate,
            best: None,
            state: SmboState::default(),
            selection_counts: vec![0; config.indicator_range],
            iterations: 0,
            config,
            logger,
        }
    }

    /// Run one iteration and return the evaluated point.
    ///
    /// # Errors
    ///
    /// [`SmboError::PoolExhausted`] when no candidates remain (the state
    /// moves to [`SmboState::Exhausted`]); selection and surrogate failures
    /// propagate as their typed variants.
    pub fn iterate(&mut self) -> Result<PointHandle, SmboError> {
        if self.pool.is_empty() {
            self.state = SmboState::Exhausted;
            self.logger.exhausted(self.iterations);
            return Err(SmboError::PoolExhausted);
        }

        let chosen = self
            .acquisition
            .select(&self.pool, &self.history, self.surrogate.as_deref())?;
        let position =
            ops::position_of(&self.pool, &chosen).ok_or(SmboError::SelectionNotInPool)?;
        // Ordered removal keeps the remaining candidates in pool order.
        self.pool.remove(position);

        self.iterations += 1;
        self.state = SmboState::Iterating;
        self.logger.iteration(self.iterations, chosen.target());

        let improved = match &self.best {
            None => true,
            Some(best) => chosen.target() > best.target(),
        };
        if improved {
            self.best = Some(chosen.clone());
            self.logger.new_best(self.iterations, chosen.target());
        }

        self.history.push_trusted(chosen.clone());
        self.update_surrogate(&chosen)?;
        self.count_indicators(&chosen);

        Ok(chosen)
    }

    /// Run up to `budget` iterations, stopping cleanly when the pool runs
    /// out. Returns the number of iterations completed.
    ///
    /// # Errors
    ///
    /// Propagates every failure except pool exhaustion.
    pub fn run(&mut self, budget: usize) -> Result<usize, SmboError> {
        for completed in 0..budget {
            match self.iterate() {
                Ok(_) => {}
                Err(SmboError::PoolExhausted) => return Ok(completed),
                Err(other) => return Err(other),
            }
        }
        Ok(budget)
    }

    fn update_surrogate(&mut self, chosen: &PointHandle) -> Result<(), SmboError> {
        let Some(surrogate) = self.surrogate.as_deref_mut() else {
            return Ok(());
        };
        // A model that starts untrained gets its initial batch fit on the
        // first observation; from then on capability decides.
        if surrogate.needs_initial_fit() && self.history.len() == 1 {
            surrogate.train(&self.history)?;
        } else if let Some(online) = surrogate.as_online_mut() {
            online.online_update(chosen);
        } else {
            surrogate.train(&self.history)?;
        }
        Ok(())
    }

    fn count_indicators(&mut self, chosen: &PointHandle) {
        let offset = self.config.indicator_offset;
        for slot in 0..self.config.indicator_range {
            if chosen.value(offset + slot) == 1.0 {
                self.selection_counts[slot] += 1;
            }
        }
    }

    /// Best target observed so far.
    ///
    /// # Errors
    ///
    /// [`SmboError::NotStarted`] before the first iteration.
    pub fn best_value(&self) -> Result<f64, SmboError> {
        self.best
            .as_ref()
            .map(|p| p.target())
            .ok_or(SmboError::NotStarted)
    }

    /// Rank of the best observed target within the full original pool
    /// (1 = nothing in the pool beats it). Non-increasing over a run.
    ///
    /// # Errors
    ///
    /// [`SmboError::NotStarted`] before the first iteration.
    pub fn best_rank(&self) -> Result<usize, SmboError> {
        let best = self.best_value()?;
        Ok(ops::rank_of(&self.full_pool, best))
    }

    /// Per-slot counts of indicator features observed on selected candidates.
    pub fn selection_counts(&self) -> &[usize] {
        &self.selection_counts
    }

    pub fn state(&self) -> SmboState {
        self.state
    }

    /// Evaluated points, in selection order.
    pub fn history(&self) -> &PointSet {
        &self.history
    }

    /// Candidates not yet selected, in pool order.
    pub fn remaining(&self) -> &[PointHandle] {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::RandomAcquisition;
    use crate::data::Point;
    use crate::surrogate::{OnlineLearnable, Prediction};
    use std::rc::Rc;

    /// Selects pool candidates front-to-back.
    struct FirstCandidate;

    impl AcquisitionFunction for FirstCandidate {
        fn select(
            &mut self,
            pool: &[PointHandle],
            _history: &PointSet,
            _surrogate: Option<&dyn SurrogateModel>,
        ) -> Result<PointHandle, AcquisitionError> {
            pool.first().cloned().ok_or(AcquisitionError::EmptyPool)
        }
    }

    /// Returns a handle the loop has never seen.
    struct RogueAcquisition;

    impl AcquisitionFunction for RogueAcquisition {
        fn select(
            &mut self,
            _pool: &[PointHandle],
            _history: &PointSet,
            _surrogate: Option<&dyn SurrogateModel>,
        ) -> Result<PointHandle, AcquisitionError> {
            Ok(Point::dense(0.0, vec![0.0]).into_handle())
        }
    }

    /// Records how the loop drives a surrogate.
    #[derive(Default)]
    struct RecordingSurrogate {
        needs_fit: bool,
        trained_sizes: Rc<std::cell::RefCell<Vec<usize>>>,
        online_targets: Rc<std::cell::RefCell<Vec<f64>>>,
        online_capable: bool,
    }

    impl SurrogateModel for RecordingSurrogate {
        fn train(&mut self, history: &PointSet) -> Result<(), SurrogateError> {
            self.trained_sizes.borrow_mut().push(history.len());
            Ok(())
        }

        fn predict(&self, _point: &Point) -> Prediction {
            Prediction::new(0.0, 1.0)
        }

        fn as_online_mut(&mut self) -> Option<&mut dyn OnlineLearnable> {
            if self.online_capable {
                Some(self)
            } else {
                None
            }
        }

        fn needs_initial_fit(&self) -> bool {
            self.needs_fit
        }
    }

    impl OnlineLearnable for RecordingSurrogate {
        fn online_update(&mut self, point: &PointHandle) {
            self.online_targets.borrow_mut().push(point.target());
        }
    }

    fn pool(targets: &[f64]) -> PointSet {
        let mut set = PointSet::new(1);
        for &t in targets {
            set.push_trusted(Point::dense(t, vec![t]).into_handle());
        }
        set
    }

    fn silent() -> SmboConfig {
        SmboConfig::builder().verbosity(Verbosity::Silent).build()
    }

    #[test]
    fn iterate_moves_candidate_to_history() {
        let mut smbo = Smbo::new(pool(&[1.0, 2.0, 3.0]), FirstCandidate, None, silent());
        assert_eq!(smbo.state(), SmboState::Idle);
        assert!(matches!(smbo.best_value(), Err(SmboError::NotStarted)));
        assert!(matches!(smbo.best_rank(), Err(SmboError::NotStarted)));

        let chosen = smbo.iterate().unwrap();
        assert_eq!(chosen.target(), 1.0);
        assert_eq!(smbo.state(), SmboState::Iterating);
        assert_eq!(smbo.history().len(), 1);
        assert_eq!(smbo.remaining().len(), 2);
        // Remaining candidates keep pool order.
        assert_eq!(smbo.remaining()[0].target(), 2.0);
        assert_eq!(smbo.remaining()[1].target(), 3.0);
    }

    #[test]
    fn best_updates_only_on_strict_improvement() {
        let mut smbo = Smbo::new(pool(&[2.0, 2.0, 5.0, 1.0]), FirstCandidate, None, silent());
        smbo.iterate().unwrap();
        assert_eq!(smbo.best_value().unwrap(), 2.0);
        let first_best = smbo.best.clone().unwrap();

        // Equal target: the earlier incumbent stays.
        smbo.iterate().unwrap();
        assert!(Rc::ptr_eq(&smbo.best.clone().unwrap(), &first_best));

        smbo.iterate().unwrap();
        assert_eq!(smbo.best_value().unwrap(), 5.0);
        smbo.iterate().unwrap();
        assert_eq!(smbo.best_value().unwrap(), 5.0);
    }

    #[test]
    fn best_rank_is_non_increasing() {
        let mut smbo = Smbo::new(pool(&[3.0, 1.0, 4.0, 1.5]), FirstCandidate, None, silent());
        smbo.iterate().unwrap();
        assert_eq!(smbo.best_rank().unwrap(), 2);
        smbo.iterate().unwrap();
        assert_eq!(smbo.best_rank().unwrap(), 2);
        smbo.iterate().unwrap();
        assert_eq!(smbo.best_rank().unwrap(), 1);
    }

    #[test]
    fn exhaustion_is_loud_and_sticky() {
        let mut smbo = Smbo::new(pool(&[1.0]), FirstCandidate, None, silent());
        smbo.iterate().unwrap();
        assert!(matches!(smbo.iterate(), Err(SmboError::PoolExhausted)));
        assert_eq!(smbo.state(), SmboState::Exhausted);
        assert!(matches!(smbo.iterate(), Err(SmboError::PoolExhausted)));
        // Queries still answer after exhaustion.
        assert_eq!(smbo.best_value().unwrap(), 1.0);
    }

    #[test]
    fn run_stops_cleanly_on_exhaustion() {
        let mut smbo = Smbo::new(pool(&[1.0, 2.0, 3.0]), FirstCandidate, None, silent());
        assert_eq!(smbo.run(10).unwrap(), 3);
        assert_eq!(smbo.state(), SmboState::Exhausted);
        assert_eq!(smbo.history().len(), 3);
    }

    #[test]
    fn rogue_selection_is_a_typed_error() {
        let mut smbo = Smbo::new(pool(&[1.0, 2.0]), RogueAcquisition, None, silent());
        assert!(matches!(smbo.iterate(), Err(SmboError::SelectionNotInPool)));
        // Nothing was consumed.
        assert_eq!(smbo.remaining().len(), 2);
        assert_eq!(smbo.history().len(), 0);
    }

    #[test]
    fn initial_fit_then_online_updates() {
        let trained = Rc::new(std::cell::RefCell::new(Vec::new()));
        let online = Rc::new(std::cell::RefCell::new(Vec::new()));
        let surrogate = RecordingSurrogate {
            needs_fit: true,
            trained_sizes: trained.clone(),
            online_targets: online.clone(),
            online_capable: true,
        };
        let mut smbo = Smbo::new(
            pool(&[1.0, 2.0, 3.0]),
            FirstCandidate,
            Some(Box::new(surrogate)),
            silent(),
        );
        smbo.run(3).unwrap();
        // First observation batch-fits; the rest stream in.
        assert_eq!(*trained.borrow(), vec![1]);
        assert_eq!(*online.borrow(), vec![2.0, 3.0]);
    }

    #[test]
    fn batch_only_surrogate_retrains_each_iteration() {
        let trained = Rc::new(std::cell::RefCell::new(Vec::new()));
        let surrogate = RecordingSurrogate {
            needs_fit: false,
            trained_sizes: trained.clone(),
            online_targets: Rc::default(),
            online_capable: false,
        };
        let mut smbo = Smbo::new(
            pool(&[1.0, 2.0, 3.0]),
            FirstCandidate,
            Some(Box::new(surrogate)),
            silent(),
        );
        smbo.run(3).unwrap();
        assert_eq!(*trained.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn indicator_counting_over_configured_window() {
        let mut set = PointSet::new(4);
        // Features: [payload, indicator0, indicator1, indicator2].
        set.push_trusted(Point::dense(1.0, vec![0.3, 1.0, 0.0, 0.0]).into_handle());
        set.push_trusted(Point::dense(2.0, vec![0.9, 0.0, 1.0, 0.0]).into_handle());
        set.push_trusted(Point::dense(3.0, vec![0.1, 1.0, 0.0, 0.0]).into_handle());
        let config = SmboConfig::builder()
            .indicator_offset(1)
            .indicator_range(3)
            .verbosity(Verbosity::Silent)
            .build();
        let mut smbo = Smbo::new(set, FirstCandidate, None, config);
        smbo.run(3).unwrap();
        assert_eq!(smbo.selection_counts(), &[2, 1, 0]);
    }

    #[test]
    fn random_runs_are_reproducible() {
        let run_targets = |seed: u64| {
            let mut smbo = Smbo::new(
                pool(&[1.0, 2.0, 3.0, 4.0, 5.0]),
                RandomAcquisition::new(seed),
                None,
                silent(),
            );
            smbo.run(5).unwrap();
            smbo.history().targets()
        };
        assert_eq!(run_targets(9), run_targets(9));
    }
}
