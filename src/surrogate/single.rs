//! Single-expert surrogate adapter.

use crate::data::{Point, PointHandle, PointSet};

use super::{ExpertRegressor, OnlineLearnable, Prediction, SurrogateModel, SurrogateError};

/// One expert regressor exposed as a controller-facing surrogate.
///
/// Keeps its own copy of the last trained history (handles shared, ordering
/// preserved). The first observed point must be batch-fitted — there is no
/// posterior to update before that — so [`needs_initial_fit`] is `true` and
/// the controller routes the first history entry through [`train`].
///
/// [`needs_initial_fit`]: SurrogateModel::needs_initial_fit
/// [`train`]: SurrogateModel::train
#[derive(Debug)]
pub struct SingleExpertSurrogate<E> {
    expert: E,
    data: PointSet,
}

impl<E: ExpertRegressor> SingleExpertSurrogate<E> {
    /// Wrap an expert for a `n_values`-wide feature space.
    pub fn new(expert: E, n_values: usize) -> Self {
        Self {
            expert,
            data: PointSet::new(n_values),
        }
    }

    /// The training set the expert was last batch-fitted on.
    pub fn data(&self) -> &PointSet {
        &self.data
    }

    /// The wrapped expert.
    pub fn expert(&self) -> &E {
        &self.expert
    }

    /// Mutable access to the wrapped expert (configuration toggles).
    pub fn expert_mut(&mut self) -> &mut E {
        &mut self.expert
    }
}

impl<E: ExpertRegressor> SurrogateModel for SingleExpertSurrogate<E> {
    fn train(&mut self, history: &PointSet) -> Result<(), SurrogateError> {
        let mut data = PointSet::with_capacity(history.n_values(), history.len());
        data.extend_from(history)?;
        self.data = data;
        self.expert.train(&self.data);
        Ok(())
    }

    fn predict(&self, point: &Point) -> Prediction {
        self.expert.predict_with_uncertainty(point)
    }

    fn as_online_mut(&mut self) -> Option<&mut dyn OnlineLearnable> {
        Some(self)
    }

    fn needs_initial_fit(&self) -> bool {
        true
    }
}

impl<E: ExpertRegressor> OnlineLearnable for SingleExpertSurrogate<E> {
    fn online_update(&mut self, point: &PointHandle) {
        self.expert.online_update(point);
    }
}
