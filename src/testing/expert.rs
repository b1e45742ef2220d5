//! Expert regressor stand-ins for tests.

use crate::data::{ops, Point, PointHandle, PointSet};
use crate::surrogate::{ExpertRegressor, Prediction};

/// Expert with a fixed prediction that records everything it is shown.
///
/// Stored handles are live: a later rewrite of a shared target cell shows up
/// in [`StubExpert::stored_targets`], which is exactly what relabeling tests
/// need to observe.
#[derive(Debug, Clone)]
pub struct StubExpert {
    prediction: Prediction,
    points: Vec<PointHandle>,
    pub learn_kernel_parameters: bool,
    pub epochs: usize,
}

impl StubExpert {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self {
            prediction: Prediction::new(mean, std_dev),
            points: Vec::new(),
            learn_kernel_parameters: false,
            epochs: 0,
        }
    }

    /// Every handle received through `train` and `online_update`, in order.
    pub fn points(&self) -> &[PointHandle] {
        &self.points
    }

    /// Current target of every stored handle.
    pub fn stored_targets(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.target()).collect()
    }
}

impl ExpertRegressor for StubExpert {
    fn set_learn_kernel_parameters(&mut self, learn: bool) {
        self.learn_kernel_parameters = learn;
    }

    fn set_epochs(&mut self, epochs: usize) {
        self.epochs = epochs;
    }

    fn train(&mut self, data: &PointSet) {
        self.points = data.as_slice().to_vec();
    }

    fn predict_with_uncertainty(&self, _point: &Point) -> Prediction {
        self.prediction
    }

    fn online_update(&mut self, point: &PointHandle) {
        self.points.push(point.clone());
    }
}

/// Distance-weighted regressor over its stored points.
///
/// A cheap stand-in for a real Gaussian process in end-to-end runs: close
/// training points dominate the mean, and the spread narrows near the data.
#[derive(Debug, Clone, Default)]
pub struct NearestNeighborExpert {
    points: Vec<PointHandle>,
}

/// Avoids an infinite weight on an exact feature match.
const DISTANCE_EPSILON: f64 = 1e-9;

impl NearestNeighborExpert {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExpertRegressor for NearestNeighborExpert {
    fn set_learn_kernel_parameters(&mut self, _learn: bool) {}

    fn set_epochs(&mut self, _epochs: usize) {}

    fn train(&mut self, data: &PointSet) {
        self.points = data.as_slice().to_vec();
    }

    fn predict_with_uncertainty(&self, point: &Point) -> Prediction {
        if self.points.is_empty() {
            return Prediction::new(0.0, 1.0);
        }
        let weights: Vec<f64> = self
            .points
            .iter()
            .map(|p| 1.0 / (ops::euclidean_distance(p, point) + DISTANCE_EPSILON))
            .collect();
        let total: f64 = weights.iter().sum();
        let mean: f64 = self
            .points
            .iter()
            .zip(&weights)
            .map(|(p, w)| w * p.target())
            .sum::<f64>()
            / total;
        let variance: f64 = self
            .points
            .iter()
            .zip(&weights)
            .map(|(p, w)| w * (p.target() - mean).powi(2))
            .sum::<f64>()
            / total;
        Prediction::new(mean, variance.sqrt().max(DISTANCE_EPSILON))
    }

    fn online_update(&mut self, point: &PointHandle) {
        self.points.push(point.clone());
    }
}
