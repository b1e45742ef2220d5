//! Expected improvement over the incumbent best.

use crate::data::{PointHandle, PointSet};
use crate::surrogate::SurrogateModel;

use super::{AcquisitionError, AcquisitionFunction};

const SQRT_2PI: f64 = 2.5066282746310007;

/// Expected improvement for maximization.
///
/// For a candidate with predicted mean `μ` and standard deviation `σ`, and
/// incumbent best `f*`:
///
/// ```text
/// EI = (μ − f*)·Φ(z) + σ·φ(z),  z = (μ − f*)/σ
/// ```
///
/// A candidate the surrogate is certain about (`σ = 0`) scores its plain
/// improvement, clipped at zero. Before any point has been evaluated there
/// is no incumbent, so the candidate with the highest predicted mean wins.
///
/// # Example
///
/// ```
/// use smbo::{AcquisitionFunction, ExpectedImprovement, PointSet};
/// use smbo::testing::{synthetic_pool, StubExpert};
/// use smbo::surrogate::{SingleExpertSurrogate, SurrogateModel};
///
/// let pool = synthetic_pool(10, 2, 7);
/// let surrogate = SingleExpertSurrogate::new(StubExpert::new(0.5, 0.1), 2);
/// let mut ei = ExpectedImprovement::new();
/// let picked = ei
///     .select(pool.as_slice(), &PointSet::new(2), Some(&surrogate))
///     .unwrap();
/// assert!(pool.as_slice().iter().any(|p| std::rc::Rc::ptr_eq(p, &picked)));
/// ```
#[derive(Debug, Default)]
pub struct ExpectedImprovement;

impl ExpectedImprovement {
    pub fn new() -> Self {
        Self
    }
}

fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / SQRT_2PI
}

fn norm_cdf(x: f64) -> f64 {
    0.5 * libm::erfc(-x * std::f64::consts::FRAC_1_SQRT_2)
}

fn expected_improvement(mean: f64, std_dev: f64, best: f64) -> f64 {
    let improvement = mean - best;
    if std_dev <= 0.0 {
        return improvement.max(0.0);
    }
    let z = improvement / std_dev;
    improvement * norm_cdf(z) + std_dev * norm_pdf(z)
}

impl AcquisitionFunction for ExpectedImprovement {
    fn select(
        &mut self,
        pool: &[PointHandle],
        history: &PointSet,
        surrogate: Option<&dyn SurrogateModel>,
    ) -> Result<PointHandle, AcquisitionError> {
        if pool.is_empty() {
            return Err(AcquisitionError::EmptyPool);
        }
        let surrogate = surrogate.ok_or(AcquisitionError::SurrogateRequired)?;

        let score: Box<dyn Fn(&PointHandle) -> f64 + '_> = match history.max_target() {
            Some(best) => Box::new(move |point: &PointHandle| {
                let p = surrogate.predict(point);
                expected_improvement(p.mean, p.std_dev, best)
            }),
            // No incumbent yet: pure exploitation of the predicted mean.
            None => Box::new(|point: &PointHandle| surrogate.predict(point).mean),
        };

        let mut best_index = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (index, point) in pool.iter().enumerate() {
            let s = score(point);
            if s > best_score {
                best_score = s;
                best_index = index;
            }
        }
        Ok(pool[best_index].clone())
    }
}
