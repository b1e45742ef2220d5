//! Uniform random candidate selection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::{PointHandle, PointSet};
use crate::surrogate::SurrogateModel;

use super::{AcquisitionError, AcquisitionFunction};

/// Picks candidates uniformly at random, ignoring the surrogate.
///
/// Seeded for reproducible runs.
#[derive(Debug)]
pub struct RandomAcquisition {
    rng: StdRng,
}

impl RandomAcquisition {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl AcquisitionFunction for RandomAcquisition {
    fn select(
        &mut self,
        pool: &[PointHandle],
        _history: &PointSet,
        _surrogate: Option<&dyn SurrogateModel>,
    ) -> Result<PointHandle, AcquisitionError> {
        if pool.is_empty() {
            return Err(AcquisitionError::EmptyPool);
        }
        let index = self.rng.random_range(0..pool.len());
        Ok(pool[index].clone())
    }
}
