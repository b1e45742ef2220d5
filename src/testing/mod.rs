//! Deterministic test fixtures.
//!
//! Compiled into the crate so doctests, unit tests and integration tests all
//! share the same expert stubs and data generators.

mod expert;

pub use expert::{NearestNeighborExpert, StubExpert};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::{Point, PointSet};

/// Seeded pool of dense points.
///
/// Features are uniform in `[0, 1)` and the target is a smooth function of
/// the features, so nearby points carry similar targets and
/// distance-weighted experts have something to learn.
pub fn synthetic_pool(n_points: usize, n_values: usize, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pool = PointSet::with_capacity(n_values, n_points);
    for _ in 0..n_points {
        let values: Vec<f64> = (0..n_values).map(|_| rng.random::<f64>()).collect();
        let target = values
            .iter()
            .enumerate()
            .map(|(i, v)| (v * (i + 1) as f64).sin())
            .sum::<f64>();
        pool.push_trusted(Point::dense(target, values).into_handle());
    }
    pool
}

/// Round-robin split into `n_shards` disjoint shards sharing the source
/// handles.
///
/// # Panics
///
/// Panics on `n_shards == 0`.
pub fn partition_shards(pool: &PointSet, n_shards: usize) -> Vec<PointSet> {
    assert!(n_shards > 0, "need at least one shard");
    let mut shards: Vec<PointSet> = (0..n_shards)
        .map(|_| PointSet::new(pool.n_values()))
        .collect();
    for (index, point) in pool.iter().enumerate() {
        shards[index % n_shards].push_trusted(point.clone());
    }
    shards
}
