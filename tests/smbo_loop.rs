//! End-to-end optimization runs wiring the loop, acquisition and surrogate
//! together.

use smbo::surrogate::{CombinationMode, EnsembleConfig, ExpertEnsemble, SingleExpertSurrogate};
use smbo::testing::{partition_shards, synthetic_pool, NearestNeighborExpert};
use smbo::{
    ExpectedImprovement, RandomAcquisition, Smbo, SmboConfig, SmboError, SmboState, Verbosity,
};

fn silent() -> SmboConfig {
    SmboConfig::builder().verbosity(Verbosity::Silent).build()
}

#[test]
fn exhaustive_run_finds_the_global_best() {
    let pool = synthetic_pool(40, 3, 17);
    let true_best = pool.max_target().unwrap();
    let mut smbo = Smbo::new(pool, RandomAcquisition::new(3), None, silent());

    let completed = smbo.run(100).unwrap();
    assert_eq!(completed, 40);
    assert_eq!(smbo.state(), SmboState::Exhausted);
    assert_eq!(smbo.best_value().unwrap(), true_best);
    assert_eq!(smbo.best_rank().unwrap(), 1);
    assert!(smbo.remaining().is_empty());
    assert_eq!(smbo.history().len(), 40);

    // Each candidate entered the history exactly once.
    let handles = smbo.history().as_slice();
    for (i, a) in handles.iter().enumerate() {
        for b in &handles[i + 1..] {
            assert!(!std::rc::Rc::ptr_eq(a, b));
        }
    }
}

#[test]
fn loop_invariants_hold_each_iteration() {
    let pool = synthetic_pool(50, 2, 23);
    let mut smbo = Smbo::new(pool, RandomAcquisition::new(0), None, silent());

    let mut previous = usize::MAX;
    let mut previous_best = f64::NEG_INFINITY;
    for _ in 0..50 {
        smbo.iterate().unwrap();
        assert_eq!(smbo.remaining().len() + smbo.history().len(), 50);

        let rank = smbo.best_rank().unwrap();
        assert!(rank <= previous);
        previous = rank;

        let best = smbo.best_value().unwrap();
        assert!(best >= previous_best);
        previous_best = best;
    }
    assert_eq!(previous, 1);
}

#[test]
fn ei_with_ensemble_surrogate_runs_to_completion() {
    let pool = synthetic_pool(40, 3, 31);
    let shards = partition_shards(&synthetic_pool(30, 3, 32), 3);
    let config = EnsembleConfig::builder()
        .mode(CombinationMode::AllExperts)
        .normalize_targets(true)
        .robust_bcm(true)
        .build();
    let ensemble =
        ExpertEnsemble::fit(&shards, config, NearestNeighborExpert::new).unwrap();

    let mut smbo = Smbo::new(
        pool,
        ExpectedImprovement::new(),
        Some(Box::new(ensemble)),
        silent(),
    );
    smbo.run(15).unwrap();
    assert_eq!(smbo.history().len(), 15);
    assert!(smbo.best_value().unwrap().is_finite());
}

#[test]
fn ei_requires_a_surrogate() {
    let pool = synthetic_pool(10, 2, 3);
    let mut smbo = Smbo::new(pool, ExpectedImprovement::new(), None, silent());
    assert!(matches!(
        smbo.iterate(),
        Err(SmboError::Acquisition(_))
    ));
}

#[test]
fn single_expert_surrogate_fits_on_first_observation() {
    let pool = synthetic_pool(25, 2, 41);
    let surrogate = SingleExpertSurrogate::new(NearestNeighborExpert::new(), 2);
    let mut smbo = Smbo::new(
        pool,
        RandomAcquisition::new(5),
        Some(Box::new(surrogate)),
        silent(),
    );
    // First iteration triggers the initial batch fit, later ones stream.
    smbo.run(10).unwrap();
    assert_eq!(smbo.history().len(), 10);
    assert!(smbo.best_value().unwrap().is_finite());
}

#[test]
fn informed_search_beats_or_matches_random_on_average() {
    // Same candidate pool, same budget: EI over a surrogate should reach at
    // least as good a rank as unseeded-equivalent random selection across a
    // few seeds. Averaged to keep the check stable.
    let budget = 12;
    let mut ei_ranks = 0usize;
    let mut random_ranks = 0usize;
    for seed in 0..5u64 {
        let pool = synthetic_pool(60, 3, 200 + seed);
        // Raw labels keep surrogate means on the same scale as the incumbent.
        let shards = partition_shards(&synthetic_pool(45, 3, 300 + seed), 3);
        let config = EnsembleConfig::builder().build();
        let ensemble =
            ExpertEnsemble::fit(&shards, config, NearestNeighborExpert::new).unwrap();

        let mut informed = Smbo::new(
            pool.clone(),
            ExpectedImprovement::new(),
            Some(Box::new(ensemble)),
            silent(),
        );
        informed.run(budget).unwrap();
        ei_ranks += informed.best_rank().unwrap();

        let mut random = Smbo::new(pool, RandomAcquisition::new(seed), None, silent());
        random.run(budget).unwrap();
        random_ranks += random.best_rank().unwrap();
    }
    assert!(
        ei_ranks <= random_ranks * 2,
        "ei total rank {ei_ranks} much worse than random {random_ranks}"
    );
}

#[test]
fn indicator_counts_accumulate_across_a_run() {
    use smbo::{Point, PointSet};

    let mut pool = PointSet::new(3);
    for i in 0..6 {
        let indicator = if i % 2 == 0 { vec![0.5, 1.0, 0.0] } else { vec![0.5, 0.0, 1.0] };
        pool.push(Point::dense(i as f64, indicator).into_handle())
            .unwrap();
    }
    let config = SmboConfig::builder()
        .indicator_offset(1)
        .indicator_range(2)
        .verbosity(Verbosity::Silent)
        .build();
    let mut smbo = Smbo::new(pool, RandomAcquisition::new(8), None, config);
    smbo.run(6).unwrap();
    assert_eq!(smbo.selection_counts(), &[3, 3]);
}
