use super::*;
use crate::suitability::Tolerance;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

fn loam_tropical() -> SpacingBounds {
    SpacingBounds::around(SpacingCandidate::new(0.8, 0.5), Tolerance::default())
}

fn acre() -> FieldMetrics {
    FieldMetrics::new(4_050.0, 4.0 * 4_050f64.sqrt())
}

fn small_config() -> OptimizerConfig {
    OptimizerConfig::default()
        .with_population_size(16)
        .with_max_generations(25)
        .with_elite_count(2)
}

fn run_seeded(config: OptimizerConfig, seed: u64, control: &RunControl) -> SearchOutcome {
    let engine = PopulationEngine::new(config, acre(), loam_tropical()).unwrap();
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    engine.run(&mut rng, control).unwrap()
}

#[test]
fn engine_rejects_invalid_config() {
    let config = OptimizerConfig::default()
        .with_population_size(2)
        .with_elite_count(1);
    assert!(matches!(
        PopulationEngine::new(config, acre(), loam_tropical()),
        Err(ConfigError::PopulationTooSmall { .. })
    ));
}

#[test]
fn best_fitness_never_decreases() {
    let outcome = run_seeded(small_config(), 7, &RunControl::default());
    let best: Vec<f64> = outcome.history.iter().map(|r| r.best.fitness).collect();
    assert!(
        best.windows(2).all(|w| w[1] >= w[0]),
        "best fitness regressed: {best:?}"
    );
}

#[test]
fn history_has_one_record_per_generation_plus_initial() {
    let outcome = run_seeded(small_config(), 8, &RunControl::default());
    assert_eq!(outcome.history.len(), outcome.generations_run as usize + 1);
    for (i, record) in outcome.history.iter().enumerate() {
        assert_eq!(record.index as usize, i);
    }
}

#[test]
fn every_individual_stays_in_bounds() {
    let bounds = loam_tropical();
    let control = RunControl {
        keep_snapshots: true,
        ..RunControl::default()
    };
    let outcome = run_seeded(small_config(), 9, &control);
    for record in &outcome.history {
        assert_eq!(record.population.len(), 16);
        assert!(record.population.iter().all(|i| bounds.contains(&i.candidate)));
        assert!(record
            .population
            .iter()
            .all(|i| (0.0..=1.0).contains(&i.fitness)));
    }
    assert!(bounds.contains(&outcome.best.candidate));
}

#[test]
fn snapshot_population_is_ranked() {
    let control = RunControl {
        keep_snapshots: true,
        ..RunControl::default()
    };
    let outcome = run_seeded(small_config(), 10, &control);
    for record in &outcome.history {
        let fitness: Vec<f64> = record.population.iter().map(|i| i.fitness).collect();
        assert!(fitness.windows(2).all(|w| w[0] >= w[1]));
    }
}

#[test]
fn same_seed_same_outcome() {
    let a = run_seeded(small_config(), 11, &RunControl::default());
    let b = run_seeded(small_config(), 11, &RunControl::default());
    assert_eq!(a, b);
}

#[test]
fn parallel_and_sequential_evaluation_agree() {
    let parallel = run_seeded(
        small_config().with_parallel_evaluation(true),
        12,
        &RunControl::default(),
    );
    let sequential = run_seeded(
        small_config().with_parallel_evaluation(false),
        12,
        &RunControl::default(),
    );
    assert_eq!(parallel, sequential);
}

#[test]
fn stagnation_stops_early_and_counts_as_converged() {
    let config = small_config()
        .with_max_generations(500)
        .with_stagnation_window(3);
    let outcome = run_seeded(config, 13, &RunControl::default());
    assert_eq!(outcome.stop_reason, StopReason::Stagnation);
    assert!(outcome.converged());
    assert!(outcome.generations_run < 500);
}

#[test]
fn zero_epsilon_still_stagnates_on_a_plateau() {
    let config = small_config()
        .with_max_generations(2_000)
        .with_stagnation_window(3)
        .with_convergence_epsilon(0.0);
    let outcome = run_seeded(config, 21, &RunControl::default());
    assert_eq!(outcome.stop_reason, StopReason::Stagnation);
    assert!(outcome.generations_run < 2_000);
}

#[test]
fn reaching_max_generations_is_not_convergence() {
    let config = small_config()
        .with_max_generations(3)
        .with_stagnation_window(50);
    let outcome = run_seeded(config, 14, &RunControl::default());
    assert_eq!(outcome.generations_run, 3);
    assert_eq!(outcome.stop_reason, StopReason::MaxGenerations);
    assert!(!outcome.converged());
}

#[test]
fn generation_budget_returns_best_so_far() {
    let control = RunControl {
        budget: RunBudget {
            max_generations: Some(2),
            time_limit: None,
        },
        ..RunControl::default()
    };
    let config = small_config().with_stagnation_window(50);
    let outcome = run_seeded(config, 15, &control);
    assert_eq!(outcome.generations_run, 2);
    assert_eq!(outcome.stop_reason, StopReason::Budget);
    assert!(!outcome.converged());
}

#[test]
fn zero_time_limit_stops_after_initial_population() {
    let control = RunControl {
        budget: RunBudget {
            max_generations: None,
            time_limit: Some(Duration::ZERO),
        },
        ..RunControl::default()
    };
    let outcome = run_seeded(small_config(), 16, &control);
    assert_eq!(outcome.generations_run, 0);
    assert_eq!(outcome.stop_reason, StopReason::Budget);
    assert_eq!(outcome.history.len(), 1);
}

#[test]
fn cancelled_token_yields_partial_result() {
    let token = CancellationToken::new();
    token.cancel();
    let control = RunControl {
        cancel: Some(token.clone()),
        ..RunControl::default()
    };
    let outcome = run_seeded(small_config(), 17, &control);
    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert_eq!(outcome.generations_run, 0);
    assert!(loam_tropical().contains(&outcome.best.candidate));
    assert!(token.is_cancelled());
}

#[test]
fn degenerate_bounds_converge_at_generation_zero() {
    let bounds = SpacingBounds::fixed(SpacingCandidate::new(0.9, 0.6));
    let engine = PopulationEngine::new(small_config(), acre(), bounds).unwrap();
    let mut rng = ChaCha12Rng::seed_from_u64(18);
    let outcome = engine.run(&mut rng, &RunControl::default()).unwrap();
    assert_eq!(outcome.generations_run, 0);
    assert_eq!(outcome.stop_reason, StopReason::DegenerateBounds);
    assert!(outcome.converged());
    assert_eq!(outcome.best.candidate, SpacingCandidate::new(0.9, 0.6));
}

#[test]
fn search_beats_initial_population_on_average() {
    let config = small_config()
        .with_max_generations(40)
        .with_stagnation_window(40);
    let outcome = run_seeded(config, 19, &RunControl::default());
    let first = &outcome.history[0];
    let last = outcome.history.last().unwrap();
    assert!(last.mean_fitness >= first.mean_fitness);
    assert!(last.spacing_diversity <= first.spacing_diversity);
}
