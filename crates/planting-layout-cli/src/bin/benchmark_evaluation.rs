use anyhow::{Context, Result};
use planting_layout_core::engine::operators;
use planting_layout_core::{
    resolve_bounds, Field, FieldMetrics, OptimizerConfig, PopulationEngine, SoilClimateProfile,
    SpacingBounds, SpacingCandidate, SuitabilityTable,
};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::time::Instant;

fn create_candidates(size: usize, bounds: &SpacingBounds, seed: u64) -> Result<Vec<SpacingCandidate>> {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    operators::initialize(size, bounds, &mut rng).context("invalid population size")
}

fn main() -> Result<()> {
    let population_size = OptimizerConfig::MAX_POPULATION_SIZE;
    let rounds: u32 = 200;
    println!(
        "Benchmarking fitness evaluation: {} candidates x {} rounds",
        population_size, rounds
    );

    let geometry = Field::square_from_area([18.0, -77.0], 25.0)
        .validate()
        .context("benchmark field is invalid")?;
    let resolved = resolve_bounds(
        &SuitabilityTable::builtin(),
        &SoilClimateProfile::new("loam", "tropical"),
    );
    let candidates = create_candidates(population_size, &resolved.bounds, 42)?;

    let config = OptimizerConfig::default().with_population_size(population_size);
    let sequential = PopulationEngine::new(
        config.clone().with_parallel_evaluation(false),
        FieldMetrics::from(&geometry),
        resolved.bounds,
    )?;
    let parallel = PopulationEngine::new(
        config.with_parallel_evaluation(true),
        FieldMetrics::from(&geometry),
        resolved.bounds,
    )?;

    let start = Instant::now();
    let mut seq_result = Vec::new();
    for _ in 0..rounds {
        seq_result = sequential.evaluate(&candidates);
    }
    let duration_seq = start.elapsed();
    println!("Sequential: {:?} total, {:?} per round", duration_seq, duration_seq / rounds);

    let start = Instant::now();
    let mut par_result = Vec::new();
    for _ in 0..rounds {
        par_result = parallel.evaluate(&candidates);
    }
    let duration_par = start.elapsed();
    println!("Parallel:   {:?} total, {:?} per round", duration_par, duration_par / rounds);

    anyhow::ensure!(
        seq_result == par_result,
        "parallel evaluation diverged from sequential"
    );
    println!(
        "Speedup: {:.2}x",
        duration_seq.as_secs_f64() / duration_par.as_secs_f64().max(f64::EPSILON)
    );
    Ok(())
}
