pub mod metrics;
pub mod operators;
#[cfg(test)]
mod tests;

pub use metrics::*;
pub use operators::MutationParams;

use crate::bounds::SpacingBounds;
use crate::candidate::{Individual, SpacingCandidate};
use crate::config::{ConfigError, OptimizerConfig};
use crate::fitness::{FieldMetrics, FitnessEvaluator};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag, checked between generations.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Caller-side soft limits. Exhausting either returns the best individual so
/// far rather than an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunBudget {
    pub max_generations: Option<u32>,
    pub time_limit: Option<Duration>,
}

#[derive(Clone, Debug, Default)]
pub struct RunControl {
    pub budget: RunBudget,
    pub cancel: Option<CancellationToken>,
    /// Keep a full population snapshot in every generation record.
    pub keep_snapshots: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxGenerations,
    Stagnation,
    Budget,
    Cancelled,
    DegenerateBounds,
}

impl StopReason {
    pub fn is_converged(self) -> bool {
        matches!(self, StopReason::Stagnation | StopReason::DegenerateBounds)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    pub best: Individual,
    /// Generations evolved after the initial population.
    pub generations_run: u32,
    pub stop_reason: StopReason,
    pub history: Vec<GenerationRecord>,
}

impl SearchOutcome {
    pub fn converged(&self) -> bool {
        self.stop_reason.is_converged()
    }
}

/// Elitist genetic search over spacing candidates for one field.
#[derive(Clone, Debug)]
pub struct PopulationEngine {
    config: OptimizerConfig,
    evaluator: FitnessEvaluator,
    field: FieldMetrics,
    bounds: SpacingBounds,
}

impl PopulationEngine {
    pub fn new(
        config: OptimizerConfig,
        field: FieldMetrics,
        bounds: SpacingBounds,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            evaluator: FitnessEvaluator::new(config.weights),
            config,
            field,
            bounds,
        })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn bounds(&self) -> &SpacingBounds {
        &self.bounds
    }

    /// Attach fitness to each candidate, preserving input order.
    ///
    /// Scoring is pure, so the parallel and sequential paths agree exactly.
    pub fn evaluate(&self, candidates: &[SpacingCandidate]) -> Vec<Individual> {
        let score = |c: &SpacingCandidate| {
            Individual::new(*c, self.evaluator.evaluate(c, &self.field, &self.bounds))
        };
        if self.config.parallel_evaluation {
            candidates.par_iter().map(score).collect()
        } else {
            candidates.iter().map(score).collect()
        }
    }

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(
            population_size = self.config.population_size,
            max_generations = self.config.max_generations,
        )
    )]
    pub fn run<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        control: &RunControl,
    ) -> Result<SearchOutcome, ConfigError> {
        let started = Instant::now();
        let initial = operators::initialize(self.config.population_size, &self.bounds, rng)?;
        let mut population = self.evaluate(&initial);
        operators::rank(&mut population);
        let mut history = vec![GenerationRecord::capture(
            0,
            &population,
            control.keep_snapshots,
        )];

        if self.bounds.is_degenerate() {
            tracing::debug!("degenerate bounds, every candidate is identical");
            return Ok(SearchOutcome {
                best: population[0],
                generations_run: 0,
                stop_reason: StopReason::DegenerateBounds,
                history,
            });
        }

        let mut generations_run = 0u32;
        let mut stagnant = 0u32;
        let mut best_fitness = population[0].fitness;

        let stop_reason = loop {
            if generations_run >= self.config.max_generations {
                break StopReason::MaxGenerations;
            }
            if control
                .budget
                .max_generations
                .is_some_and(|cap| generations_run >= cap)
            {
                break StopReason::Budget;
            }
            if control.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                break StopReason::Cancelled;
            }
            if control
                .budget
                .time_limit
                .is_some_and(|limit| started.elapsed() >= limit)
            {
                break StopReason::Budget;
            }

            population = self.next_generation(&population, rng);
            generations_run += 1;

            let new_best = population[0].fitness;
            if new_best - best_fitness <= self.config.convergence_epsilon {
                stagnant += 1;
            } else {
                stagnant = 0;
            }
            best_fitness = best_fitness.max(new_best);

            let record =
                GenerationRecord::capture(generations_run, &population, control.keep_snapshots);
            tracing::debug!(
                generation = generations_run,
                best_fitness = record.best.fitness,
                mean_fitness = record.mean_fitness,
                spacing_diversity = record.spacing_diversity,
                "generation complete"
            );
            history.push(record);

            if stagnant >= self.config.stagnation_window {
                break StopReason::Stagnation;
            }
        };

        if matches!(stop_reason, StopReason::Budget | StopReason::Cancelled) {
            tracing::warn!(
                ?stop_reason,
                generations_run,
                "search stopped early, returning best so far"
            );
        }

        Ok(SearchOutcome {
            best: population[0],
            generations_run,
            stop_reason,
            history,
        })
    }

    /// Elites carried unchanged, the rest bred from the truncation pool.
    fn next_generation<R: Rng + ?Sized>(
        &self,
        ranked: &[Individual],
        rng: &mut R,
    ) -> Vec<Individual> {
        let size = self.config.population_size;
        let elite_count = self.config.elite_count.min(ranked.len());
        let pool = operators::select(ranked, self.config.selection_size());
        let mutation = MutationParams::from(&self.config);

        let mut children = Vec::with_capacity(size - elite_count);
        while children.len() < size - elite_count {
            let (i, j) = operators::pick_parents(pool.len(), rng);
            let child =
                operators::crossover(&pool[i].candidate, &pool[j].candidate, &self.bounds, rng);
            children.push(operators::mutate(&child, &mutation, &self.bounds, rng));
        }

        let mut next = Vec::with_capacity(size);
        next.extend_from_slice(&ranked[..elite_count]);
        next.extend(self.evaluate(&children));
        operators::rank(&mut next);
        next
    }
}
