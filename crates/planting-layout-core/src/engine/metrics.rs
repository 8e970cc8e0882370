use crate::candidate::Individual;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

fn spacing_distance(a: &Individual, b: &Individual) -> f64 {
    (a.candidate.row_spacing_m - b.candidate.row_spacing_m)
        .hypot(a.candidate.plant_spacing_m - b.candidate.plant_spacing_m)
}

/// One generation of a run. Generation 0 is the initial random population.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub index: u32,
    pub best: Individual,
    pub mean_fitness: f64,
    pub fitness_std: f64,
    /// Mean pairwise spacing distance in metres; falls as the search settles.
    pub spacing_diversity: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub population: Vec<Individual>,
}

/// Compact per-generation point for progress charts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitnessPoint {
    pub generation: u32,
    pub best_fitness: f64,
    pub mean_fitness: f64,
}

impl GenerationRecord {
    /// Summarise a ranked population. The snapshot is only kept when asked,
    /// so compact runs stay small.
    pub(crate) fn capture(index: u32, ranked: &[Individual], keep_snapshot: bool) -> Self {
        let n = ranked.len().max(1) as f64;
        let mean_fitness = ranked.iter().map(|i| i.fitness).sum::<f64>() / n;
        let fitness_std = if ranked.len() < 2 {
            0.0
        } else {
            let var = ranked
                .iter()
                .map(|i| (i.fitness - mean_fitness).powi(2))
                .sum::<f64>()
                / (ranked.len() - 1) as f64;
            var.sqrt()
        };
        Self {
            index,
            best: ranked[0],
            mean_fitness,
            fitness_std,
            spacing_diversity: spacing_diversity(index, ranked),
            population: if keep_snapshot {
                ranked.to_vec()
            } else {
                Vec::new()
            },
        }
    }

    pub fn point(&self) -> FitnessPoint {
        FitnessPoint {
            generation: self.index,
            best_fitness: self.best.fitness,
            mean_fitness: self.mean_fitness,
        }
    }
}

fn spacing_diversity(index: u32, population: &[Individual]) -> f64 {
    let n = population.len();
    if n < 2 {
        return 0.0;
    }

    // Sample up to 64 pairs to avoid O(n^2) cost on large populations
    let max_pairs = 64usize;
    let total_pairs = n * (n - 1) / 2;

    if total_pairs <= max_pairs {
        let mut sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                sum += spacing_distance(&population[i], &population[j]);
            }
        }
        sum / total_pairs as f64
    } else {
        // Seeded by generation index so the summary is reproducible and does
        // not consume the search RNG.
        let mut sample_rng = ChaCha12Rng::seed_from_u64(index as u64);
        let mut sum = 0.0;
        for _ in 0..max_pairs {
            let i = sample_rng.random_range(0..n);
            let mut j = sample_rng.random_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            sum += spacing_distance(&population[i], &population[j]);
        }
        sum / max_pairs as f64
    }
}
