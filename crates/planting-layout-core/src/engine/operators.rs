use crate::bounds::SpacingBounds;
use crate::candidate::{Individual, SpacingCandidate};
use crate::config::{ConfigError, OptimizerConfig};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Per-gene mutation probability and noise scale (fraction of bound range).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MutationParams {
    pub rate: f64,
    pub scale: f64,
}

impl From<&OptimizerConfig> for MutationParams {
    fn from(config: &OptimizerConfig) -> Self {
        Self {
            rate: config.mutation_rate,
            scale: config.mutation_scale,
        }
    }
}

fn uniform_in<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    if lo < hi {
        rng.random_range(lo..=hi)
    } else {
        lo
    }
}

/// Draw `size` candidates uniformly over the bounds rectangle.
pub fn initialize<R: Rng + ?Sized>(
    size: usize,
    bounds: &SpacingBounds,
    rng: &mut R,
) -> Result<Vec<SpacingCandidate>, ConfigError> {
    if size < OptimizerConfig::MIN_POPULATION_SIZE {
        return Err(ConfigError::PopulationTooSmall {
            min: OptimizerConfig::MIN_POPULATION_SIZE,
            actual: size,
        });
    }
    let [row, plant] = bounds.gene_ranges();
    Ok((0..size)
        .map(|_| {
            let row_spacing = uniform_in(rng, row);
            let plant_spacing = uniform_in(rng, plant);
            SpacingCandidate::new(row_spacing, plant_spacing)
        })
        .collect())
}

/// Sort by fitness descending with the deterministic density tie-break.
pub fn rank(population: &mut [Individual]) {
    population.sort_by(Individual::rank_cmp);
}

/// Truncation selection: the top `k` individuals by rank.
pub fn select(population: &[Individual], k: usize) -> Vec<Individual> {
    let mut ranked = population.to_vec();
    rank(&mut ranked);
    ranked.truncate(k.min(ranked.len()));
    ranked
}

/// Arithmetic blend with an independent weight per gene, re-clamped.
pub fn crossover<R: Rng + ?Sized>(
    a: &SpacingCandidate,
    b: &SpacingCandidate,
    bounds: &SpacingBounds,
    rng: &mut R,
) -> SpacingCandidate {
    let (ga, gb) = (a.genes(), b.genes());
    let mut child = [0.0; 2];
    for (gene, (x, y)) in child.iter_mut().zip(ga.into_iter().zip(gb)) {
        let alpha = rng.random_range(0.0..=1.0);
        *gene = alpha * x + (1.0 - alpha) * y;
    }
    bounds.clamp(SpacingCandidate::from_genes(child))
}

/// Gaussian perturbation of each gene with probability `params.rate`.
pub fn mutate<R: Rng + ?Sized>(
    candidate: &SpacingCandidate,
    params: &MutationParams,
    bounds: &SpacingBounds,
    rng: &mut R,
) -> SpacingCandidate {
    let mut genes = candidate.genes();
    for (gene, (lo, hi)) in genes.iter_mut().zip(bounds.gene_ranges()) {
        if rng.random::<f64>() < params.rate {
            let sigma = params.scale * (hi - lo);
            let z: f64 = StandardNormal.sample(rng);
            *gene += z * sigma;
        }
    }
    bounds.clamp(SpacingCandidate::from_genes(genes))
}

/// Two parent indices into a pool, distinct whenever the pool allows it.
pub(crate) fn pick_parents<R: Rng + ?Sized>(pool_len: usize, rng: &mut R) -> (usize, usize) {
    let i = rng.random_range(0..pool_len);
    if pool_len < 2 {
        return (i, i);
    }
    let mut j = rng.random_range(0..pool_len - 1);
    if j >= i {
        j += 1;
    }
    (i, j)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suitability::Tolerance;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn bounds() -> SpacingBounds {
        SpacingBounds::around(SpacingCandidate::new(0.8, 0.5), Tolerance::default())
    }

    #[test]
    fn initialize_rejects_tiny_populations() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        assert_eq!(
            initialize(3, &bounds(), &mut rng),
            Err(ConfigError::PopulationTooSmall { min: 4, actual: 3 })
        );
    }

    #[test]
    fn initialize_draws_inside_bounds() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let b = bounds();
        let pop = initialize(200, &b, &mut rng).unwrap();
        assert_eq!(pop.len(), 200);
        assert!(pop.iter().all(|c| b.contains(c)));
    }

    #[test]
    fn select_breaks_ties_towards_denser_rows() {
        let pop = vec![
            Individual::new(SpacingCandidate::new(0.9, 0.5), 0.7),
            Individual::new(SpacingCandidate::new(0.7, 0.5), 0.7),
            Individual::new(SpacingCandidate::new(1.0, 0.5), 0.9),
            Individual::new(SpacingCandidate::new(0.65, 0.5), 0.1),
        ];
        let top = select(&pop, 2);
        assert_eq!(top[0].candidate.row_spacing_m, 1.0);
        assert_eq!(top[1].candidate.row_spacing_m, 0.7);
    }

    #[test]
    fn select_result_does_not_depend_on_input_order() {
        let mut pop: Vec<Individual> = (0..12)
            .map(|i| {
                let candidate = SpacingCandidate::new(0.64 + 0.03 * i as f64, 0.5);
                Individual::new(candidate, (i % 3) as f64 / 3.0)
            })
            .collect();
        let forward = select(&pop, 5);
        pop.reverse();
        assert_eq!(select(&pop, 5), forward);
    }

    #[test]
    fn crossover_child_lies_between_parents() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let a = SpacingCandidate::new(0.7, 0.45);
        let b = SpacingCandidate::new(1.0, 0.6);
        for _ in 0..100 {
            let child = crossover(&a, &b, &bounds(), &mut rng);
            assert!((0.7 - 1e-12..=1.0 + 1e-12).contains(&child.row_spacing_m));
            assert!((0.45 - 1e-12..=0.6 + 1e-12).contains(&child.plant_spacing_m));
        }
    }

    #[test]
    fn mutation_is_deterministic_for_fixed_seed() {
        let params = MutationParams {
            rate: 0.5,
            scale: 0.2,
        };
        let c = SpacingCandidate::new(0.8, 0.5);
        let mut rng_a = ChaCha12Rng::seed_from_u64(123);
        let mut rng_b = ChaCha12Rng::seed_from_u64(123);
        for _ in 0..20 {
            assert_eq!(
                mutate(&c, &params, &bounds(), &mut rng_a),
                mutate(&c, &params, &bounds(), &mut rng_b)
            );
        }
    }

    #[test]
    fn mutation_respects_bounds() {
        let params = MutationParams {
            rate: 1.0,
            scale: 1.0,
        };
        let b = bounds();
        let mut rng = ChaCha12Rng::seed_from_u64(42);
        let mut c = b.recommended;
        for _ in 0..500 {
            c = mutate(&c, &params, &b, &mut rng);
            assert!(b.contains(&c), "{c:?} escaped bounds");
        }
    }

    #[test]
    fn zero_rate_leaves_candidate_unchanged() {
        let params = MutationParams {
            rate: 0.0,
            scale: 0.5,
        };
        let mut rng = ChaCha12Rng::seed_from_u64(9);
        let c = SpacingCandidate::new(0.8, 0.5);
        assert_eq!(mutate(&c, &params, &bounds(), &mut rng), c);
    }

    #[test]
    fn parents_are_distinct_when_possible() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        for _ in 0..100 {
            let (i, j) = pick_parents(4, &mut rng);
            assert_ne!(i, j);
            assert!(i < 4 && j < 4);
        }
        assert_eq!(pick_parents(1, &mut rng), (0, 0));
    }
}
