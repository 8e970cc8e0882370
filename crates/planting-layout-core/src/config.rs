use serde::{Deserialize, Serialize};

/// Relative weights of the three fitness terms.
///
/// Only the ratios matter: the weighted sum is rescaled onto `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub density: f64,
    pub suitability: f64,
    pub edge_loss: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            density: 0.40,
            suitability: 0.45,
            edge_loss: 0.15,
        }
    }
}

impl FitnessWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [self.density, self.suitability, self.edge_loss];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) || self.density + self.suitability <= 0.0
        {
            return Err(ConfigError::InvalidWeights {
                density: self.density,
                suitability: self.suitability,
                edge_loss: self.edge_loss,
            });
        }
        Ok(())
    }
}

/// Search parameters for one optimization run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub population_size: usize,
    pub max_generations: u32,
    /// Per-gene mutation probability.
    pub mutation_rate: f64,
    /// Standard deviation of mutation noise as a fraction of the bound range.
    pub mutation_scale: f64,
    pub elite_count: usize,
    /// Share of the ranked population eligible as parents.
    pub selection_fraction: f64,
    pub stagnation_window: u32,
    /// A generation counts as stagnant when the best fitness improves by at
    /// most this much; `0.0` means only a strict improvement resets the count.
    pub convergence_epsilon: f64,
    pub parallel_evaluation: bool,
    pub weights: FitnessWeights,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            population_size: 40,
            max_generations: 60,
            mutation_rate: 0.2,
            mutation_scale: 0.1,
            elite_count: 2,
            selection_fraction: 0.5,
            stagnation_window: 10,
            convergence_epsilon: 1e-6,
            parallel_evaluation: true,
            weights: FitnessWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("population_size ({actual}) must be at least {min}")]
    PopulationTooSmall { min: usize, actual: usize },
    #[error("population_size ({actual}) exceeds supported maximum ({max})")]
    PopulationTooLarge { max: usize, actual: usize },
    #[error("max_generations must be positive")]
    NoGenerations,
    #[error("max_generations ({actual}) exceeds supported maximum ({max})")]
    TooManyGenerations { max: u32, actual: u32 },
    #[error("{name} must be within [0, 1], got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },
    #[error("elite_count ({elite_count}) must be between 1 and population_size - 1 ({population_size} - 1)")]
    InvalidEliteCount {
        elite_count: usize,
        population_size: usize,
    },
    #[error("stagnation_window must be positive")]
    InvalidStagnationWindow,
    #[error("convergence_epsilon must be finite and non-negative, got {0}")]
    InvalidEpsilon(f64),
    #[error("fitness weights must be finite and non-negative with a positive density or suitability weight (density={density}, suitability={suitability}, edge_loss={edge_loss})")]
    InvalidWeights {
        density: f64,
        suitability: f64,
        edge_loss: f64,
    },
}

impl OptimizerConfig {
    /// Two parents plus room for at least two elites.
    pub const MIN_POPULATION_SIZE: usize = 4;
    pub const MAX_POPULATION_SIZE: usize = 10_000;
    pub const MAX_GENERATIONS: u32 = 100_000;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < Self::MIN_POPULATION_SIZE {
            return Err(ConfigError::PopulationTooSmall {
                min: Self::MIN_POPULATION_SIZE,
                actual: self.population_size,
            });
        }
        if self.population_size > Self::MAX_POPULATION_SIZE {
            return Err(ConfigError::PopulationTooLarge {
                max: Self::MAX_POPULATION_SIZE,
                actual: self.population_size,
            });
        }
        if self.max_generations == 0 {
            return Err(ConfigError::NoGenerations);
        }
        if self.max_generations > Self::MAX_GENERATIONS {
            return Err(ConfigError::TooManyGenerations {
                max: Self::MAX_GENERATIONS,
                actual: self.max_generations,
            });
        }
        for (name, value) in [
            ("mutation_rate", self.mutation_rate),
            ("mutation_scale", self.mutation_scale),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RateOutOfRange { name, value });
            }
        }
        // A zero fraction would leave no parents to breed from.
        if !(self.selection_fraction > 0.0 && self.selection_fraction <= 1.0) {
            return Err(ConfigError::RateOutOfRange {
                name: "selection_fraction",
                value: self.selection_fraction,
            });
        }
        if self.elite_count == 0 || self.elite_count >= self.population_size {
            return Err(ConfigError::InvalidEliteCount {
                elite_count: self.elite_count,
                population_size: self.population_size,
            });
        }
        if self.stagnation_window == 0 {
            return Err(ConfigError::InvalidStagnationWindow);
        }
        if !self.convergence_epsilon.is_finite() || self.convergence_epsilon < 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.convergence_epsilon));
        }
        self.weights.validate()
    }

    /// Size of the truncation-selected parent pool, never below two.
    pub fn selection_size(&self) -> usize {
        let k = (self.population_size as f64 * self.selection_fraction).ceil() as usize;
        k.clamp(2, self.population_size)
    }

    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_max_generations(mut self, generations: u32) -> Self {
        self.max_generations = generations;
        self
    }

    pub fn with_elite_count(mut self, count: usize) -> Self {
        self.elite_count = count;
        self
    }

    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    pub fn with_stagnation_window(mut self, window: u32) -> Self {
        self.stagnation_window = window;
        self
    }

    pub fn with_convergence_epsilon(mut self, epsilon: f64) -> Self {
        self.convergence_epsilon = epsilon;
        self
    }

    pub fn with_parallel_evaluation(mut self, parallel: bool) -> Self {
        self.parallel_evaluation = parallel;
        self
    }

    pub fn with_weights(mut self, weights: FitnessWeights) -> Self {
        self.weights = weights;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(OptimizerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn population_below_four_is_rejected() {
        let config = OptimizerConfig::default()
            .with_population_size(3)
            .with_elite_count(1);
        assert_eq!(
            config.validate(),
            Err(ConfigError::PopulationTooSmall { min: 4, actual: 3 })
        );
    }

    #[test]
    fn zero_generations_is_rejected() {
        let config = OptimizerConfig::default().with_max_generations(0);
        assert_eq!(config.validate(), Err(ConfigError::NoGenerations));
    }

    #[test]
    fn elite_count_must_leave_room_for_children() {
        let config = OptimizerConfig::default()
            .with_population_size(4)
            .with_elite_count(4);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEliteCount { .. })
        ));
        let config = OptimizerConfig::default().with_elite_count(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEliteCount { .. })
        ));
    }

    #[test]
    fn mutation_rate_outside_unit_interval_is_rejected() {
        let config = OptimizerConfig::default().with_mutation_rate(1.5);
        assert_eq!(
            config.validate(),
            Err(ConfigError::RateOutOfRange {
                name: "mutation_rate",
                value: 1.5
            })
        );
    }

    #[test]
    fn weights_must_not_be_negative_or_all_zero() {
        let negative = FitnessWeights {
            edge_loss: -0.1,
            ..FitnessWeights::default()
        };
        assert!(negative.validate().is_err());
        let zero = FitnessWeights {
            density: 0.0,
            suitability: 0.0,
            edge_loss: 0.5,
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn selection_size_is_clamped() {
        let config = OptimizerConfig {
            population_size: 4,
            selection_fraction: 0.1,
            ..OptimizerConfig::default()
        };
        assert_eq!(config.selection_size(), 2);
        let config = OptimizerConfig::default();
        assert_eq!(config.selection_size(), 20);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{"population_size": 12, "elite_count": 3}"#).unwrap();
        assert_eq!(config.population_size, 12);
        assert_eq!(config.elite_count, 3);
        assert_eq!(config.max_generations, 60);
        assert_eq!(config.weights, FitnessWeights::default());
    }
}
