use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LdaError, Result};

/// How the initial topic of every occurrence is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InitStrategy {
    /// One topic per document, shared by all of its occurrences.
    Uniform,
    /// An independent topic for every occurrence.
    #[default]
    Random,
}

impl FromStr for InitStrategy {
    type Err = LdaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(InitStrategy::Uniform),
            "random" => Ok(InitStrategy::Random),
            _ => Err(LdaError::UnknownInitStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for InitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStrategy::Uniform => write!(f, "uniform"),
            InitStrategy::Random => write!(f, "random"),
        }
    }
}

/// LDA model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdaConfig {
    /// Number of topics (K)
    pub num_topics: usize,
    /// Sweeps performed by `fit`
    pub num_iterations: usize,
    /// Document-topic prior
    pub alpha: f64,
    /// Topic-term prior
    pub beta: f64,
    /// Intermediate checkpoint period in sweeps, `None` disables it
    pub save_every: Option<usize>,
    pub init_strategy: InitStrategy,
    /// `None` seeds from OS entropy
    pub random_seed: Option<u64>,
    /// Root directory for checkpoints written by `fit`
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            num_topics: 10,
            num_iterations: 1000,
            alpha: 0.1,
            beta: 0.01,
            save_every: None,
            init_strategy: InitStrategy::Random,
            random_seed: None,
            checkpoint_dir: None,
        }
    }
}

impl LdaConfig {
    /// Create a new configuration with the given number of topics
    pub fn new(num_topics: usize) -> Self {
        Self {
            num_topics,
            ..Default::default()
        }
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn num_iterations(mut self, n: usize) -> Self {
        self.num_iterations = n;
        self
    }

    /// Checkpoint every `n` sweeps; `0` disables intermediate checkpoints.
    pub fn save_every(mut self, n: usize) -> Self {
        self.save_every = if n == 0 { None } else { Some(n) };
        self
    }

    pub fn init_strategy(mut self, strategy: InitStrategy) -> Self {
        self.init_strategy = strategy;
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    /// Reject configurations the sampler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_topics == 0 {
            return Err(LdaError::InvalidTopicCount);
        }
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(LdaError::InvalidHyperparameter { name, value });
            }
        }
        Ok(())
    }

    /// Effective checkpoint period, treating `Some(0)` as disabled.
    pub(crate) fn checkpoint_period(&self) -> Option<usize> {
        self.save_every.filter(|&n| n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = LdaConfig::new(4)
            .alpha(0.5)
            .beta(0.2)
            .num_iterations(30)
            .save_every(10)
            .init_strategy(InitStrategy::Uniform)
            .random_seed(7);

        assert_eq!(config.num_topics, 4);
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.beta, 0.2);
        assert_eq!(config.num_iterations, 30);
        assert_eq!(config.save_every, Some(10));
        assert_eq!(config.init_strategy, InitStrategy::Uniform);
        assert_eq!(config.random_seed, Some(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_every_zero_disables() {
        let config = LdaConfig::new(2).save_every(0);
        assert_eq!(config.save_every, None);

        let mut config = LdaConfig::new(2);
        config.save_every = Some(0);
        assert_eq!(config.checkpoint_period(), None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            LdaConfig::new(0).validate(),
            Err(LdaError::InvalidTopicCount)
        ));
        assert!(matches!(
            LdaConfig::new(2).alpha(0.0).validate(),
            Err(LdaError::InvalidHyperparameter { name: "alpha", .. })
        ));
        assert!(matches!(
            LdaConfig::new(2).beta(-0.1).validate(),
            Err(LdaError::InvalidHyperparameter { name: "beta", .. })
        ));
        assert!(LdaConfig::new(2).alpha(f64::NAN).validate().is_err());
        assert!(LdaConfig::new(2).beta(f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_init_strategy_parse() {
        assert_eq!("uniform".parse::<InitStrategy>().unwrap(), InitStrategy::Uniform);
        assert_eq!("Random".parse::<InitStrategy>().unwrap(), InitStrategy::Random);
        assert!("gaussian".parse::<InitStrategy>().is_err());
        assert_eq!(InitStrategy::Uniform.to_string(), "uniform");
    }
}
