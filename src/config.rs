//! Configuration types for agent creation.

use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, types::Location};

/// Which population topology the engine maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusteringVariant {
    /// Reward and mapping share one assignment per hypothesis.
    #[default]
    Joint,
    /// Rewards and mappings are clustered by separate populations.
    Independent,
    /// Every context is its own cluster; a single hypothesis.
    Flat,
    /// All partitions of a fixed context count, weighted by normalized belief.
    FullEnumeration,
}

impl ClusteringVariant {
    pub const ALL: [ClusteringVariant; 4] = [
        ClusteringVariant::Joint,
        ClusteringVariant::Independent,
        ClusteringVariant::Flat,
        ClusteringVariant::FullEnumeration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClusteringVariant::Joint => "joint",
            ClusteringVariant::Independent => "independent",
            ClusteringVariant::Flat => "flat",
            ClusteringVariant::FullEnumeration => "full-enumeration",
        }
    }
}

impl fmt::Display for ClusteringVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusteringVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "joint" => Ok(ClusteringVariant::Joint),
            "independent" | "ind" => Ok(ClusteringVariant::Independent),
            "flat" | "none" => Ok(ClusteringVariant::Flat),
            "full-enumeration" | "full" | "map-clustering" => {
                Ok(ClusteringVariant::FullEnumeration)
            }
            other => Err(Error::config(format!(
                "unknown clustering variant '{other}'. Expected one of: joint, independent, flat, full-enumeration"
            ))),
        }
    }
}

/// Numeric parameters shared by the hypotheses and the engines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    /// Discount γ for policy iteration
    pub discount: f64,
    /// Convergence threshold for policy evaluation sweeps
    pub iteration_criterion: f64,
    /// Softmax inverse temperature (tie-breaking inside a hypothesis and
    /// exploration smoothing at selection)
    pub inverse_temperature: f64,
    /// Chinese Restaurant Process concentration α
    pub alpha: f64,
    /// Dirichlet pseudo-count per (primitive, abstract) pair
    pub mapping_prior: f64,
    /// Beta prior pseudo-reward per state
    pub reward_prior_mass: f64,
    /// Beta prior pseudo-visits per state (must exceed the pseudo-reward)
    pub reward_prior_visits: f64,
    /// Beta prior pseudo-reward at candidate goal states
    pub goal_prior_mass: f64,
    /// Probability of a uniform draw at each selection stage
    pub epsilon: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            discount: 0.8,
            iteration_criterion: 0.01,
            inverse_temperature: 100.0,
            alpha: 1.0,
            mapping_prior: 0.01,
            reward_prior_mass: 0.1,
            reward_prior_visits: 1.0,
            goal_prior_mass: 0.9,
            epsilon: 0.0,
        }
    }
}

impl Hyperparameters {
    /// Reject values that would make the belief or planning maths meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.discount) {
            return Err(Error::config(format!(
                "discount must lie in [0, 1), got {}",
                self.discount
            )));
        }
        if !(self.iteration_criterion.is_finite() && self.iteration_criterion > 0.0) {
            return Err(Error::config(format!(
                "iteration criterion must be positive, got {}",
                self.iteration_criterion
            )));
        }
        if !(self.inverse_temperature.is_finite() && self.inverse_temperature >= 0.0) {
            return Err(Error::config(format!(
                "inverse temperature must be finite and non-negative, got {}",
                self.inverse_temperature
            )));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(Error::config(format!(
                "concentration alpha must be positive, got {}",
                self.alpha
            )));
        }
        if !(self.mapping_prior.is_finite() && self.mapping_prior > 0.0) {
            return Err(Error::config(format!(
                "mapping prior must be positive, got {}",
                self.mapping_prior
            )));
        }
        if !(self.reward_prior_mass.is_finite()
            && self.reward_prior_mass > 0.0
            && self.reward_prior_visits.is_finite()
            && self.reward_prior_visits > self.reward_prior_mass)
        {
            return Err(Error::config(format!(
                "reward prior needs 0 < mass < visits, got mass={} visits={}",
                self.reward_prior_mass, self.reward_prior_visits
            )));
        }
        if !(self.goal_prior_mass.is_finite()
            && self.goal_prior_mass > 0.0
            && self.goal_prior_mass < self.reward_prior_visits)
        {
            return Err(Error::config(format!(
                "goal prior needs 0 < mass < visits, got mass={} visits={}",
                self.goal_prior_mass, self.reward_prior_visits
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(Error::config(format!(
                "epsilon must lie in [0, 1], got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Configuration for creating an agent.
///
/// # Examples
///
/// ```
/// use tasksets::config::{AgentConfig, ClusteringVariant};
///
/// let config = AgentConfig::new(ClusteringVariant::Independent)
///     .with_seed(7)
///     .with_pruning_threshold(50.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Population topology
    pub variant: ClusteringVariant,
    /// Belief and planning parameters
    pub hyperparameters: Hyperparameters,
    /// Hypotheses more than `ln(threshold)` below the best are pruned
    pub pruning_threshold: f64,
    /// Full enumeration only: cluster rewards too, or keep them per context
    pub reward_clustering: bool,
    /// Cells believed likely to hold the goal in every context
    pub goal_prior: Vec<Location>,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl AgentConfig {
    pub fn new(variant: ClusteringVariant) -> Self {
        let mut hyperparameters = Hyperparameters::default();
        if variant == ClusteringVariant::FullEnumeration {
            hyperparameters.epsilon = 0.025;
        }
        Self {
            variant,
            hyperparameters,
            pruning_threshold: 1000.0,
            reward_clustering: true,
            goal_prior: Vec::new(),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.hyperparameters.epsilon = epsilon;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.hyperparameters.alpha = alpha;
        self
    }

    pub fn with_inverse_temperature(mut self, inverse_temperature: f64) -> Self {
        self.hyperparameters.inverse_temperature = inverse_temperature;
        self
    }

    pub fn with_pruning_threshold(mut self, threshold: f64) -> Self {
        self.pruning_threshold = threshold;
        self
    }

    pub fn with_reward_clustering(mut self, enabled: bool) -> Self {
        self.reward_clustering = enabled;
        self
    }

    pub fn with_goal_prior(mut self, candidates: Vec<Location>) -> Self {
        self.goal_prior = candidates;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.hyperparameters.validate()?;
        if !(self.pruning_threshold.is_finite() && self.pruning_threshold >= 1.0) {
            return Err(Error::config(format!(
                "pruning threshold must be finite and at least 1, got {}",
                self.pruning_threshold
            )));
        }
        Ok(())
    }

    /// Load a JSON configuration file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| Error::Io {
            operation: format!("open config {}", path.display()),
            source,
        })?;
        let config: AgentConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new(ClusteringVariant::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_parse_from_their_display_names() {
        for variant in ClusteringVariant::ALL {
            assert_eq!(variant.to_string().parse::<ClusteringVariant>().unwrap(), variant);
        }
        assert!("hierarchical".parse::<ClusteringVariant>().is_err());
    }

    #[test]
    fn full_enumeration_defaults_to_some_exploration() {
        let config = AgentConfig::new(ClusteringVariant::FullEnumeration);
        assert_eq!(config.hyperparameters.epsilon, 0.025);
        assert_eq!(AgentConfig::default().hyperparameters.epsilon, 0.0);
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(AgentConfig::default().with_pruning_threshold(0.5).validate().is_err());
        assert!(AgentConfig::default().with_alpha(0.0).validate().is_err());
        assert!(AgentConfig::default().with_epsilon(1.5).validate().is_err());
        let mut hyper = Hyperparameters::default();
        hyper.reward_prior_mass = 2.0;
        assert!(hyper.validate().is_err());
        let mut hyper = Hyperparameters::default();
        hyper.goal_prior_mass = 1.0;
        assert!(hyper.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"variant": "flat", "seed": 3}"#).unwrap();
        assert_eq!(config.variant, ClusteringVariant::Flat);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.hyperparameters, Hyperparameters::default());
        assert_eq!(config.pruning_threshold, 1000.0);
        assert!(config.goal_prior.is_empty());
    }

    #[test]
    fn goal_prior_reads_from_json() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"goal_prior": [{"x": 5, "y": 5}, {"x": 0, "y": 5}]}"#)
                .unwrap();
        assert_eq!(config.goal_prior, vec![Location::new(5, 5), Location::new(0, 5)]);
        assert_eq!(
            AgentConfig::default().with_goal_prior(vec![Location::new(1, 1)]).goal_prior.len(),
            1
        );
    }
}
