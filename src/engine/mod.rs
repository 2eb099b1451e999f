//! Hypothesis-selection engines
//!
//! An engine keeps a population of clustering hypotheses, updates their
//! beliefs from experience, and chooses actions from the hypotheses it
//! currently favours. Four topologies are available:
//!
//! - [`JointEngine`]: one population of task sets; reward and mapping share
//!   an assignment
//! - [`IndependentEngine`]: separate reward and mapping populations
//! - [`FlatEngine`]: a single hypothesis with every context on its own
//! - [`FullEnumerationEngine`]: every partition of a fixed set of contexts,
//!   weighted by normalized belief
//!
//! [`Engine`] wraps them for dispatch from an [`AgentConfig`].

pub mod flat;
pub mod full;
pub mod independent;
pub mod joint;
pub mod population;
pub mod selection;

pub use flat::FlatEngine;
pub use full::FullEnumerationEngine;
pub use independent::IndependentEngine;
pub use joint::JointEngine;
pub use population::Population;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use self::selection::{
    explore, make_q_primitive, mapping_pmf, sample_index, softmax, uniform_index,
};
use crate::{
    Result,
    assignments::ClusterAssignment,
    config::{AgentConfig, ClusteringVariant, Hyperparameters},
    hypothesis::MappingHypothesis,
    planner::TransitionModel,
    ports::Task,
    types::{ActionChoice, ContextId, Experience, Observation, StateIndex},
};

/// Sizes of the state and action spaces an engine is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDimensions {
    pub n_states: usize,
    pub n_primitive_actions: usize,
    pub n_abstract_actions: usize,
    pub n_contexts: usize,
}

impl TaskDimensions {
    pub fn of(task: &dyn Task) -> Self {
        Self {
            n_states: task.n_states(),
            n_primitive_actions: task.n_primitive_actions(),
            n_abstract_actions: task.n_abstract_actions(),
            n_contexts: task.n_contexts(),
        }
    }
}

/// Number of live reward and mapping hypotheses.
///
/// Engines that pair both halves report the same count twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationSizes {
    pub reward: usize,
    pub mapping: usize,
}

/// Highest-belief assignment on each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestAssignments {
    pub reward: ClusterAssignment,
    pub mapping: ClusterAssignment,
}

/// Capabilities every engine provides to the agent.
///
/// Implementors supply the belief bookkeeping and the two queries that
/// selection depends on ([`abstract_action_pmf`](Self::abstract_action_pmf)
/// and [`governing_mapping`](Self::governing_mapping)); the two-stage
/// sampling itself is shared.
pub trait HypothesisEngine {
    /// Human-readable engine name.
    fn name(&self) -> &str;

    fn hyperparameters(&self) -> &Hyperparameters;

    /// Fold one experience into every hypothesis and rescore.
    fn update(&mut self, experience: &Experience) -> Result<()>;

    /// Raise the reward prior at candidate goal states for every reward
    /// hypothesis, including those created by later augmentation. Other
    /// states keep the base prior.
    fn set_goal_prior(&mut self, goals: &[StateIndex]) -> Result<()>;

    /// Grow the population to cover a newly seen context.
    fn augment_assignments(&mut self, context: ContextId) -> Result<()>;

    /// Drop hypotheses trailing the best by `ln(threshold)` or more.
    /// Returns the number removed.
    fn prune_hypothesis_space(&mut self, threshold: f64) -> Result<usize>;

    /// Pmf over abstract actions at the observation, before the selection
    /// softmax is applied.
    fn abstract_action_pmf(
        &self,
        observation: &Observation,
        model: &TransitionModel,
    ) -> Result<Vec<f64>>;

    /// Mapping hypothesis that translates directions into key presses.
    fn governing_mapping(&self) -> &MappingHypothesis;

    fn population_sizes(&self) -> PopulationSizes;

    fn best_assignments(&self) -> BestAssignments;

    /// Choose a direction: a uniform draw with probability ε, otherwise a
    /// sample from `softmax(pmf · β)`.
    fn select_abstract_action(
        &self,
        observation: &Observation,
        model: &TransitionModel,
        rng: &mut StdRng,
    ) -> Result<usize> {
        let params = self.hyperparameters();
        if explore(params.epsilon, rng) {
            return uniform_index(model.n_actions(), rng);
        }
        let pmf = self.abstract_action_pmf(observation, model)?;
        sample_index(&softmax(&pmf, params.inverse_temperature)?, rng)
    }

    /// Choose a key press: a uniform draw with probability ε, otherwise pick a
    /// direction and sample a key from the governing mapping.
    fn select_action(
        &self,
        observation: &Observation,
        model: &TransitionModel,
        rng: &mut StdRng,
    ) -> Result<ActionChoice> {
        let mapping = self.governing_mapping();
        if explore(self.hyperparameters().epsilon, rng) {
            return Ok(ActionChoice {
                primitive: uniform_index(mapping.n_primitive(), rng)?,
                abstract_action: None,
            });
        }
        let abstract_action = self.select_abstract_action(observation, model, rng)?;
        let pmf = mapping_pmf(mapping, observation.context, abstract_action)?;
        Ok(ActionChoice {
            primitive: sample_index(&pmf, rng)?,
            abstract_action: Some(abstract_action),
        })
    }

    /// Expected value of each key press at the observation, projecting the
    /// abstract pmf through the governing mapping.
    fn primitive_values(
        &self,
        observation: &Observation,
        model: &TransitionModel,
    ) -> Result<Vec<f64>> {
        let q_abstract = self.abstract_action_pmf(observation, model)?;
        let mapping = self.governing_mapping().mapping_matrix(observation.context)?;
        make_q_primitive(&q_abstract, &mapping)
    }
}

/// Engine chosen at agent construction.
#[derive(Debug, Clone)]
pub enum Engine {
    Joint(JointEngine),
    Independent(IndependentEngine),
    Flat(FlatEngine),
    FullEnumeration(FullEnumerationEngine),
}

impl Engine {
    /// Build the engine `config.variant` names, sized for `dims`.
    pub fn new(config: &AgentConfig, dims: TaskDimensions) -> Result<Self> {
        config.validate()?;
        let params = config.hyperparameters;
        Ok(match config.variant {
            ClusteringVariant::Joint => Self::Joint(JointEngine::new(dims, params)),
            ClusteringVariant::Independent => {
                Self::Independent(IndependentEngine::new(dims, params))
            }
            ClusteringVariant::Flat => Self::Flat(FlatEngine::new(dims, params)),
            ClusteringVariant::FullEnumeration => Self::FullEnumeration(
                FullEnumerationEngine::new(dims, params, config.reward_clustering)?,
            ),
        })
    }

    pub fn variant(&self) -> ClusteringVariant {
        match self {
            Self::Joint(_) => ClusteringVariant::Joint,
            Self::Independent(_) => ClusteringVariant::Independent,
            Self::Flat(_) => ClusteringVariant::Flat,
            Self::FullEnumeration(_) => ClusteringVariant::FullEnumeration,
        }
    }
}

impl HypothesisEngine for Engine {
    fn name(&self) -> &str {
        match self {
            Self::Joint(engine) => engine.name(),
            Self::Independent(engine) => engine.name(),
            Self::Flat(engine) => engine.name(),
            Self::FullEnumeration(engine) => engine.name(),
        }
    }

    fn hyperparameters(&self) -> &Hyperparameters {
        match self {
            Self::Joint(engine) => engine.hyperparameters(),
            Self::Independent(engine) => engine.hyperparameters(),
            Self::Flat(engine) => engine.hyperparameters(),
            Self::FullEnumeration(engine) => engine.hyperparameters(),
        }
    }

    fn update(&mut self, experience: &Experience) -> Result<()> {
        match self {
            Self::Joint(engine) => engine.update(experience),
            Self::Independent(engine) => engine.update(experience),
            Self::Flat(engine) => engine.update(experience),
            Self::FullEnumeration(engine) => engine.update(experience),
        }
    }

    fn set_goal_prior(&mut self, goals: &[StateIndex]) -> Result<()> {
        match self {
            Self::Joint(engine) => engine.set_goal_prior(goals),
            Self::Independent(engine) => engine.set_goal_prior(goals),
            Self::Flat(engine) => engine.set_goal_prior(goals),
            Self::FullEnumeration(engine) => engine.set_goal_prior(goals),
        }
    }

    fn augment_assignments(&mut self, context: ContextId) -> Result<()> {
        match self {
            Self::Joint(engine) => engine.augment_assignments(context),
            Self::Independent(engine) => engine.augment_assignments(context),
            Self::Flat(engine) => engine.augment_assignments(context),
            Self::FullEnumeration(engine) => engine.augment_assignments(context),
        }
    }

    fn prune_hypothesis_space(&mut self, threshold: f64) -> Result<usize> {
        match self {
            Self::Joint(engine) => engine.prune_hypothesis_space(threshold),
            Self::Independent(engine) => engine.prune_hypothesis_space(threshold),
            Self::Flat(engine) => engine.prune_hypothesis_space(threshold),
            Self::FullEnumeration(engine) => engine.prune_hypothesis_space(threshold),
        }
    }

    fn abstract_action_pmf(
        &self,
        observation: &Observation,
        model: &TransitionModel,
    ) -> Result<Vec<f64>> {
        match self {
            Self::Joint(engine) => engine.abstract_action_pmf(observation, model),
            Self::Independent(engine) => engine.abstract_action_pmf(observation, model),
            Self::Flat(engine) => engine.abstract_action_pmf(observation, model),
            Self::FullEnumeration(engine) => engine.abstract_action_pmf(observation, model),
        }
    }

    fn governing_mapping(&self) -> &MappingHypothesis {
        match self {
            Self::Joint(engine) => engine.governing_mapping(),
            Self::Independent(engine) => engine.governing_mapping(),
            Self::Flat(engine) => engine.governing_mapping(),
            Self::FullEnumeration(engine) => engine.governing_mapping(),
        }
    }

    fn population_sizes(&self) -> PopulationSizes {
        match self {
            Self::Joint(engine) => engine.population_sizes(),
            Self::Independent(engine) => engine.population_sizes(),
            Self::Flat(engine) => engine.population_sizes(),
            Self::FullEnumeration(engine) => engine.population_sizes(),
        }
    }

    fn best_assignments(&self) -> BestAssignments {
        match self {
            Self::Joint(engine) => engine.best_assignments(),
            Self::Independent(engine) => engine.best_assignments(),
            Self::Flat(engine) => engine.best_assignments(),
            Self::FullEnumeration(engine) => engine.best_assignments(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{testing::dims, *};

    #[test]
    fn engine_matches_configured_variant() {
        for variant in ClusteringVariant::ALL {
            let engine = Engine::new(&AgentConfig::new(variant), dims(4, 3)).unwrap();
            assert_eq!(engine.variant(), variant);
            assert!(!engine.name().is_empty());
        }
    }

    #[test]
    fn invalid_configuration_is_rejected_at_construction() {
        let config = AgentConfig::default().with_pruning_threshold(0.0);
        assert!(Engine::new(&config, dims(4, 3)).is_err());
    }

    #[test]
    fn primitive_values_follow_the_learned_mapping() {
        use rand::{SeedableRng, rngs::StdRng};

        use super::testing::experience;
        use crate::types::{Location, Observation};

        let config = AgentConfig::new(ClusteringVariant::Flat);
        let mut engine = Engine::new(&config, dims(2, 1)).unwrap();
        engine.augment_assignments(0).unwrap();
        for _ in 0..500 {
            engine.update(&experience(0, 3, 0, 1, 1.0)).unwrap();
            engine.update(&experience(0, 1, 1, 0, 0.0)).unwrap();
        }
        // action 0 moves right onto the rewarded cell, action 1 stays put
        let model = TransitionModel::deterministic(&[vec![1, 0], vec![1, 1]]).unwrap();
        let observation = Observation {
            location: Location::new(0, 0),
            state: 0,
            context: 0,
        };

        let values = engine.primitive_values(&observation, &model).unwrap();
        assert_eq!(values.len(), 4);
        assert!((values.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(crate::utils::argmax(&values), Some(3));

        let mut rng = StdRng::seed_from_u64(17);
        let choice = engine.select_action(&observation, &model, &mut rng).unwrap();
        assert_eq!(choice.abstract_action, Some(0));
        assert_eq!(choice.primitive, 3);
    }

    #[test]
    fn full_enumeration_starts_with_every_partition() {
        let engine =
            Engine::new(&AgentConfig::new(ClusteringVariant::FullEnumeration), dims(4, 3)).unwrap();
        assert_eq!(
            engine.population_sizes(),
            PopulationSizes {
                reward: 5,
                mapping: 5
            }
        );
    }
}
