//! Independent clustering: rewards and mappings cluster separately.

use super::{BestAssignments, HypothesisEngine, Population, PopulationSizes, TaskDimensions};
use crate::{
    Result,
    config::Hyperparameters,
    hypothesis::{Hypothesis, MappingHypothesis, RewardHypothesis},
    planner::TransitionModel,
    types::{ContextId, Experience, Observation, StateIndex},
};

/// Two populations, each with its own posterior. Two contexts may share a
/// reward cluster while keeping separate mappings, and vice versa.
#[derive(Debug, Clone)]
pub struct IndependentEngine {
    rewards: Population<RewardHypothesis>,
    mappings: Population<MappingHypothesis>,
    params: Hyperparameters,
}

impl IndependentEngine {
    pub fn new(dims: TaskDimensions, params: Hyperparameters) -> Self {
        Self {
            rewards: Population::singleton(RewardHypothesis::new(dims.n_states, &params)),
            mappings: Population::singleton(MappingHypothesis::new(
                dims.n_primitive_actions,
                dims.n_abstract_actions,
                &params,
            )),
            params,
        }
    }

    pub fn rewards(&self) -> &Population<RewardHypothesis> {
        &self.rewards
    }

    pub fn mappings(&self) -> &Population<MappingHypothesis> {
        &self.mappings
    }
}

impl HypothesisEngine for IndependentEngine {
    fn name(&self) -> &str {
        "Independent Clustering"
    }

    fn hyperparameters(&self) -> &Hyperparameters {
        &self.params
    }

    fn update(&mut self, experience: &Experience) -> Result<()> {
        self.rewards.check(experience)?;
        self.mappings.observe(experience)?;
        self.rewards.observe(experience)
    }

    fn set_goal_prior(&mut self, goals: &[StateIndex]) -> Result<()> {
        self.rewards.update_each(|reward| reward.set_goal_prior(goals))
    }

    fn augment_assignments(&mut self, context: ContextId) -> Result<()> {
        self.rewards.augment(context)?;
        self.mappings.augment(context)
    }

    fn prune_hypothesis_space(&mut self, threshold: f64) -> Result<usize> {
        Ok(self.rewards.prune(threshold)? + self.mappings.prune(threshold)?)
    }

    fn abstract_action_pmf(
        &self,
        observation: &Observation,
        model: &TransitionModel,
    ) -> Result<Vec<f64>> {
        self.rewards
            .best()
            .abstract_action_pmf(observation.state, observation.context, model)
    }

    fn governing_mapping(&self) -> &MappingHypothesis {
        self.mappings.best()
    }

    fn population_sizes(&self) -> PopulationSizes {
        PopulationSizes {
            reward: self.rewards.len(),
            mapping: self.mappings.len(),
        }
    }

    fn best_assignments(&self) -> BestAssignments {
        BestAssignments {
            reward: self.rewards.best().assignment().clone(),
            mapping: self.mappings.best().assignment().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{dims, experience};

    #[test]
    fn rewards_and_mappings_can_disagree() {
        let mut engine = IndependentEngine::new(dims(3, 2), Hyperparameters::default());
        engine.augment_assignments(0).unwrap();
        engine.augment_assignments(1).unwrap();
        assert_eq!(
            engine.population_sizes(),
            PopulationSizes {
                reward: 2,
                mapping: 2
            }
        );
        // same goal, different keys for the same direction
        for _ in 0..6 {
            engine.update(&experience(0, 0, 1, 2, 1.0)).unwrap();
            engine.update(&experience(1, 3, 1, 2, 1.0)).unwrap();
        }
        let best = engine.best_assignments();
        assert_eq!(best.reward.label(), "0-0");
        assert_eq!(best.mapping.label(), "0-1");
    }

    #[test]
    fn a_rejected_half_blocks_the_other() {
        let mut engine = IndependentEngine::new(dims(3, 2), Hyperparameters::default());
        engine.augment_assignments(0).unwrap();
        engine.augment_assignments(1).unwrap();
        engine.update(&experience(0, 0, 1, 2, 1.0)).unwrap();
        let rewards = engine.rewards().clone();
        let mappings = engine.mappings().clone();

        // valid mapping, bad reward
        assert!(engine.update(&experience(1, 3, 1, 2, 2.0)).is_err());
        // valid reward, unknown key
        assert!(engine.update(&experience(1, 9, 1, 2, 1.0)).is_err());

        assert_eq!(engine.mappings().hypotheses(), mappings.hypotheses());
        assert_eq!(engine.mappings().log_beliefs(), mappings.log_beliefs());
        assert_eq!(engine.rewards().hypotheses(), rewards.hypotheses());
        assert_eq!(engine.rewards().log_beliefs(), rewards.log_beliefs());
    }

    #[test]
    fn pruning_counts_both_populations() {
        let mut engine = IndependentEngine::new(dims(3, 2), Hyperparameters::default());
        engine.augment_assignments(0).unwrap();
        engine.augment_assignments(1).unwrap();
        for _ in 0..6 {
            engine.update(&experience(0, 0, 1, 2, 1.0)).unwrap();
            engine.update(&experience(1, 3, 1, 2, 1.0)).unwrap();
        }
        assert_eq!(engine.prune_hypothesis_space(10.0).unwrap(), 2);
        assert_eq!(engine.prune_hypothesis_space(10.0).unwrap(), 0);
    }
}
