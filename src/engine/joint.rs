//! Joint clustering: contexts share reward and mapping together.

use super::{BestAssignments, HypothesisEngine, Population, PopulationSizes, TaskDimensions};
use crate::{
    Result,
    config::Hyperparameters,
    hypothesis::{Hypothesis, MappingHypothesis, TaskSet},
    planner::TransitionModel,
    types::{ContextId, Experience, Observation, StateIndex},
};

/// One population of [`TaskSet`]s, grown by augmentation and trimmed by
/// pruning. Belief is the CRP prior plus both likelihoods.
#[derive(Debug, Clone)]
pub struct JointEngine {
    population: Population<TaskSet>,
    params: Hyperparameters,
}

impl JointEngine {
    pub fn new(dims: TaskDimensions, params: Hyperparameters) -> Self {
        let root = TaskSet::empty(
            dims.n_states,
            dims.n_primitive_actions,
            dims.n_abstract_actions,
            &params,
        );
        Self {
            population: Population::singleton(root),
            params,
        }
    }

    pub fn population(&self) -> &Population<TaskSet> {
        &self.population
    }
}

impl HypothesisEngine for JointEngine {
    fn name(&self) -> &str {
        "Joint Clustering"
    }

    fn hyperparameters(&self) -> &Hyperparameters {
        &self.params
    }

    fn update(&mut self, experience: &Experience) -> Result<()> {
        self.population.observe(experience)
    }

    fn set_goal_prior(&mut self, goals: &[StateIndex]) -> Result<()> {
        self.population
            .update_each(|task_set| task_set.reward_mut().set_goal_prior(goals))
    }

    fn augment_assignments(&mut self, context: ContextId) -> Result<()> {
        self.population.augment(context)
    }

    fn prune_hypothesis_space(&mut self, threshold: f64) -> Result<usize> {
        self.population.prune(threshold)
    }

    fn abstract_action_pmf(
        &self,
        observation: &Observation,
        model: &TransitionModel,
    ) -> Result<Vec<f64>> {
        self.population
            .best()
            .reward()
            .abstract_action_pmf(observation.state, observation.context, model)
    }

    fn governing_mapping(&self) -> &MappingHypothesis {
        self.population.best().mapping()
    }

    fn population_sizes(&self) -> PopulationSizes {
        PopulationSizes {
            reward: self.population.len(),
            mapping: self.population.len(),
        }
    }

    fn best_assignments(&self) -> BestAssignments {
        let best = self.population.best().assignment().clone();
        BestAssignments {
            reward: best.clone(),
            mapping: best,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{dims, experience};

    fn engine() -> JointEngine {
        JointEngine::new(dims(3, 2), Hyperparameters::default())
    }

    #[test]
    fn shared_structure_favours_the_pooled_hypothesis() {
        let mut engine = engine();
        engine.augment_assignments(0).unwrap();
        for _ in 0..5 {
            engine.update(&experience(0, 2, 1, 2, 1.0)).unwrap();
            engine.update(&experience(0, 0, 0, 1, 0.0)).unwrap();
        }
        engine.augment_assignments(1).unwrap();
        assert_eq!(engine.population_sizes().reward, 2);
        for _ in 0..5 {
            engine.update(&experience(1, 2, 1, 2, 1.0)).unwrap();
            engine.update(&experience(1, 0, 0, 1, 0.0)).unwrap();
        }
        assert_eq!(engine.best_assignments().reward.label(), "0-0");
        assert_eq!(engine.prune_hypothesis_space(10.0).unwrap(), 1);
        assert_eq!(engine.population_sizes().mapping, 1);
    }

    #[test]
    fn rejected_update_keeps_beliefs_in_step_with_counts() {
        let mut engine = engine();
        engine.augment_assignments(0).unwrap();
        engine.augment_assignments(1).unwrap();
        let before = engine.population().hypotheses().to_vec();
        let beliefs = engine.population().log_beliefs().to_vec();

        // the mapping half is valid; only the reward is out of range
        assert!(engine.update(&experience(0, 1, 0, 1, 2.0)).is_err());
        assert_eq!(engine.population().hypotheses(), before.as_slice());
        assert_eq!(engine.population().log_beliefs(), beliefs.as_slice());
        for (task_set, belief) in engine.population().iter() {
            assert_eq!(task_set.log_posterior(), belief);
        }
    }

    #[test]
    fn goal_prior_reaches_hypotheses_added_later() {
        let mut engine = engine();
        engine.set_goal_prior(&[2]).unwrap();
        engine.augment_assignments(0).unwrap();
        engine.augment_assignments(1).unwrap();
        for task_set in engine.population().hypotheses() {
            let rewards = task_set.reward().reward_function(1).unwrap();
            assert!(rewards[2] > rewards[0]);
        }
        assert!(engine.set_goal_prior(&[3]).is_err());
    }

    #[test]
    fn update_before_augmentation_is_an_error() {
        let mut engine = engine();
        assert!(engine.update(&experience(0, 0, 0, 1, 0.0)).is_err());
    }
}
