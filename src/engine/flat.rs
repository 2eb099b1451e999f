//! Flat control: no clustering, every context learned from scratch.

use super::{BestAssignments, HypothesisEngine, PopulationSizes, TaskDimensions};
use crate::{
    Result,
    config::Hyperparameters,
    hypothesis::{Hypothesis, MappingHypothesis, TaskSet},
    planner::TransitionModel,
    types::{ContextId, Experience, Observation, StateIndex},
};

/// A single task set in which each new context opens its own cluster.
#[derive(Debug, Clone)]
pub struct FlatEngine {
    task_set: TaskSet,
    params: Hyperparameters,
}

impl FlatEngine {
    pub fn new(dims: TaskDimensions, params: Hyperparameters) -> Self {
        Self {
            task_set: TaskSet::empty(
                dims.n_states,
                dims.n_primitive_actions,
                dims.n_abstract_actions,
                &params,
            ),
            params,
        }
    }

    pub fn task_set(&self) -> &TaskSet {
        &self.task_set
    }

    /// Unnormalized log posterior of the only hypothesis.
    pub fn log_belief(&self) -> f64 {
        self.task_set.log_posterior()
    }
}

impl HypothesisEngine for FlatEngine {
    fn name(&self) -> &str {
        "Flat Control"
    }

    fn hyperparameters(&self) -> &Hyperparameters {
        &self.params
    }

    fn update(&mut self, experience: &Experience) -> Result<()> {
        self.task_set.observe(experience)
    }

    fn set_goal_prior(&mut self, goals: &[StateIndex]) -> Result<()> {
        self.task_set.reward_mut().set_goal_prior(goals)
    }

    fn augment_assignments(&mut self, context: ContextId) -> Result<()> {
        let fresh = self.task_set.assignment().n_clusters();
        self.task_set.add_new_context_assignment(context, fresh)
    }

    fn prune_hypothesis_space(&mut self, _threshold: f64) -> Result<usize> {
        Ok(0)
    }

    fn abstract_action_pmf(
        &self,
        observation: &Observation,
        model: &TransitionModel,
    ) -> Result<Vec<f64>> {
        self.task_set
            .reward()
            .abstract_action_pmf(observation.state, observation.context, model)
    }

    fn governing_mapping(&self) -> &MappingHypothesis {
        self.task_set.mapping()
    }

    fn population_sizes(&self) -> PopulationSizes {
        PopulationSizes {
            reward: 1,
            mapping: 1,
        }
    }

    fn best_assignments(&self) -> BestAssignments {
        let assignment = self.task_set.assignment().clone();
        BestAssignments {
            reward: assignment.clone(),
            mapping: assignment,
        }
    }
}
