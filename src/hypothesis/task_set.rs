//! A reward hypothesis and a mapping hypothesis bound to one assignment.

use super::{Hypothesis, MappingHypothesis, RewardHypothesis};
use crate::{
    Result,
    assignments::ClusterAssignment,
    config::Hyperparameters,
    types::{ClusterId, ContextId, Experience},
};

/// Paired hypothesis used by the joint and flat engines.
///
/// Both halves always carry identical assignments; the CRP prior is therefore
/// counted once, and the likelihood is the sum of both halves.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSet {
    reward: RewardHypothesis,
    mapping: MappingHypothesis,
}

impl TaskSet {
    /// Empty task set sized for a task's state and action spaces.
    pub fn empty(
        n_states: usize,
        n_primitive: usize,
        n_abstract: usize,
        params: &Hyperparameters,
    ) -> Self {
        Self {
            reward: RewardHypothesis::new(n_states, params),
            mapping: MappingHypothesis::new(n_primitive, n_abstract, params),
        }
    }

    /// Task set over a pre-set assignment.
    pub fn with_assignment(
        n_states: usize,
        n_primitive: usize,
        n_abstract: usize,
        params: &Hyperparameters,
        assignment: ClusterAssignment,
    ) -> Self {
        Self {
            reward: RewardHypothesis::with_assignment(n_states, params, assignment.clone()),
            mapping: MappingHypothesis::with_assignment(n_primitive, n_abstract, params, assignment),
        }
    }

    pub fn reward(&self) -> &RewardHypothesis {
        &self.reward
    }

    pub fn mapping(&self) -> &MappingHypothesis {
        &self.mapping
    }

    pub fn reward_mut(&mut self) -> &mut RewardHypothesis {
        &mut self.reward
    }

    pub fn mapping_mut(&mut self) -> &mut MappingHypothesis {
        &mut self.mapping
    }
}

impl Hypothesis for TaskSet {
    fn assignment(&self) -> &ClusterAssignment {
        self.reward.assignment()
    }

    fn log_prior(&self) -> f64 {
        self.reward.log_prior()
    }

    fn log_likelihood(&self) -> f64 {
        self.reward.log_likelihood() + self.mapping.log_likelihood()
    }

    fn add_new_context_assignment(&mut self, context: ContextId, cluster: ClusterId) -> Result<()> {
        self.reward.add_new_context_assignment(context, cluster)?;
        self.mapping.add_new_context_assignment(context, cluster)
    }

    fn check_experience(&self, experience: &Experience) -> Result<()> {
        self.mapping.check_experience(experience)?;
        self.reward.check_experience(experience)
    }

    /// Both halves take the experience or neither does.
    fn observe(&mut self, experience: &Experience) -> Result<()> {
        self.check_experience(experience)?;
        self.mapping.observe(experience)?;
        self.reward.observe(experience)
    }
}
