//! Exhaustive clustering over a known number of contexts.

use tracing::info;

use super::{BestAssignments, HypothesisEngine, Population, PopulationSizes, TaskDimensions};
use crate::{
    Error, Result,
    assignments::{ClusterAssignment, enumerate_assignments},
    config::Hyperparameters,
    hypothesis::{Hypothesis, MappingHypothesis, RewardHypothesis},
    planner::TransitionModel,
    types::{ContextId, Experience, Observation, StateIndex},
    utils::normalize_weights,
};

/// Every partition of `0..n_contexts` is a hypothesis from the start.
///
/// Directions are chosen from the belief-weighted mixture of every reward
/// hypothesis' pmf; keys come from the single most probable mapping
/// hypothesis. With reward clustering disabled the reward side holds one
/// hypothesis that keeps each context separate.
#[derive(Debug, Clone)]
pub struct FullEnumerationEngine {
    rewards: Population<RewardHypothesis>,
    mappings: Population<MappingHypothesis>,
    n_contexts: usize,
    params: Hyperparameters,
}

impl FullEnumerationEngine {
    pub fn new(
        dims: TaskDimensions,
        params: Hyperparameters,
        reward_clustering: bool,
    ) -> Result<Self> {
        if dims.n_contexts == 0 {
            return Err(Error::config(
                "full enumeration needs at least one context",
            ));
        }
        let partitions = enumerate_assignments(dims.n_contexts);
        let reward_partitions = if reward_clustering {
            partitions.clone()
        } else {
            vec![ClusterAssignment::singletons(dims.n_contexts)]
        };

        let rewards = Population::from_hypotheses(
            reward_partitions
                .into_iter()
                .map(|assignment| RewardHypothesis::with_assignment(dims.n_states, &params, assignment))
                .collect(),
        )?;
        let mappings = Population::from_hypotheses(
            partitions
                .into_iter()
                .map(|assignment| {
                    MappingHypothesis::with_assignment(
                        dims.n_primitive_actions,
                        dims.n_abstract_actions,
                        &params,
                        assignment,
                    )
                })
                .collect(),
        )?;
        info!(
            contexts = dims.n_contexts,
            reward_hypotheses = rewards.len(),
            mapping_hypotheses = mappings.len(),
            "enumerated hypothesis space"
        );

        Ok(Self {
            rewards,
            mappings,
            n_contexts: dims.n_contexts,
            params,
        })
    }

    fn check_context(&self, context: ContextId) -> Result<()> {
        if context >= self.n_contexts {
            return Err(Error::ContextOutOfRange {
                context,
                limit: self.n_contexts,
            });
        }
        Ok(())
    }

    /// Normalized belief over reward hypotheses.
    pub fn reward_beliefs(&self) -> Result<Vec<f64>> {
        self.rewards.probabilities()
    }

    /// Normalized belief over mapping hypotheses.
    pub fn mapping_beliefs(&self) -> Result<Vec<f64>> {
        self.mappings.probabilities()
    }
}

impl HypothesisEngine for FullEnumerationEngine {
    fn name(&self) -> &str {
        "Full Enumeration"
    }

    fn hyperparameters(&self) -> &Hyperparameters {
        &self.params
    }

    fn update(&mut self, experience: &Experience) -> Result<()> {
        self.check_context(experience.context())?;
        self.rewards.check(experience)?;
        self.mappings.observe(experience)?;
        self.rewards.observe(experience)
    }

    fn set_goal_prior(&mut self, goals: &[StateIndex]) -> Result<()> {
        self.rewards.update_each(|reward| reward.set_goal_prior(goals))
    }

    fn augment_assignments(&mut self, context: ContextId) -> Result<()> {
        self.check_context(context)
    }

    fn prune_hypothesis_space(&mut self, _threshold: f64) -> Result<usize> {
        Ok(0)
    }

    fn abstract_action_pmf(
        &self,
        observation: &Observation,
        model: &TransitionModel,
    ) -> Result<Vec<f64>> {
        self.check_context(observation.context)?;
        let mut mixture = vec![0.0; model.n_actions()];
        for ((hypothesis, _), weight) in self.rewards.iter().zip(self.reward_beliefs()?) {
            if weight == 0.0 {
                continue;
            }
            let pmf = hypothesis.abstract_action_pmf(observation.state, observation.context, model)?;
            for (total, p) in mixture.iter_mut().zip(pmf) {
                *total += weight * p;
            }
        }
        normalize_weights(mixture).ok_or_else(|| Error::DegenerateDistribution {
            context: format!("belief-weighted pmf in context {}", observation.context),
            total: 0.0,
        })
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
