//! Reward hypotheses: clusters of contexts sharing one reward function.

use super::{
    Hypothesis,
    prior::{beta_bernoulli_log_marginal, crp_log_prior},
};
use crate::{
    Error, Result,
    assignments::ClusterAssignment,
    config::Hyperparameters,
    engine::selection::softmax,
    planner::{TransitionModel, policy_iteration},
    types::{ClusterId, ContextId, Experience, StateIndex},
};

/// Pooled reward evidence for one cluster, indexed by successor state.
#[derive(Debug, Clone, PartialEq)]
struct RewardCounts {
    visits: Vec<f64>,
    received: Vec<f64>,
}

impl RewardCounts {
    fn empty(n_states: usize) -> Self {
        Self {
            visits: vec![0.0; n_states],
            received: vec![0.0; n_states],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RewardHypothesis {
    assignment: ClusterAssignment,
    n_states: usize,
    clusters: Vec<RewardCounts>,
    discount: f64,
    iteration_criterion: f64,
    inverse_temperature: f64,
    alpha: f64,
    /// Beta pseudo-reward per state; raised at candidate goals.
    prior_mass: Vec<f64>,
    base_mass: f64,
    goal_mass: f64,
    prior_visits: f64,
}

impl RewardHypothesis {
    /// Hypothesis with no contexts assigned yet.
    pub fn new(n_states: usize, params: &Hyperparameters) -> Self {
        Self {
            assignment: ClusterAssignment::new(),
            n_states,
            clusters: Vec::new(),
            discount: params.discount,
            iteration_criterion: params.iteration_criterion,
            inverse_temperature: params.inverse_temperature,
            alpha: params.alpha,
            prior_mass: vec![params.reward_prior_mass; n_states],
            base_mass: params.reward_prior_mass,
            goal_mass: params.goal_prior_mass,
            prior_visits: params.reward_prior_visits,
        }
    }

    /// Hypothesis over a pre-set assignment with no evidence.
    pub fn with_assignment(
        n_states: usize,
        params: &Hyperparameters,
        assignment: ClusterAssignment,
    ) -> Self {
        let mut hypothesis = Self::new(n_states, params);
        hypothesis.clusters = vec![RewardCounts::empty(n_states); assignment.n_clusters()];
        hypothesis.assignment = assignment;
        hypothesis
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Treat `goals` as likely goal states in every cluster, present and
    /// future. Every other state falls back to the base prior, so calling
    /// this again replaces the previous candidates.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] for a state outside the grid; nothing changes.
    pub fn set_goal_prior(&mut self, goals: &[StateIndex]) -> Result<()> {
        for &state in goals {
            self.check_state(state, "candidate goal state")?;
        }
        self.prior_mass = vec![self.base_mass; self.n_states];
        for &state in goals {
            self.prior_mass[state] = self.goal_mass;
        }
        Ok(())
    }

    fn cluster(&self, context: ContextId) -> Result<ClusterId> {
        self.assignment
            .cluster_of(context)
            .ok_or(Error::UnassignedContext { context })
    }

    fn check_state(&self, state: StateIndex, what: &str) -> Result<()> {
        if state >= self.n_states {
            return Err(Error::ShapeMismatch {
                what: what.to_string(),
                expected: self.n_states,
                got: state,
            });
        }
        Ok(())
    }

    fn check_update(&self, context: ContextId, state: StateIndex, reward: f64) -> Result<ClusterId> {
        if !(reward.is_finite() && (0.0..=1.0).contains(&reward)) {
            return Err(Error::InvalidReward { value: reward });
        }
        self.check_state(state, "successor state")?;
        self.cluster(context)
    }

    /// Record reward `reward` for arriving in `state` within `context`.
    ///
    /// # Errors
    /// Rewards outside `[0, 1]`, unknown states and unassigned contexts are
    /// rejected.
    pub fn update(&mut self, context: ContextId, state: StateIndex, reward: f64) -> Result<()> {
        let cluster = self.check_update(context, state, reward)?;
        let counts = &mut self.clusters[cluster];
        counts.visits[state] += 1.0;
        counts.received[state] += reward;
        Ok(())
    }

    /// Posterior mean reward per state for the cluster `context` belongs to.
    pub fn reward_function(&self, context: ContextId) -> Result<Vec<f64>> {
        let counts = &self.clusters[self.cluster(context)?];
        Ok(counts
            .visits
            .iter()
            .zip(&counts.received)
            .zip(&self.prior_mass)
            .map(|((&visits, &received), &mass)| {
                (mass + received) / (self.prior_visits + visits)
            })
            .collect())
    }

    /// Greedy-leaning pmf over abstract actions at `state`.
    ///
    /// Plans on the cluster's reward function, then softmaxes the one-step
    /// lookahead values at the hypothesis' inverse temperature. A high
    /// temperature keeps this nearly one-hot and only splits mass between
    /// actions that are (near) equally good.
    pub fn abstract_action_pmf(
        &self,
        state: StateIndex,
        context: ContextId,
        model: &TransitionModel,
    ) -> Result<Vec<f64>> {
        if model.n_states() != self.n_states {
            return Err(Error::ShapeMismatch {
                what: "transition model states".to_string(),
                expected: self.n_states,
                got: model.n_states(),
            });
        }
        self.check_state(state, "observation state")?;
        let rewards = self.reward_function(context)?;
        let policy = policy_iteration(model, &rewards, self.discount, self.iteration_criterion)?;
        let q_values = policy.q_values(model, &rewards, self.discount, state)?;
        softmax(&q_values, self.inverse_temperature)
    }

    /// Total observations recorded across all clusters.
    pub fn total_visits(&self) -> f64 {
        self.clusters
            .iter()
            .map(|counts| counts.visits.iter().sum::<f64>())
            .sum()
    }
}

impl Hypothesis for RewardHypothesis {
    fn assignment(&self) -> &ClusterAssignment {
        &self.assignment
    }

    fn log_prior(&self) -> f64 {
        crp_log_prior(self.assignment.cluster_sizes(), self.alpha)
    }

    fn log_likelihood(&self) -> f64 {
        self.clusters
            .iter()
            .flat_map(|counts| {
                counts
                    .visits
                    .iter()
                    .zip(&counts.received)
                    .zip(&self.prior_mass)
            })
            .map(|((&visits, &received), &mass)| {
                beta_bernoulli_log_marginal(
                    received,
                    visits - received,
                    mass,
                    self.prior_visits - mass,
                )
            })
            .sum()
    }

    fn add_new_context_assignment(&mut self, context: ContextId, cluster: ClusterId) -> Result<()> {
        self.assignment.assign(context, cluster)?;
        if self.clusters.len() < self.assignment.n_clusters() {
            self.clusters.push(RewardCounts::empty(self.n_states));
        }
        Ok(())
    }

    fn check_experience(&self, experience: &Experience) -> Result<()> {
        self.check_update(experience.context(), experience.end.state, experience.reward)
            .map(|_| ())
    }

    fn observe(&mut self, experience: &Experience) -> Result<()> {
        self.update(experience.context(), experience.end.state, experience.reward)
    }
}
