//! Policy iteration over a known transition model.
//!
//! Rewards are attached to successor states: taking action `a` in `s` and
//! landing in `s'` earns `R(s')`. The planner is a pure function of the
//! model, the reward vector, the discount and the convergence threshold.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, types::StateIndex};

/// Upper bound on improvement rounds; policy iteration on the grids used here
/// converges in a handful.
pub const MAX_POLICY_ITERATIONS: usize = 1_000;

/// Upper bound on evaluation sweeps per improvement round.
pub const MAX_EVALUATION_SWEEPS: usize = 10_000;

const IMPROVEMENT_TOLERANCE: f64 = 1e-12;

/// Dense `T[s][a][s']` transition probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionModel {
    n_states: usize,
    n_actions: usize,
    probabilities: Vec<f64>,
}

impl TransitionModel {
    /// Build from a flat `n_states * n_actions * n_states` vector.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] for a wrong length and
    /// [`Error::InvalidConfiguration`] when a row is not a distribution.
    pub fn new(n_states: usize, n_actions: usize, probabilities: Vec<f64>) -> Result<Self> {
        let expected = n_states * n_actions * n_states;
        if probabilities.len() != expected {
            return Err(Error::ShapeMismatch {
                what: "transition probabilities".to_string(),
                expected,
                got: probabilities.len(),
            });
        }
        let model = Self {
            n_states,
            n_actions,
            probabilities,
        };
        for s in 0..n_states {
            for a in 0..n_actions {
                let row = model.successors(s, a);
                let total: f64 = row.iter().sum();
                if row.iter().any(|p| !p.is_finite() || *p < 0.0) || (total - 1.0).abs() > 1e-6 {
                    return Err(Error::config(format!(
                        "transition row for state {s}, action {a} sums to {total}"
                    )));
                }
            }
        }
        Ok(model)
    }

    /// Deterministic model from a successor table `next[s][a]`.
    pub fn deterministic(next: &[Vec<StateIndex>]) -> Result<Self> {
        let n_states = next.len();
        let n_actions = next.first().map_or(0, Vec::len);
        let mut probabilities = vec![0.0; n_states * n_actions * n_states];
        for (s, row) in next.iter().enumerate() {
            if row.len() != n_actions {
                return Err(Error::ShapeMismatch {
                    what: format!("successor row for state {s}"),
                    expected: n_actions,
                    got: row.len(),
                });
            }
            for (a, &sp) in row.iter().enumerate() {
                if sp >= n_states {
                    return Err(Error::ShapeMismatch {
                        what: format!("successor of state {s} under action {a}"),
                        expected: n_states,
                        got: sp,
                    });
                }
                probabilities[(s * n_actions + a) * n_states + sp] = 1.0;
            }
        }
        Self::new(n_states, n_actions, probabilities)
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Distribution over successor states for `(state, action)`.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] for an unknown state and
    /// [`Error::InvalidAction`] for an unknown action.
    pub fn row(&self, state: StateIndex, action: usize) -> Result<&[f64]> {
        self.check_state(state)?;
        if action >= self.n_actions {
            return Err(Error::InvalidAction {
                action,
                limit: self.n_actions,
            });
        }
        Ok(self.successors(state, action))
    }

    fn check_state(&self, state: StateIndex) -> Result<()> {
        if state >= self.n_states {
            return Err(Error::ShapeMismatch {
                what: "state".to_string(),
                expected: self.n_states,
                got: state,
            });
        }
        Ok(())
    }

    /// Unchecked row; callers stay within `n_states` and `n_actions`.
    fn successors(&self, state: StateIndex, action: usize) -> &[f64] {
        let start = (state * self.n_actions + action) * self.n_states;
        &self.probabilities[start..start + self.n_states]
    }
}

/// Output of [`policy_iteration`].
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub actions: Vec<usize>,
    pub values: Vec<f64>,
}

impl Policy {
    /// One-step lookahead values `Q(state, ·)` under this policy's value function.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] when `state`, `rewards` or the policy itself
    /// do not fit `model`.
    pub fn q_values(
        &self,
        model: &TransitionModel,
        rewards: &[f64],
        discount: f64,
        state: StateIndex,
    ) -> Result<Vec<f64>> {
        model.check_state(state)?;
        let lengths = [("reward vector", rewards.len()), ("policy values", self.values.len())];
        for (what, got) in lengths {
            if got != model.n_states() {
                return Err(Error::ShapeMismatch {
                    what: what.to_string(),
                    expected: model.n_states(),
                    got,
                });
            }
        }
        Ok((0..model.n_actions())
            .map(|a| action_value(model, rewards, &self.values, discount, state, a))
            .collect())
    }
}

fn action_value(
    model: &TransitionModel,
    rewards: &[f64],
    values: &[f64],
    discount: f64,
    state: StateIndex,
    action: usize,
) -> f64 {
    model
        .successors(state, action)
        .iter()
        .enumerate()
        .filter(|&(_, &p)| p > 0.0)
        .map(|(sp, &p)| p * (rewards[sp] + discount * values[sp]))
        .sum()
}

/// Solve for a value-maximizing action per state.
///
/// Evaluation sweeps stop once the largest value change drops below
/// `threshold`. Improvement keeps the incumbent action unless another is
/// strictly better, so the loop terminates on ties.
pub fn policy_iteration(
    model: &TransitionModel,
    rewards: &[f64],
    discount: f64,
    threshold: f64,
) -> Result<Policy> {
    if rewards.len() != model.n_states() {
        return Err(Error::ShapeMismatch {
            what: "reward vector".to_string(),
            expected: model.n_states(),
            got: rewards.len(),
        });
    }
    if !(0.0..1.0).contains(&discount) {
        return Err(Error::config(format!(
            "discount must lie in [0, 1), got {discount}"
        )));
    }
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(Error::config(format!(
            "convergence threshold must be positive, got {threshold}"
        )));
    }

    let n_states = model.n_states();
    let mut actions = vec![0; n_states];
    let mut values = vec![0.0; n_states];

    for _ in 0..MAX_POLICY_ITERATIONS {
        for _ in 0..MAX_EVALUATION_SWEEPS {
            let mut delta: f64 = 0.0;
            for s in 0..n_states {
                let updated = action_value(model, rewards, &values, discount, s, actions[s]);
                delta = delta.max((updated - values[s]).abs());
                values[s] = updated;
            }
            if delta < threshold {
                break;
            }
        }

        let mut stable = true;
        for s in 0..n_states {
            let incumbent = action_value(model, rewards, &values, discount, s, actions[s]);
            let mut best = (actions[s], incumbent);
            for a in 0..model.n_actions() {
                let q = action_value(model, rewards, &values, discount, s, a);
                if q > best.1 + IMPROVEMENT_TOLERANCE {
                    best = (a, q);
                }
            }
            if best.0 != actions[s] {
                actions[s] = best.0;
                stable = false;
            }
        }
        if stable {
            break;
        }
    }

    Ok(Policy { actions, values })
}
