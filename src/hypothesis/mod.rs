//! Hypotheses about how contexts cluster, and the statistics that score them
//!
//! Each hypothesis owns one [`ClusterAssignment`] plus count statistics pooled
//! per cluster. Scoring is Bayesian:
//!
//! - **prior**: Chinese Restaurant Process over the assignment
//! - **likelihood**: conjugate marginal likelihood of the pooled counts
//!   (Beta–Bernoulli for rewards, Dirichlet–categorical for mappings)
//! - **posterior**: their sum in log space
//!
//! Counts are additive, so a hypothesis' belief does not depend on the order
//! experience arrived in. Cloning is a deep copy: siblings produced during
//! augmentation never share counts.
//!
//! ## Types
//!
//! | Type | Clusters | Extra query |
//! |------|----------|-------------|
//! | [`RewardHypothesis`] | reward functions | abstract-action pmf via policy iteration |
//! | [`MappingHypothesis`] | primitive → abstract mappings | `P(a \| aa, cluster)` |
//! | [`TaskSet`] | both, under one assignment | both |

pub mod mapping;
pub mod prior;
pub mod reward;
pub mod task_set;

pub use mapping::MappingHypothesis;
pub use reward::RewardHypothesis;
pub use task_set::TaskSet;

use crate::{
    Result,
    assignments::ClusterAssignment,
    types::{ClusterId, ContextId, Experience},
};

/// Belief queries and growth shared by every hypothesis family.
pub trait Hypothesis: Clone {
    /// Context → cluster mapping this hypothesis scores.
    fn assignment(&self) -> &ClusterAssignment;

    /// Log prior probability of the assignment.
    fn log_prior(&self) -> f64;

    /// Log marginal likelihood of all experience seen so far.
    fn log_likelihood(&self) -> f64;

    /// Unnormalized log posterior.
    fn log_posterior(&self) -> f64 {
        self.log_prior() + self.log_likelihood()
    }

    /// Place a new context into `cluster`, growing per-cluster statistics when
    /// `cluster` is fresh. Accumulated counts are untouched.
    fn add_new_context_assignment(&mut self, context: ContextId, cluster: ClusterId) -> Result<()>;

    /// Whether [`observe`](Self::observe) would accept `experience`.
    /// Never mutates.
    fn check_experience(&self, experience: &Experience) -> Result<()>;

    /// Fold `experience` into the pooled counts. A rejected experience
    /// leaves the hypothesis unchanged.
    fn observe(&mut self, experience: &Experience) -> Result<()>;
}
