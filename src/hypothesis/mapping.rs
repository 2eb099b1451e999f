//! Mapping hypotheses: clusters of contexts sharing one key-press → direction mapping.

use super::{
    Hypothesis,
    prior::{crp_log_prior, dirichlet_categorical_log_marginal},
};
use crate::{
    Error, Result,
    assignments::ClusterAssignment,
    config::Hyperparameters,
    types::{ClusterId, ContextId, Experience},
};

#[derive(Debug, Clone, PartialEq)]
pub struct MappingHypothesis {
    assignment: ClusterAssignment,
    n_primitive: usize,
    n_abstract: usize,
    /// Per cluster, `counts[a * n_abstract + aa]`.
    clusters: Vec<Vec<f64>>,
    alpha: f64,
    mapping_prior: f64,
}

impl MappingHypothesis {
    pub fn new(n_primitive: usize, n_abstract: usize, params: &Hyperparameters) -> Self {
        Self {
            assignment: ClusterAssignment::new(),
            n_primitive,
            n_abstract,
            clusters: Vec::new(),
            alpha: params.alpha,
            mapping_prior: params.mapping_prior,
        }
    }

    pub fn with_assignment(
        n_primitive: usize,
        n_abstract: usize,
        params: &Hyperparameters,
        assignment: ClusterAssignment,
    ) -> Self {
        let mut hypothesis = Self::new(n_primitive, n_abstract, params);
        hypothesis.clusters = vec![vec![0.0; n_primitive * n_abstract]; assignment.n_clusters()];
        hypothesis.assignment = assignment;
        hypothesis
    }

    pub fn n_primitive(&self) -> usize {
        self.n_primitive
    }

    pub fn n_abstract(&self) -> usize {
        self.n_abstract
    }

    fn counts(&self, context: ContextId) -> Result<&[f64]> {
        let cluster = self
            .assignment
            .cluster_of(context)
            .ok_or(Error::UnassignedContext { context })?;
        Ok(&self.clusters[cluster])
    }

    fn check_actions(&self, primitive: usize, abstract_action: usize) -> Result<()> {
        if primitive >= self.n_primitive {
            return Err(Error::InvalidAction {
                action: primitive,
                limit: self.n_primitive,
            });
        }
        if abstract_action >= self.n_abstract {
            return Err(Error::InvalidAction {
                action: abstract_action,
                limit: self.n_abstract,
            });
        }
        Ok(())
    }

    fn check_update(
        &self,
        context: ContextId,
        primitive: usize,
        abstract_action: usize,
    ) -> Result<ClusterId> {
        self.check_actions(primitive, abstract_action)?;
        self.assignment
            .cluster_of(context)
            .ok_or(Error::UnassignedContext { context })
    }

    /// Record that pressing `primitive` produced `abstract_action` in `context`.
    pub fn update(
        &mut self,
        context: ContextId,
        primitive: usize,
        abstract_action: usize,
    ) -> Result<()> {
        let cluster = self.check_update(context, primitive, abstract_action)?;
        self.clusters[cluster][primitive * self.n_abstract + abstract_action] += 1.0;
        Ok(())
    }

    /// Posterior predictive `P(primitive | abstract_action)` for the context's cluster.
    pub fn mapping_probability(
        &self,
        context: ContextId,
        primitive: usize,
        abstract_action: usize,
    ) -> Result<f64> {
        self.check_actions(primitive, abstract_action)?;
        let counts = self.counts(context)?;
        let column_total: f64 = (0..self.n_primitive)
            .map(|a| counts[a * self.n_abstract + abstract_action])
            .sum();
        let numerator = counts[primitive * self.n_abstract + abstract_action] + self.mapping_prior;
        Ok(numerator / (column_total + self.mapping_prior * self.n_primitive as f64))
    }

    /// Full `P(a | aa)` matrix for a context, rows indexed by primitive action.
    pub fn mapping_matrix(&self, context: ContextId) -> Result<Vec<Vec<f64>>> {
        (0..self.n_primitive)
            .map(|a| {
                (0..self.n_abstract)
                    .map(|aa| self.mapping_probability(context, a, aa))
                    .collect()
            })
            .collect()
    }
}

impl Hypothesis for MappingHypothesis {
    fn assignment(&self) -> &ClusterAssignment {
        &self.assignment
    }

    fn log_prior(&self) -> f64 {
        crp_log_prior(self.assignment.cluster_sizes(), self.alpha)
    }

    fn log_likelihood(&self) -> f64 {
        let mut total = 0.0;
        let mut column = vec![0.0; self.n_primitive];
        for counts in &self.clusters {
            for aa in 0..self.n_abstract {
                for (a, slot) in column.iter_mut().enumerate() {
                    *slot = counts[a * self.n_abstract + aa];
                }
                total += dirichlet_categorical_log_marginal(&column, self.mapping_prior);
            }
        }
        total
    }

    fn add_new_context_assignment(&mut self, context: ContextId, cluster: ClusterId) -> Result<()> {
        self.assignment.assign(context, cluster)?;
        if self.clusters.len() < self.assignment.n_clusters() {
            self.clusters
                .push(vec![0.0; self.n_primitive * self.n_abstract]);
        }
        Ok(())
    }

    fn check_experience(&self, experience: &Experience) -> Result<()> {
        self.check_update(
            experience.context(),
            experience.primitive_action,
            experience.abstract_action,
        )
        .map(|_| ())
    }

    fn observe(&mut self, experience: &Experience) -> Result<()> {
        self.update(
            experience.context(),
            experience.primitive_action,
            experience.abstract_action,
        )
    }
}
