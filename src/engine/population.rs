//! Ordered hypotheses with their log beliefs.

use tracing::{debug, trace};

use crate::{
    Error, Result,
    hypothesis::Hypothesis,
    types::{ContextId, Experience},
    utils::{argmax, log_sum_exp},
};

/// Absolute slack on the pruning cutoff; scores equal up to float noise
/// count as tied.
const PRUNE_TOLERANCE: f64 = 1e-9;

/// A non-empty list of hypotheses, each paired with its current log belief.
///
/// The two vectors are private so they can never drift out of step; every
/// mutation goes through a method that rescores what it touched.
#[derive(Debug, Clone)]
pub struct Population<H: Hypothesis> {
    hypotheses: Vec<H>,
    log_beliefs: Vec<f64>,
}

impl<H: Hypothesis> Population<H> {
    /// Population holding one hypothesis.
    pub fn singleton(hypothesis: H) -> Self {
        let log_belief = hypothesis.log_posterior();
        Self {
            hypotheses: vec![hypothesis],
            log_beliefs: vec![log_belief],
        }
    }

    /// Population over `hypotheses`, scored immediately.
    ///
    /// # Errors
    /// [`Error::EmptyPopulation`] when `hypotheses` is empty.
    pub fn from_hypotheses(hypotheses: Vec<H>) -> Result<Self> {
        if hypotheses.is_empty() {
            return Err(Error::EmptyPopulation {
                operation: "building a population".to_string(),
            });
        }
        let log_beliefs = hypotheses.iter().map(Hypothesis::log_posterior).collect();
        Ok(Self {
            hypotheses,
            log_beliefs,
        })
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    pub fn hypotheses(&self) -> &[H] {
        &self.hypotheses
    }

    pub fn log_beliefs(&self) -> &[f64] {
        &self.log_beliefs
    }

    pub fn iter(&self) -> impl Iterator<Item = (&H, f64)> + '_ {
        self.hypotheses.iter().zip(self.log_beliefs.iter().copied())
    }

    /// Recompute every log belief from its hypothesis.
    pub fn refresh(&mut self) {
        for (hypothesis, belief) in self.hypotheses.iter().zip(self.log_beliefs.iter_mut()) {
            *belief = hypothesis.log_posterior();
        }
        trace!(hypotheses = self.len(), "refreshed beliefs");
    }

    /// Fail unless every hypothesis would accept `experience`.
    pub fn check(&self, experience: &Experience) -> Result<()> {
        self.hypotheses
            .iter()
            .try_for_each(|hypothesis| hypothesis.check_experience(experience))
    }

    /// Fold `experience` into every hypothesis, then rescore.
    ///
    /// The experience is checked against the whole population first, so a
    /// rejected one leaves both counts and beliefs as they were.
    pub fn observe(&mut self, experience: &Experience) -> Result<()> {
        self.check(experience)?;
        let applied = self
            .hypotheses
            .iter_mut()
            .try_for_each(|hypothesis| hypothesis.observe(experience));
        self.refresh();
        applied
    }

    /// Apply `f` to a copy of every hypothesis and keep the copies only if
    /// all of them succeed, then rescore.
    pub fn update_each<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut H) -> Result<()>,
    {
        let mut staged = self.hypotheses.clone();
        for hypothesis in &mut staged {
            f(hypothesis)?;
        }
        self.hypotheses = staged;
        self.refresh();
        Ok(())
    }

    /// Replace every hypothesis with one child per placement of `context`:
    /// each existing cluster in ascending order, then a fresh cluster.
    ///
    /// Children are deep copies; they never share counts with each other.
    pub fn augment(&mut self, context: ContextId) -> Result<()> {
        let before = self.len();
        let mut hypotheses = Vec::new();
        let mut log_beliefs = Vec::new();
        for parent in &self.hypotheses {
            for cluster in 0..=parent.assignment().n_clusters() {
                let mut child = parent.clone();
                child.add_new_context_assignment(context, cluster)?;
                log_beliefs.push(child.log_posterior());
                hypotheses.push(child);
            }
        }
        self.hypotheses = hypotheses;
        self.log_beliefs = log_beliefs;
        debug!(context, before, after = self.len(), "augmented population");
        Ok(())
    }

    /// Drop hypotheses whose belief trails the best by more than `ln(threshold)`.
    ///
    /// The first maximum is always retained, so the population never empties.
    /// Hypotheses tied with it survive, even at threshold 1.
    /// Pruning twice with the same threshold removes nothing the second time.
    /// Returns how many hypotheses were removed.
    ///
    /// # Errors
    /// [`Error::InvalidConfiguration`] for a threshold below 1 or non-finite.
    pub fn prune(&mut self, threshold: f64) -> Result<usize> {
        if !(threshold.is_finite() && threshold >= 1.0) {
            return Err(Error::config(format!(
                "pruning threshold must be finite and at least 1, got {threshold}"
            )));
        }
        if self.is_empty() {
            return Err(Error::EmptyPopulation {
                operation: "pruning".to_string(),
            });
        }
        let best = self.best_index();
        let max = self.log_beliefs[best];
        let cutoff = threshold.ln();

        let before = self.len();
        let mut kept_hypotheses = Vec::with_capacity(before);
        let mut kept_beliefs = Vec::with_capacity(before);
        for (idx, (hypothesis, belief)) in self
            .hypotheses
            .drain(..)
            .zip(self.log_beliefs.drain(..))
            .enumerate()
        {
            if idx == best || max - belief <= cutoff + PRUNE_TOLERANCE {
                kept_hypotheses.push(hypothesis);
                kept_beliefs.push(belief);
            }
        }
        self.hypotheses = kept_hypotheses;
        self.log_beliefs = kept_beliefs;

        let removed = before - self.len();
        debug!(before, after = self.len(), removed, threshold, "pruned population");
        Ok(removed)
    }

    /// Position of the first maximum belief.
    pub fn best_index(&self) -> usize {
        argmax(&self.log_beliefs).unwrap_or(0)
    }

    /// Highest-belief hypothesis (first on ties).
    pub fn best(&self) -> &H {
        &self.hypotheses[self.best_index()]
    }

    /// Beliefs normalized to probabilities.
    ///
    /// # Errors
    /// [`Error::DegenerateDistribution`] when the beliefs have no finite
    /// normalizer, e.g. every hypothesis scored `-inf`.
    pub fn probabilities(&self) -> Result<Vec<f64>> {
        let total = log_sum_exp(&self.log_beliefs);
        if !total.is_finite() {
            return Err(Error::DegenerateDistribution {
                context: format!("beliefs over {} hypotheses", self.len()),
                total,
            });
        }
        Ok(self
            .log_beliefs
            .iter()
            .map(|&belief| (belief - total).exp())
            .collect())
    }
}
