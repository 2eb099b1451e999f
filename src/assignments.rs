//! Canonical partitions of contexts into clusters.
//!
//! An assignment maps each context to a cluster index. Labels are canonical:
//! the first context ever assigned sits in cluster 0, and a context can only
//! join an existing cluster or open cluster `n_clusters`. This removes
//! relabelings of the same partition, so enumerating N contexts yields exactly
//! Bell(N) assignments.
//!
//! The incremental form ([`ClusterAssignment::children`],
//! [`augment_assignments`]) is what the engines use as new contexts appear;
//! [`enumerate_assignments`] seeds the exhaustive variant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    types::{ClusterId, ContextId},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    clusters: BTreeMap<ContextId, ClusterId>,
    cluster_sizes: Vec<usize>,
}

impl ClusterAssignment {
    /// Assignment with no contexts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every context in `0..n` in its own cluster.
    pub fn singletons(n: usize) -> Self {
        Self {
            clusters: (0..n).map(|c| (c, c)).collect(),
            cluster_sizes: vec![1; n],
        }
    }

    /// Build an assignment from `(context, cluster)` pairs, applied in order.
    ///
    /// # Errors
    /// Fails on the first pair that would break the canonical labeling.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ContextId, ClusterId)>,
    {
        let mut assignment = Self::new();
        for (context, cluster) in pairs {
            assignment.assign(context, cluster)?;
        }
        Ok(assignment)
    }

    /// Place a previously unseen context into `cluster`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAssignment`] if the context is already assigned
    /// or `cluster` is larger than the next fresh cluster index.
    pub fn assign(&mut self, context: ContextId, cluster: ClusterId) -> Result<()> {
        if let Some(&existing) = self.clusters.get(&context) {
            return Err(Error::InvalidAssignment {
                context,
                cluster,
                reason: format!("context is already assigned to cluster {existing}"),
            });
        }
        let n_clusters = self.n_clusters();
        if cluster > n_clusters {
            return Err(Error::InvalidAssignment {
                context,
                cluster,
                reason: format!("next fresh cluster index is {n_clusters}"),
            });
        }
        self.insert(context, cluster);
        Ok(())
    }

    // Callers guarantee the context is new and `cluster <= n_clusters`.
    fn insert(&mut self, context: ContextId, cluster: ClusterId) {
        if cluster == self.cluster_sizes.len() {
            self.cluster_sizes.push(0);
        }
        self.cluster_sizes[cluster] += 1;
        self.clusters.insert(context, cluster);
    }

    /// One child per existing cluster, then one with `context` in a new
    /// cluster. Children are returned in ascending cluster order.
    pub fn children(&self, context: ContextId) -> Result<Vec<ClusterAssignment>> {
        (0..=self.n_clusters())
            .map(|cluster| {
                let mut child = self.clone();
                child.assign(context, cluster)?;
                Ok(child)
            })
            .collect()
    }

    pub fn cluster_of(&self, context: ContextId) -> Option<ClusterId> {
        self.clusters.get(&context).copied()
    }

    pub fn contains(&self, context: ContextId) -> bool {
        self.clusters.contains_key(&context)
    }

    pub fn n_clusters(&self) -> usize {
        self.cluster_sizes.len()
    }

    pub fn n_contexts(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Number of contexts in each cluster, indexed by cluster.
    pub fn cluster_sizes(&self) -> &[usize] {
        &self.cluster_sizes
    }

    /// `(context, cluster)` pairs in ascending context order.
    pub fn iter(&self) -> impl Iterator<Item = (ContextId, ClusterId)> + '_ {
        self.clusters.iter().map(|(&c, &k)| (c, k))
    }

    /// Compact label such as `0-0-1` for contexts in ascending order.
    pub fn label(&self) -> String {
        self.clusters
            .values()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Extend every assignment with `new_context`, in input order.
///
/// An empty input behaves like a single empty assignment, so the first
/// context always lands in cluster 0.
pub fn augment_assignments(
    assignments: &[ClusterAssignment],
    new_context: ContextId,
) -> Result<Vec<ClusterAssignment>> {
    if assignments.is_empty() {
        return ClusterAssignment::new().children(new_context);
    }
    let mut augmented = Vec::new();
    for assignment in assignments {
        augmented.extend(assignment.children(new_context)?);
    }
    Ok(augmented)
}

/// All canonical partitions of contexts `0..n_contexts`.
pub fn enumerate_assignments(n_contexts: usize) -> Vec<ClusterAssignment> {
    let mut assignments = vec![ClusterAssignment::new()];
    for context in 0..n_contexts {
        let mut next = Vec::new();
        for assignment in &assignments {
            for cluster in 0..=assignment.n_clusters() {
                let mut child = assignment.clone();
                child.insert(context, cluster);
                next.push(child);
            }
        }
        assignments = next;
    }
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_rejects_reassignment() {
        let mut assignment = ClusterAssignment::new();
        assignment.assign(0, 0).unwrap();
        let err = assignment.assign(0, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidAssignment { context: 0, .. }));
        assert_eq!(assignment.n_contexts(), 1);
    }

    #[test]
    fn assign_rejects_skipped_cluster_index() {
        let mut assignment = ClusterAssignment::new();
        let err = assignment.assign(0, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidAssignment { cluster: 1, .. }));
        assert!(assignment.is_empty());
    }

    #[test]
    fn children_are_in_ascending_cluster_order() {
        let parent = ClusterAssignment::from_pairs([(0, 0), (1, 1)]).unwrap();
        let children = parent.children(2).unwrap();
        let placed: Vec<_> = children.iter().map(|c| c.cluster_of(2)).collect();
        assert_eq!(placed, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn small_enumerations() {
        assert_eq!(enumerate_assignments(0), vec![ClusterAssignment::new()]);
        let one = enumerate_assignments(1);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].cluster_of(0), Some(0));
        let labels: Vec<_> = enumerate_assignments(3).iter().map(|a| a.label()).collect();
        assert_eq!(labels, vec!["0-0-0", "0-0-1", "0-1-0", "0-1-1", "0-1-2"]);
    }

    #[test]
    fn augment_from_nothing_starts_at_cluster_zero() {
        let augmented = augment_assignments(&[], 7).unwrap();
        assert_eq!(augmented.len(), 1);
        assert_eq!(augmented[0].cluster_of(7), Some(0));
    }

    #[test]
    fn cluster_sizes_count_contexts_per_cluster() {
        let assignment = ClusterAssignment::from_pairs([(0, 0), (1, 1), (2, 0)]).unwrap();
        assert_eq!(assignment.iter().collect::<Vec<_>>(), vec![(0, 0), (1, 1), (2, 0)]);
        assert_eq!(assignment.cluster_sizes(), &[2, 1]);
    }
}
