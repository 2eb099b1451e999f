//! Closed-form log probabilities used to score hypotheses.

use statrs::function::gamma::ln_gamma;

/// Log probability of a partition under a Chinese Restaurant Process.
///
/// `ln P = K ln α + Σ_k ln Γ(n_k) + ln Γ(α) − ln Γ(α + N)` for `K` clusters of
/// sizes `n_k` holding `N` contexts in total. An empty partition has
/// probability one.
pub fn crp_log_prior(cluster_sizes: &[usize], alpha: f64) -> f64 {
    let n: usize = cluster_sizes.iter().sum();
    if n == 0 {
        return 0.0;
    }
    let k = cluster_sizes.len() as f64;
    let occupancy: f64 = cluster_sizes.iter().map(|&size| ln_gamma(size as f64)).sum();
    k * alpha.ln() + occupancy + ln_gamma(alpha) - ln_gamma(alpha + n as f64)
}

/// `ln B(x, y)`.
fn ln_beta(x: f64, y: f64) -> f64 {
    ln_gamma(x) + ln_gamma(y) - ln_gamma(x + y)
}

/// Log marginal likelihood of `successes` and `failures` under a Beta(a, b) prior.
pub fn beta_bernoulli_log_marginal(successes: f64, failures: f64, a: f64, b: f64) -> f64 {
    if successes <= 0.0 && failures <= 0.0 {
        return 0.0;
    }
    ln_beta(a + successes, b + failures) - ln_beta(a, b)
}

/// Log marginal likelihood of category counts under a symmetric Dirichlet.
pub fn dirichlet_categorical_log_marginal(counts: &[f64], concentration: f64) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let k = counts.len() as f64;
    let per_category: f64 = counts
        .iter()
        .map(|&n| ln_gamma(concentration + n) - ln_gamma(concentration))
        .sum();
    ln_gamma(k * concentration) - ln_gamma(k * concentration + total) + per_category
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn crp_single_context_is_certain() {
        assert!(crp_log_prior(&[1], 1.0).abs() < TOL);
        assert!(crp_log_prior(&[1], 3.5).abs() < TOL);
        assert_eq!(crp_log_prior(&[], 1.0), 0.0);
    }

    #[test]
    fn crp_two_contexts_split_by_alpha() {
        // P(together) = 1 / (1 + α), P(apart) = α / (1 + α)
        let alpha = 0.5_f64;
        let together = crp_log_prior(&[2], alpha).exp();
        let apart = crp_log_prior(&[1, 1], alpha).exp();
        assert!((together - 1.0 / (1.0 + alpha)).abs() < TOL);
        assert!((apart - alpha / (1.0 + alpha)).abs() < TOL);
    }

    #[test]
    fn crp_sums_to_one_over_partitions_of_three() {
        let partitions: [&[usize]; 5] = [&[3], &[2, 1], &[2, 1], &[2, 1], &[1, 1, 1]];
        let total: f64 = partitions
            .iter()
            .map(|sizes| crp_log_prior(sizes, 1.3).exp())
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn beta_bernoulli_matches_sequential_predictive() {
        // Beta(1, 1): P(1, 0) = 1/2 * 1/3
        let lm = beta_bernoulli_log_marginal(1.0, 1.0, 1.0, 1.0);
        assert!((lm - (1.0_f64 / 6.0).ln()).abs() < TOL);
        assert_eq!(beta_bernoulli_log_marginal(0.0, 0.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn dirichlet_matches_sequential_predictive() {
        // symmetric α = 1 over 2 categories, counts (2, 0): 1/2 * 2/3
        let lm = dirichlet_categorical_log_marginal(&[2.0, 0.0], 1.0);
        assert!((lm - (1.0_f64 / 3.0).ln()).abs() < TOL);
    }
}
