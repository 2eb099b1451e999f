//! Numeric helpers shared by the hypothesis and engine modules

/// Normalize weights to probabilities that sum to 1.0.
///
/// # Returns
///
/// - `Some(Vec<f64>)` containing normalized probabilities if the total is positive and finite
/// - `None` otherwise
///
/// # Examples
///
/// ```
/// use tasksets::utils::normalize_weights;
///
/// let normalized = normalize_weights(vec![1.0, 2.0, 1.0]).unwrap();
/// assert_eq!(normalized, vec![0.25, 0.5, 0.25]);
///
/// assert_eq!(normalize_weights(vec![0.0, 0.0]), None);
/// ```
pub fn normalize_weights<I>(weights: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = f64>,
{
    let weights: Vec<f64> = weights.into_iter().collect();
    if weights.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    Some(weights.into_iter().map(|w| w / total).collect())
}

/// Numerically stable `ln Σ exp(v)`.
///
/// Returns `-inf` for an empty slice or when every entry is `-inf`.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Index of the first maximum. NaN entries never win.
///
/// ```
/// use tasksets::utils::argmax;
///
/// assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some(1));
/// assert_eq!(argmax(&[]), None);
/// ```
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Kullback–Leibler divergence `D(p || q)` in bits.
///
/// Terms where either probability is zero are skipped.
pub fn kl_divergence(q: &[f64], p: &[f64]) -> f64 {
    q.iter()
        .zip(p)
        .filter(|&(&q_i, &p_i)| q_i > 0.0 && p_i > 0.0)
        .map(|(&q_i, &p_i)| p_i * (p_i / q_i).log2())
        .sum()
}

/// Cardinal direction index for a one-cell displacement.
///
/// `(1, 0)` → 0, `(-1, 0)` → 1, `(0, 1)` → 2, `(0, -1)` → 3; anything else
/// (diagonal, no movement, jumps) is `None`.
pub fn displacement_to_abstract_action(dx: i32, dy: i32) -> Option<usize> {
    match (dx, dy) {
        (1, 0) => Some(0),
        (-1, 0) => Some(1),
        (0, 1) => Some(2),
        (0, -1) => Some(3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sum_exp_matches_direct_computation() {
        let values = [0.0_f64, 1.0, 2.0];
        let direct = values.iter().map(|v| v.exp()).sum::<f64>().ln();
        assert!((log_sum_exp(&values) - direct).abs() < 1e-12);
    }

    #[test]
    fn log_sum_exp_handles_large_magnitudes() {
        let values = [-1000.0, -1000.0];
        let expected = -1000.0 + 2.0_f64.ln();
        assert!((log_sum_exp(&values) - expected).abs() < 1e-9);
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn argmax_prefers_first_on_ties_and_skips_nan() {
        assert_eq!(argmax(&[2.0, 2.0, 1.0]), Some(0));
        assert_eq!(argmax(&[f64::NAN, 0.5]), Some(1));
        assert_eq!(argmax(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), Some(0));
    }

    #[test]
    fn kl_divergence_is_zero_for_identical_distributions() {
        let p = [0.25, 0.25, 0.5];
        assert!(kl_divergence(&p, &p).abs() < 1e-12);
        assert!(kl_divergence(&[0.5, 0.5], &[0.9, 0.1]) > 0.0);
    }

    #[test]
    fn displacement_labels_cardinal_moves_only() {
        assert_eq!(displacement_to_abstract_action(1, 0), Some(0));
        assert_eq!(displacement_to_abstract_action(-1, 0), Some(1));
        assert_eq!(displacement_to_abstract_action(0, 1), Some(2));
        assert_eq!(displacement_to_abstract_action(0, -1), Some(3));
        assert_eq!(displacement_to_abstract_action(1, 1), None);
        assert_eq!(displacement_to_abstract_action(0, 0), None);
    }
}
