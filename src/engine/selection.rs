//! Sampling helpers shared by every engine variant.

use rand::{Rng, rngs::StdRng};

use crate::{Error, Result, hypothesis::MappingHypothesis, types::ContextId};

fn degenerate(what: &str, total: f64) -> Error {
    Error::DegenerateDistribution {
        context: what.to_string(),
        total,
    }
}

/// Boltzmann distribution `exp(β·v) / Σ exp(β·v)`, computed with the maximum
/// subtracted first.
///
/// ```
/// use tasksets::engine::selection::softmax;
///
/// let pmf = softmax(&[1.0, 1.0, 0.0], 100.0).unwrap();
/// assert!((pmf[0] - 0.5).abs() < 1e-9);
/// assert!(pmf[2] < 1e-9);
/// ```
pub fn softmax(values: &[f64], inverse_temperature: f64) -> Result<Vec<f64>> {
    if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
        return Err(degenerate("softmax input", values.iter().sum()));
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = values
        .iter()
        .map(|&v| (inverse_temperature * (v - max)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(degenerate("softmax weights", total));
    }
    Ok(weights.into_iter().map(|w| w / total).collect())
}

/// Draw an index with probability proportional to `pmf`.
///
/// # Errors
/// [`Error::DegenerateDistribution`] when the weights are empty, negative,
/// or do not sum to a positive finite value.
pub fn sample_index(pmf: &[f64], rng: &mut StdRng) -> Result<usize> {
    let total: f64 = pmf.iter().sum();
    if pmf.is_empty() || pmf.iter().any(|&p| p < 0.0) || !(total.is_finite() && total > 0.0) {
        return Err(degenerate("sampling weights", total));
    }
    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (idx, &p) in pmf.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        cumulative += p;
        last_positive = idx;
        if target < cumulative {
            return Ok(idx);
        }
    }
    // rounding can leave `target` just past the final bucket
    Ok(last_positive)
}

/// Whether this selection stage should fall back to a uniform draw.
pub fn explore(epsilon: f64, rng: &mut StdRng) -> bool {
    epsilon > 0.0 && rng.random::<f64>() < epsilon
}

/// Uniform index in `0..n`.
pub fn uniform_index(n: usize, rng: &mut StdRng) -> Result<usize> {
    if n == 0 {
        return Err(degenerate("uniform choice over no options", 0.0));
    }
    Ok(rng.random_range(0..n))
}

/// `P(a | abstract_action)` over primitive actions for `context`.
pub fn mapping_pmf(
    mapping: &MappingHypothesis,
    context: ContextId,
    abstract_action: usize,
) -> Result<Vec<f64>> {
    (0..mapping.n_primitive())
        .map(|a| mapping.mapping_probability(context, a, abstract_action))
        .collect()
}

/// Project abstract-action values onto primitive actions:
/// `q[a] = Σ_aa P(a | aa) · q_abstract[aa]`.
///
/// `mapping[a][aa]` is indexed primitive-first, as returned by
/// [`MappingHypothesis::mapping_matrix`].
pub fn make_q_primitive(q_abstract: &[f64], mapping: &[Vec<f64>]) -> Result<Vec<f64>> {
    mapping
        .iter()
        .map(|row| {
            if row.len() != q_abstract.len() {
                return Err(Error::ShapeMismatch {
                    what: "mapping row".to_string(),
                    expected: q_abstract.len(),
                    got: row.len(),
                });
            }
            Ok(row.iter().zip(q_abstract).map(|(p, q)| p * q).sum())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::{assignments::ClusterAssignment, config::Hyperparameters};

    #[test]
    fn softmax_is_shift_invariant_and_normalized() {
        let a = softmax(&[1.0, 2.0, 3.0], 1.0).unwrap();
        let b = softmax(&[101.0, 102.0, 103.0], 1.0).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-12);
        }
        assert!((a.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_temperature_is_uniform() {
        let pmf = softmax(&[5.0, -3.0], 0.0).unwrap();
        assert_eq!(pmf, vec![0.5, 0.5]);
    }

    #[test]
    fn degenerate_inputs_are_errors() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(softmax(&[], 1.0), Err(Error::DegenerateDistribution { .. })));
        assert!(matches!(
            softmax(&[f64::NAN, 1.0], 1.0),
            Err(Error::DegenerateDistribution { .. })
        ));
        assert!(matches!(
            sample_index(&[0.0, 0.0], &mut rng),
            Err(Error::DegenerateDistribution { .. })
        ));
        assert!(uniform_index(0, &mut rng).is_err());
    }

    #[test]
    fn sampling_never_picks_zero_mass() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let idx = sample_index(&[0.0, 0.3, 0.0, 0.7], &mut rng).unwrap();
            assert!(idx == 1 || idx == 3);
        }
    }

    #[test]
    fn exploration_is_off_at_zero_epsilon() {
        let mut rng = StdRng::seed_from_u64(2);
        assert!((0..100).all(|_| !explore(0.0, &mut rng)));
        assert!((0..100).all(|_| explore(1.0, &mut rng)));
    }

    #[test]
    fn mapping_pmf_is_a_column_of_the_matrix() {
        let assignment = ClusterAssignment::from_pairs([(0, 0)]).unwrap();
        let mut mapping =
            MappingHypothesis::with_assignment(3, 2, &Hyperparameters::default(), assignment);
        mapping.update(0, 2, 1).unwrap();
        let pmf = mapping_pmf(&mapping, 0, 1).unwrap();
        let matrix = mapping.mapping_matrix(0).unwrap();
        for a in 0..3 {
            assert_eq!(pmf[a], matrix[a][1]);
        }
        assert!((pmf.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn primitive_values_weight_abstract_values_by_mapping() {
        let mapping = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]];
        let q = make_q_primitive(&[2.0, 4.0], &mapping).unwrap();
        assert_eq!(q, vec![2.0, 4.0, 3.0]);
        assert!(make_q_primitive(&[1.0], &mapping).is_err());
    }
}
