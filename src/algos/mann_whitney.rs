//! Two-sided Mann-Whitney U test for two independent samples.

use std::f64::consts::{PI, SQRT_2};

/// Result of the Mann-Whitney U test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannWhitneyResult {
    /// The U statistic of the first sample.
    pub statistic: f64,
    /// The two-sided p-value.
    pub p_value: f64,
}

/// How the p-value is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Exact distribution of U, only valid without ties.
    Exact,
    /// Normal approximation with tie and continuity correction.
    Asymptotic,
}

/// Average ranks of the pooled samples plus the sizes of all tie groups.
fn rank(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut pooled = x
        .iter()
        .chain(y.iter())
        .copied()
        .enumerate()
        .collect::<Vec<_>>();
    pooled.sort_by(|(_, a), (_, b)| a.total_cmp(b));

    let mut ranks = vec![0f64; pooled.len()];
    let mut ties = Vec::new();
    let mut start = 0;
    while start < pooled.len() {
        let mut end = start;
        while end < pooled.len() && pooled[end].1 == pooled[start].1 {
            end += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for (idx, _) in &pooled[start..end] {
            ranks[*idx] = avg_rank;
        }
        ties.push(end - start);
        start = end;
    }

    (ranks, ties)
}

/// Perform the two-sided test, choosing the exact method for small samples without ties.
///
/// Returns `None` if one of the samples is empty.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Option<MannWhitneyResult> {
    mann_whitney_u_with(x, y, None)
}

/// Perform the two-sided test, optionally forcing the method.
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn mann_whitney_u_with(x: &[f64], y: &[f64], method: Option<Method>) -> Option<MannWhitneyResult> {
    if x.is_empty() || y.is_empty() {
        return None;
    }
    let (n1, n2) = (x.len(), y.len());
    let (ranks, ties) = rank(x, y);

    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;
    let u = u1.max(u2);

    let has_ties = ties.iter().any(|&t| t > 1);
    let method = method.unwrap_or(if has_ties || (n1 > 8 && n2 > 8) {
        Method::Asymptotic
    } else {
        Method::Exact
    });

    let p_value = match method {
        Method::Exact => exact_sf(u.round() as usize, n1, n2),
        Method::Asymptotic => {
            let n = (n1 + n2) as f64;
            let tie_term = ties
                .iter()
                .map(|&t| {
                    let t = t as f64;
                    t * t * t - t
                })
                .sum::<f64>();
            let mu = (n1 * n2) as f64 / 2.0;
            let s = ((n1 * n2) as f64 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();
            if s > 0.0 {
                normal_sf((u - mu - 0.5) / s)
            } else {
                1.0
            }
        }
    };

    Some(MannWhitneyResult {
        statistic: u1,
        p_value: (2.0 * p_value).clamp(0.0, 1.0),
    })
}

/// `P(U >= u)` under the null hypothesis for sample sizes `n1` and `n2`.
///
/// The frequencies of U are the coefficients of the Gaussian binomial coefficient, built
/// up factor by factor.
#[allow(clippy::cast_precision_loss)]
fn exact_sf(u: usize, n1: usize, n2: usize) -> f64 {
    let (m, n) = (n1.min(n2), n1.max(n2));
    let max_u = m * n;
    if u > max_u {
        return 0.0;
    }

    let mut freqs = vec![0f64; max_u + 1];
    freqs[0] = 1.0;
    for i in 1..=m {
        let shift = n + i;
        for k in (shift..=max_u).rev() {
            freqs[k] -= freqs[k - shift];
        }
        for k in i..=max_u {
            freqs[k] += freqs[k - i];
        }
    }

    let total: f64 = freqs.iter().sum();
    freqs[u..].iter().sum::<f64>() / total
}

/// Survival function of the standard normal distribution.
fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// Complementary error function.
fn erfc(x: f64) -> f64 {
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }
    if x < 3.0 {
        // erf(x) = 2/sqrt(pi) * exp(-x^2) * sum_n (2x^2)^n x / (2n + 1)!!
        let mut term = x;
        let mut sum = x;
        let mut n = 0;
        while term > sum * f64::EPSILON {
            n += 1;
            term *= 2.0 * x * x / f64::from(2 * n + 1);
            sum += term;
        }
        1.0 - 2.0 / PI.sqrt() * (-x * x).exp() * sum
    } else {
        // Continued fraction, evaluated backwards.
        let mut f = x;
        for k in (1..=60).rev() {
            f = x + (f64::from(k) / 2.0) / f;
        }
        (-x * x).exp() / PI.sqrt() / f
    }
}

#[cfg(test)]
mod test {
    use super::{erfc, mann_whitney_u, mann_whitney_u_with, Method};

    #[rstest::rstest]
    #[case(0.0, 1.0)]
    #[case(0.5, 0.479_500_122_186_953_5)]
    #[case(2.5, 0.000_406_952_017_444_958_9)]
    #[case(4.0, 1.541_725_790_028_002e-8)]
    #[case(-1.0, 1.842_700_792_949_715)]
    fn erfc_values(#[case] x: f64, #[case] expected: f64) {
        let actual = erfc(x);
        assert!(
            ((actual - expected) / expected).abs() < 1e-10,
            "erfc({x}) = {actual}"
        );
    }

    #[test]
    fn exact_small_samples() {
        let males = [19.0, 22.0, 16.0, 29.0, 24.0];
        let females = [20.0, 11.0, 17.0, 12.0];

        let result = mann_whitney_u(&males, &females).expect("non-empty samples");

        assert_eq!(result.statistic, 17.0);
        assert!((result.p_value - 1.0 / 9.0).abs() < 1e-12, "{result:?}");
    }

    #[test]
    fn asymptotic_small_samples() {
        let males = [19.0, 22.0, 16.0, 29.0, 24.0];
        let females = [20.0, 11.0, 17.0, 12.0];

        let result = mann_whitney_u_with(&males, &females, Some(Method::Asymptotic))
            .expect("non-empty samples");

        assert_eq!(result.statistic, 17.0);
        assert!(
            (result.p_value - 0.111_346_886_533_140_48).abs() < 1e-9,
            "{result:?}"
        );
    }

    #[test]
    fn asymptotic_with_ties() {
        let x = [0.5, 0.5, 0.75, 1.0, 0.25, 0.6, 0.6, 0.9, 0.3, 0.8];
        let y = [0.2, 0.5, 0.1, 0.3, 0.3, 0.4, 0.0, 0.45, 0.55];

        let result = mann_whitney_u(&x, &y).expect("non-empty samples");

        assert_eq!(result.statistic, 76.0);
        assert!(
            (result.p_value - 0.012_412_203_647_878_12).abs() < 1e-9,
            "{result:?}"
        );
    }

    #[test]
    fn identical_samples_are_not_significant() {
        let result = mann_whitney_u(&[0.5, 0.5, 0.5], &[0.5, 0.5]).expect("non-empty samples");

        assert_eq!(result.statistic, 3.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn empty_sample() {
        assert_eq!(mann_whitney_u(&[], &[1.0]), None);
        assert_eq!(mann_whitney_u(&[1.0], &[]), None);
    }
}
