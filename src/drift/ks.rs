//! Two-sample Kolmogorov-Smirnov test

use crate::drift::{DriftDetector, DriftResult};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Kolmogorov-Smirnov test for distribution comparison
///
/// A column drifts when the p-value is strictly below `alpha`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KolmogorovSmirnovTest {
    /// Significance level (alpha)
    alpha: f64,
}

impl KolmogorovSmirnovTest {
    /// Create new KS test
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// Maximum distance between the two empirical CDFs
    pub fn statistic(reference: &[f64], test: &[f64]) -> f64 {
        let mut a = reference.to_vec();
        let mut b = test.to_vec();
        a.sort_by(|x, y| x.partial_cmp(y).unwrap_or(Ordering::Equal));
        b.sort_by(|x, y| x.partial_cmp(y).unwrap_or(Ordering::Equal));

        let (n1, n2) = (a.len() as f64, b.len() as f64);
        let (mut i, mut j) = (0usize, 0usize);
        let mut d = 0.0f64;

        while i < a.len() && j < b.len() {
            let x = a[i].min(b[j]);
            // Step past every sample equal to x on both sides before comparing
            while i < a.len() && a[i] <= x {
                i += 1;
            }
            while j < b.len() && b[j] <= x {
                j += 1;
            }
            d = d.max((i as f64 / n1 - j as f64 / n2).abs());
        }

        d
    }

    /// Two-sided p-value for `statistic` with sample sizes `n1` and `n2`
    ///
    /// Up to [`EXACT_MAX_N`] rows per side the p-value is the exact share of
    /// lattice paths whose ECDF gap reaches `statistic`, matching SciPy's
    /// `ks_2samp` in its default mode. Larger samples, or an exact count that
    /// leaves floating-point range, use the asymptotic Kolmogorov
    /// distribution with Stephens' correction.
    pub fn p_value(statistic: f64, n1: usize, n2: usize) -> f64 {
        if statistic <= 0.0 || n1 == 0 || n2 == 0 {
            return 1.0;
        }
        if n1.max(n2) <= EXACT_MAX_N {
            if let Some(p) = exact_p_value(statistic, n1, n2) {
                return p;
            }
        }
        Self::asymptotic_p_value(statistic, n1, n2)
    }

    /// Asymptotic p-value with Stephens' small-sample correction
    pub fn asymptotic_p_value(statistic: f64, n1: usize, n2: usize) -> f64 {
        if statistic <= 0.0 {
            return 1.0;
        }
        let en = ((n1 * n2) as f64 / (n1 + n2) as f64).sqrt();
        let lambda = (en + 0.12 + 0.11 / en) * statistic;
        kolmogorov_q(lambda)
    }
}

impl Default for KolmogorovSmirnovTest {
    fn default() -> Self {
        Self::new(0.05)
    }
}

/// Largest per-side sample size that gets an exact p-value
pub const EXACT_MAX_N: usize = 10_000;

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Binary exponent `e` with `v = f * 2^e` and `0.5 <= |f| < 1`
fn exponent(v: f64) -> i32 {
    if v == 0.0 || !v.is_finite() {
        0
    } else {
        v.abs().log2().floor() as i32 + 1
    }
}

/// `v * 2^e` without overflowing the intermediate power
fn ldexp(mut v: f64, mut e: i32) -> f64 {
    while e > 500 {
        v *= 2f64.powi(500);
        e -= 500;
    }
    while e < -500 {
        v *= 2f64.powi(-500);
        e += 500;
    }
    v * 2f64.powi(e)
}

/// Exact two-sided p-value, `None` when the path count overflows
fn exact_p_value(statistic: f64, n1: usize, n2: usize) -> Option<f64> {
    let g = gcd(n1, n2);
    let lcm = (n1 / g) as f64 * n2 as f64;
    // Statistic snapped onto the lattice of attainable gaps, in units of 1/lcm
    let h = (statistic * lcm).round_ties_even() as usize;
    if h == 0 {
        return Some(1.0);
    }

    let p = if n1 == n2 {
        prob_outside_square(n1, h)
    } else {
        1.0 - prob_inside_band(n1, n2, g, h)?
    };
    (p.is_finite() && (-1e-12..=1.0 + 1e-12).contains(&p)).then(|| p.clamp(0.0, 1.0))
}

/// P(D >= h/n) for two samples of size `n`
fn prob_outside_square(n: usize, h: usize) -> f64 {
    let mut p = 0.0;
    for k in (0..=n / h).rev() {
        let mut term = 1.0;
        for j in 0..h {
            let above = n as f64 - (k * h + j) as f64;
            term = above * term / (n + k * h + j + 1) as f64;
        }
        p = term * (1.0 - p);
    }
    2.0 * p
}

/// Share of monotone lattice paths from (0, 0) to (m, n) that keep
/// `|i * n - j * m| < h * g` at every point
///
/// Column counts grow like binomial coefficients, so the running column
/// is rescaled and the dropped binary exponent tracked separately.
fn prob_inside_band(m: usize, n: usize, g: usize, h: usize) -> Option<f64> {
    let (m, n) = if m < n { (n, m) } else { (m, n) };
    let (mg, ng) = ((m / g) as f64, (n / g) as f64);
    let h = h as f64;

    let mut min_j = 0usize;
    let mut max_j = ((h / mg).ceil() as usize).min(n + 1);
    let mut cur_len = max_j - min_j;
    let mut column = vec![0.0f64; (2 * max_j + 2).min(n + 1)];
    column[min_j..max_j].fill(1.0);
    let mut scale = 0i32;

    for i in 1..=m {
        let (last_min_j, last_len) = (min_j, cur_len);
        let lower = ((ng * i as f64 - h) / mg).floor() as i64 + 1;
        min_j = (lower.max(0) as usize).min(n);
        max_j = (((ng * i as f64 + h) / mg).ceil() as usize).min(n + 1);
        if max_j <= min_j {
            return Some(0.0);
        }

        let width = max_j - min_j;
        let offset = min_j - last_min_j;
        if column.len() < width + offset {
            column.resize(width + offset, 0.0);
        }
        let mut acc = 0.0;
        for k in 0..width {
            acc += column[k + offset];
            column[k] = acc;
        }
        cur_len = width;
        if last_len > cur_len {
            let end = (width + last_len - cur_len).min(column.len());
            column[width..end].fill(0.0);
        }

        let top = column[width - 1];
        if !top.is_finite() {
            return None;
        }
        let e = exponent(top);
        if e > 900 {
            let shift = e - 800;
            column.iter_mut().for_each(|v| *v = ldexp(*v, -shift));
            scale += shift;
        }
    }

    // Divide by the path total C(m + n, n)
    let mut value = column[n - min_j];
    for i in 1..=n {
        value = value * i as f64 / (m + i) as f64;
        if exponent(value) < -128 {
            value = ldexp(value, 128);
            scale -= 128;
        }
    }
    let value = ldexp(value, scale);
    value.is_finite().then_some(value)
}

/// Survival function of the Kolmogorov distribution
fn kolmogorov_q(lambda: f64) -> f64 {
    const EPS1: f64 = 1e-6;
    const EPS2: f64 = 1e-16;

    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut prev_term = 0.0f64;

    for k in 1..=100 {
        let term = fac * (a2 * f64::from(k * k)).exp();
        sum += term;
        if term.abs() <= EPS1 * prev_term || term.abs() <= EPS2 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        prev_term = term.abs();
    }

    // Series does not converge for tiny lambda, where the tail mass is 1
    1.0
}

impl DriftDetector for KolmogorovSmirnovTest {
    fn detect(&self, reference: &[f64], test: &[f64]) -> Result<DriftResult> {
        if reference.is_empty() || test.is_empty() {
            return Err(PipelineError::EmptySplit(
                "Empty arrays provided".to_string()
            ));
        }

        let statistic = Self::statistic(reference, test);
        let p_value = Self::p_value(statistic, reference.len(), test.len());

        Ok(DriftResult {
            drift_detected: p_value < self.alpha,
            statistic,
            p_value,
            threshold: self.alpha,
        })
    }

    fn threshold(&self) -> f64 {
        self.alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_samples() {
        let data: Vec<f64> = (0..50).map(|i| (i % 7) as f64).collect();
        let result = KolmogorovSmirnovTest::new(0.05).detect(&data, &data).unwrap();

        assert_eq!(result.statistic, 0.0);
        assert!((result.p_value - 1.0).abs() < 1e-12);
        assert!(!result.drift_detected);
    }

    #[test]
    fn test_disjoint_ranges_drift() {
        let reference: Vec<f64> = (0..=10).map(f64::from).collect();
        let test: Vec<f64> = (1000..=1010).map(f64::from).collect();

        let result = KolmogorovSmirnovTest::new(0.05).detect(&reference, &test).unwrap();

        assert_eq!(result.statistic, 1.0);
        assert!(result.p_value < 1e-3, "p = {}", result.p_value);
        assert!(result.drift_detected);
    }

    #[test]
    fn test_shifted_by_half_step() {
        let reference: Vec<f64> = (1..=10).map(f64::from).collect();
        let test: Vec<f64> = reference.iter().map(|v| v + 0.5).collect();

        let result = KolmogorovSmirnovTest::new(0.05).detect(&reference, &test).unwrap();

        assert!((result.statistic - 0.1).abs() < 1e-12);
        assert!(!result.drift_detected);
    }

    #[test]
    fn test_statistic_handles_ties() {
        let a = [1.0, 1.0, 2.0, 2.0];
        let b = [1.0, 2.0, 2.0, 2.0];
        // ECDFs at 1.0: 0.5 vs 0.25
        assert!((KolmogorovSmirnovTest::statistic(&a, &b) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_p_value_monotone_in_statistic() {
        let p_small = KolmogorovSmirnovTest::p_value(0.1, 100, 100);
        let p_large = KolmogorovSmirnovTest::p_value(0.3, 100, 100);
        assert!(p_small > p_large);
        assert!((0.0..=1.0).contains(&p_small));
    }

    #[test]
    fn test_exact_p_values_for_small_samples() {
        // Only the two orderings with one whole sample first reach D = 1
        let p = KolmogorovSmirnovTest::p_value(1.0, 3, 3);
        assert!((p - 0.1).abs() < 1e-12, "p = {}", p);
        let p = KolmogorovSmirnovTest::p_value(1.0, 2, 3);
        assert!((p - 0.2).abs() < 1e-12, "p = {}", p);

        let reference = [1.0, 2.0, 3.0, 4.0, 5.0];
        let test = [6.0, 7.0, 8.0, 9.0, 10.0];
        let result = KolmogorovSmirnovTest::new(0.05).detect(&reference, &test).unwrap();
        assert!((result.p_value - 2.0 / 252.0).abs() < 1e-12);
    }

    #[test]
    fn test_exact_and_asymptotic_agree_for_large_samples() {
        let exact = KolmogorovSmirnovTest::p_value(0.1, 400, 600);
        let asymptotic = KolmogorovSmirnovTest::asymptotic_p_value(0.1, 400, 600);
        assert!((exact - asymptotic).abs() < 0.02, "{} vs {}", exact, asymptotic);

        let beyond = EXACT_MAX_N + 1;
        assert_eq!(
            KolmogorovSmirnovTest::p_value(0.05, beyond, beyond),
            KolmogorovSmirnovTest::asymptotic_p_value(0.05, beyond, beyond)
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(KolmogorovSmirnovTest::default().detect(&[], &[1.0]).is_err());
    }
}
