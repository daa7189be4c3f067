//! Two-sample statistics used by drift detection
//!
//! Every function takes the reference sample first and the current sample
//! second, with missing values already removed.

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use std::collections::{BTreeMap, BTreeSet};

/// Two-sample Kolmogorov-Smirnov test. Returns `(statistic, p_value)`.
///
/// The p-value uses the asymptotic Kolmogorov distribution with the
/// Stephens small-sample correction.
pub fn ks_2samp(reference: &[f64], current: &[f64]) -> (f64, f64) {
    let mut a = reference.to_vec();
    let mut b = current.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n1, n2) = (a.len(), b.len());
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < n1 && j < n2 {
        let x = a[i].min(b[j]);
        while i < n1 && a[i] <= x {
            i += 1;
        }
        while j < n2 && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n1 as f64 - j as f64 / n2 as f64).abs());
    }

    let en = ((n1 * n2) as f64 / (n1 + n2) as f64).sqrt();
    let p = kolmogorov_sf((en + 0.12 + 0.11 / en) * d);
    (d, p)
}

/// Survival function of the Kolmogorov distribution.
fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda < 0.2 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut sign = 1.0;
    for k in 1..=100 {
        let k = k as f64;
        let term = (-2.0 * k * k * lambda * lambda).exp();
        sum += sign * term;
        if term < 1e-12 {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Frequency of each value, keyed by its string form.
pub fn value_counts<'a, I>(values: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = BTreeMap::new();
    for v in values {
        *counts.entry(v.to_string()).or_insert(0) += 1;
    }
    counts
}

fn union_keys<'a>(
    reference: &'a BTreeMap<String, usize>,
    current: &'a BTreeMap<String, usize>,
) -> BTreeSet<&'a str> {
    reference
        .keys()
        .chain(current.keys())
        .map(String::as_str)
        .collect()
}

/// Chi-square goodness of fit of current frequencies against reference
/// frequencies rescaled to the current sample size. Returns the p-value.
pub fn chi_square(
    reference: &BTreeMap<String, usize>,
    current: &BTreeMap<String, usize>,
) -> Result<f64, String> {
    let keys = union_keys(reference, current);
    if keys.len() < 2 {
        return Ok(1.0);
    }
    let n_ref: usize = reference.values().sum();
    let n_cur: usize = current.values().sum();
    if n_ref == 0 || n_cur == 0 {
        return Err("empty sample".to_string());
    }
    let k_norm = n_cur as f64 / n_ref as f64;

    let mut statistic = 0.0;
    for key in &keys {
        let expected = *reference.get(*key).unwrap_or(&0) as f64 * k_norm;
        let observed = *current.get(*key).unwrap_or(&0) as f64;
        if expected == 0.0 {
            // A category never seen in the reference is maximal evidence of drift.
            return Ok(0.0);
        }
        statistic += (observed - expected).powi(2) / expected;
    }

    let dist = ChiSquared::new((keys.len() - 1) as f64).map_err(|e| e.to_string())?;
    Ok(dist.sf(statistic))
}

/// Two-proportion Z-test on the share of the first category (sorted order).
/// Returns the two-sided p-value.
pub fn z_test(
    reference: &BTreeMap<String, usize>,
    current: &BTreeMap<String, usize>,
) -> Result<f64, String> {
    let keys = union_keys(reference, current);
    let Some(first) = keys.iter().next() else {
        return Ok(1.0);
    };
    let n_ref: usize = reference.values().sum();
    let n_cur: usize = current.values().sum();
    if n_ref == 0 || n_cur == 0 {
        return Err("empty sample".to_string());
    }

    let x_ref = *reference.get(*first).unwrap_or(&0) as f64;
    let x_cur = *current.get(*first).unwrap_or(&0) as f64;
    let (n1, n2) = (n_ref as f64, n_cur as f64);
    let p1 = x_ref / n1;
    let p2 = x_cur / n2;
    let pooled = (x_ref + x_cur) / (n1 + n2);
    let se = (pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se == 0.0 {
        return Ok(if p1 == p2 { 1.0 } else { 0.0 });
    }

    let z = (p1 - p2) / se;
    let normal = Normal::new(0.0, 1.0).map_err(|e| e.to_string())?;
    Ok(2.0 * normal.sf(z.abs()))
}

/// First Wasserstein distance between the empirical distributions,
/// divided by the reference standard deviation (floored at 0.001).
pub fn wasserstein_normed(reference: &[f64], current: &[f64]) -> f64 {
    let mut a = reference.to_vec();
    let mut b = current.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let mut all: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    all.sort_by(f64::total_cmp);

    let cdf = |sorted: &[f64], x: f64| sorted.partition_point(|v| *v <= x) as f64 / sorted.len() as f64;

    let distance: f64 = all
        .windows(2)
        .map(|w| (cdf(&a, w[0]) - cdf(&b, w[0])).abs() * (w[1] - w[0]))
        .sum();

    let n = a.len() as f64;
    let mean = a.iter().sum::<f64>() / n;
    let std = (a.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    distance / std.max(0.001)
}

/// Jensen-Shannon distance (natural log) between the two frequency tables.
pub fn jensen_shannon(
    reference: &BTreeMap<String, usize>,
    current: &BTreeMap<String, usize>,
) -> f64 {
    let keys = union_keys(reference, current);
    let n_ref = reference.values().sum::<usize>().max(1) as f64;
    let n_cur = current.values().sum::<usize>().max(1) as f64;

    let kl = |p: f64, m: f64| if p > 0.0 { p * (p / m).ln() } else { 0.0 };
    let divergence: f64 = keys
        .iter()
        .map(|key| {
            let p = *reference.get(*key).unwrap_or(&0) as f64 / n_ref;
            let q = *current.get(*key).unwrap_or(&0) as f64 / n_cur;
            let m = (p + q) / 2.0;
            (kl(p, m) + kl(q, m)) / 2.0
        })
        .sum();
    divergence.max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, usize)]) -> BTreeMap<String, usize> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_ks_identical_samples() {
        let a: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let (d, p) = ks_2samp(&a, &a);
        assert_eq!(d, 0.0);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let a: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..100).map(|i| 1000.0 + i as f64).collect();
        let (d, p) = ks_2samp(&a, &b);
        assert_eq!(d, 1.0);
        assert!(p < 1e-10);
    }

    #[test]
    fn test_ks_statistic_half_overlap() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [3.0, 4.0, 5.0, 6.0];
        let (d, _) = ks_2samp(&a, &b);
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_chi_square_same_distribution() {
        let reference = counts(&[("a", 50), ("b", 30), ("c", 20)]);
        let current = counts(&[("a", 25), ("b", 15), ("c", 10)]);
        let p = chi_square(&reference, &current).unwrap();
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_chi_square_shifted_distribution() {
        let reference = counts(&[("a", 50), ("b", 30), ("c", 20)]);
        let current = counts(&[("a", 5), ("b", 15), ("c", 80)]);
        assert!(chi_square(&reference, &current).unwrap() < 0.001);
    }

    #[test]
    fn test_chi_square_new_category() {
        let reference = counts(&[("a", 10), ("b", 10)]);
        let current = counts(&[("a", 10), ("z", 1)]);
        assert_eq!(chi_square(&reference, &current).unwrap(), 0.0);
    }

    #[test]
    fn test_z_test_equal_and_shifted() {
        let reference = counts(&[("no", 50), ("yes", 50)]);
        let same = counts(&[("no", 25), ("yes", 25)]);
        assert!((z_test(&reference, &same).unwrap() - 1.0).abs() < 1e-9);

        let shifted = counts(&[("no", 90), ("yes", 10)]);
        assert!(z_test(&reference, &shifted).unwrap() < 0.001);
    }

    #[test]
    fn test_wasserstein_shift() {
        let a: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let b: Vec<f64> = a.iter().map(|v| v + 1.0).collect();
        // distance 1, population std of 0..9 = sqrt(8.25)
        let expected = 1.0 / 8.25f64.sqrt();
        assert!((wasserstein_normed(&a, &b) - expected).abs() < 1e-9);
        assert_eq!(wasserstein_normed(&a, &a), 0.0);
    }

    #[test]
    fn test_jensen_shannon_bounds() {
        let reference = counts(&[("a", 10), ("b", 10)]);
        assert!(jensen_shannon(&reference, &reference) < 1e-12);

        let disjoint = counts(&[("c", 5)]);
        let d = jensen_shannon(&reference, &disjoint);
        assert!((d - 2.0f64.ln().sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_value_counts() {
        let c = value_counts(["a", "b", "a"]);
        assert_eq!(c, counts(&[("a", 2), ("b", 1)]));
    }
}
