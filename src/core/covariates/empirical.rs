//! Empirical quality estimation: every key's observed error rate is scored
//! against Phred bins with a Gaussian prior anchored on the reported (or
//! estimated) quality and a binomial likelihood, matching the estimator of
//! GATK's BaseRecalibrator.

use std::collections::BTreeMap;

use statrs::function::gamma::ln_gamma;

use crate::core::phred::{error_prob_to_qual, qual_to_error_prob, qual_to_error_prob_log10, MAX_PHRED};

use super::chain::{Covariate, CovariateChain, CovariateKey};
use super::table::CovariateTable;

/// One error and one non-error pseudo-observation.
const SMOOTHING: u64 = 1;
/// Prior variance of (empirical − reported), in Phred² units.
const PRIOR_VARIANCE: f64 = 0.5;

#[derive(Clone, Copy, Debug)]
pub struct EmpiricalValue {
    pub observations: u64,
    pub mismatches: f64,
    pub expected_errors: f64,
    pub estimated_quality: f64,
    pub empirical_quality: f64,
}

/// Covariate table enriched with derived qualities; key order is inherited
/// from the source table.
#[derive(Clone, Default, Debug)]
pub struct EmpiricalTable {
    keys: Vec<CovariateKey>,
    values: Vec<EmpiricalValue>,
}

impl EmpiricalTable {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CovariateKey, &EmpiricalValue)> {
        self.keys.iter().copied().zip(self.values.iter())
    }

    pub fn get(&self, key: CovariateKey) -> Option<&EmpiricalValue> {
        self.keys.binary_search(&key).ok().map(|i| &self.values[i])
    }
}

/// Derives empirical values for every key of a chain table. The prior for
/// each key is its own reported QualityScore covariate.
pub fn build(table: &CovariateTable, chain: &CovariateChain) -> EmpiricalTable {
    let mut result = EmpiricalTable::default();
    for (key, value) in table.iter() {
        let reported = chain.decode(key, Covariate::QualityScore) as u8;
        result.keys.push(key);
        result.values.push(EmpiricalValue {
            observations: value.observations,
            mismatches: value.mismatches,
            expected_errors: value.observations as f64 * qual_to_error_prob(reported),
            estimated_quality: estimated_quality(value.observations, value.mismatches),
            empirical_quality: bayesian_estimate(value.observations, value.mismatches, reported as f64),
        });
    }
    result
}

/// Aggregates a quality-chain table over the QualityScore axis into the
/// read-group table. The estimated quality comes from the expected error
/// mass of the aggregated reported qualities and anchors the prior.
pub fn build_read_group(table: &CovariateTable, chain: &CovariateChain) -> EmpiricalTable {
    let mut groups: BTreeMap<CovariateKey, (u64, f64, f64)> = BTreeMap::new();
    for (key, value) in table.iter() {
        let reported = chain.decode(key, Covariate::QualityScore) as u8;
        let entry = groups.entry(chain.mask_out(key, Covariate::QualityScore)).or_default();
        entry.0 += value.observations;
        entry.1 += value.mismatches;
        entry.2 += value.observations as f64 * qual_to_error_prob(reported);
    }

    let mut result = EmpiricalTable::default();
    for (key, (observations, mismatches, expected_errors)) in groups {
        let estimated = error_prob_to_qual(expected_errors / observations as f64);
        result.keys.push(key);
        result.values.push(EmpiricalValue {
            observations,
            mismatches,
            expected_errors,
            estimated_quality: estimated,
            empirical_quality: bayesian_estimate(observations, mismatches, estimated),
        });
    }
    result
}

/// Laplace-smoothed Phred estimate of the observed error rate.
pub fn estimated_quality(observations: u64, mismatches: f64) -> f64 {
    (-10.0 * ((mismatches + 1.0) / (observations as f64 + 2.0)).log10()).round()
}

/// MAP empirical quality over integer Phred bins: Gaussian prior on the
/// distance to the reported quality, binomial likelihood of the smoothed
/// error counts.
pub fn bayesian_estimate(observations: u64, mismatches: f64, reported: f64) -> f64 {
    let observations = observations + 2 * SMOOTHING;
    let errors = (mismatches.round() as u64 + SMOOTHING).min(observations);

    let (mut best_bin, mut best) = (0u32, f64::MIN);
    for bin in 0..=MAX_PHRED as u32 {
        let posterior = log10_prior(bin as f64 - reported) + log10_binomial(observations, errors, bin as u8);
        if posterior > best {
            best = posterior;
            best_bin = bin;
        }
    }
    best_bin as f64
}

fn log10_prior(delta: f64) -> f64 {
    -delta * delta / (2.0 * PRIOR_VARIANCE) * std::f64::consts::LOG10_E
        - 0.5 * (2.0 * std::f64::consts::PI * PRIOR_VARIANCE).log10()
}

fn log10_binomial(n: u64, k: u64, qual: u8) -> f64 {
    let log10p = qual_to_error_prob_log10(qual as f64);
    let mut result = log10_choose(n, k) + k as f64 * log10p;
    if n > k {
        let miss = 1.0 - qual_to_error_prob(qual);
        if miss <= 0.0 {
            return f64::MIN;
        }
        result += (n - k) as f64 * miss.log10();
    }
    if result.is_finite() {
        result
    } else {
        f64::MIN
    }
}

fn log10_choose(n: u64, k: u64) -> f64 {
    (ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)) / std::f64::consts::LN_10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated() {
        // 0 mismatches in 8 observations: (0+1)/(8+2) = 0.1
        assert_eq!(estimated_quality(8, 0.0), 10.0);
        assert_eq!(estimated_quality(998, 0.0), 30.0);
    }

    #[test]
    fn prior_pins_small_samples() {
        // with a handful of observations the Gaussian prior dominates and
        // the empirical quality stays at the reported one
        assert_eq!(bayesian_estimate(8, 0.0, 30.0), 30.0);
        assert_eq!(bayesian_estimate(8, 1.0, 30.0), 30.0);
        assert_eq!(bayesian_estimate(3, 0.0, 45.0), 45.0);
    }

    #[test]
    fn data_overrides_prior() {
        // 10% error rate over 100k observations pulls the estimate to Q10
        assert_eq!(bayesian_estimate(100_000, 10_000.0, 30.0), 10.0);
        // clean data at scale pushes the estimate up
        assert!(bayesian_estimate(10_000_000, 10.0, 30.0) > 30.0);
    }

    #[test]
    fn bounded() {
        for (obs, mism, reported) in
            [(0, 0.0, 0.0), (1, 1.0, 93.0), (10, 0.0, 50.0), (1_000_000, 0.0, 60.0), (5, 5.0, 2.0)]
        {
            let empirical = bayesian_estimate(obs, mism, reported);
            assert!((0.0..=MAX_PHRED as f64).contains(&empirical), "{} not a Phred score", empirical);
        }
    }

    #[test]
    fn tables() {
        use super::super::chain::CovariateChain;
        use super::super::table::CovariateTable;

        let chain = CovariateChain::quality();
        let records = vec![(chain.encode(&[0, 30, 0]), 0.0); 8];
        let table = CovariateTable::from_records(records);

        let empirical = build(&table, &chain);
        assert_eq!(empirical.len(), 1);
        let value = empirical.iter().next().unwrap().1;
        assert_eq!(value.observations, 8);
        assert!((value.expected_errors - 0.008).abs() < 1e-12);
        assert_eq!(value.estimated_quality, 10.0);
        assert_eq!(value.empirical_quality, 30.0);

        let read_group = build_read_group(&table, &chain);
        assert_eq!(read_group.len(), 1);
        let value = read_group.iter().next().unwrap().1;
        assert_eq!(value.observations, 8);
        // expected errors at Q30 dominate: estimated quality is 30
        assert!((value.estimated_quality - 30.0).abs() < 1e-9);
        assert_eq!(value.empirical_quality, 30.0);
    }
}
