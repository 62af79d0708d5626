/// Largest representable Phred score; qualities and empirical estimates are
/// clamped into [0, MAX_PHRED].
pub const MAX_PHRED: u8 = 93;

#[inline]
pub fn qual_to_error_prob(qual: u8) -> f64 {
    10f64.powf(-(qual as f64) / 10.0)
}

#[inline]
pub fn qual_to_error_prob_log10(qual: f64) -> f64 {
    -qual / 10.0
}

/// Phred-scales an error rate, clamped into the representable range.
#[inline]
pub fn error_prob_to_qual(prob: f64) -> f64 {
    (-10.0 * prob.log10()).max(0.0).min(MAX_PHRED as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert!((qual_to_error_prob(30) - 1e-3).abs() < 1e-12);
        assert!((qual_to_error_prob(0) - 1.0).abs() < 1e-12);
        assert!((error_prob_to_qual(1e-3) - 30.0).abs() < 1e-9);
        assert_eq!(error_prob_to_qual(1e-30), MAX_PHRED as f64);
        assert_eq!(error_prob_to_qual(2.0), 0.0);
    }
}
