use std::ops::AddAssign;
use std::time::{Duration, Instant};

/// Wall-clock accumulator for one pipeline stage.
#[derive(Default, Clone, Copy, Debug)]
pub struct TimeSeries {
    pub elapsed: Duration,
    pub laps: u64,
}

impl TimeSeries {
    pub fn add(&mut self, elapsed: Duration) {
        self.elapsed += elapsed;
        self.laps += 1;
    }

    /// Times a closure and records the lap.
    pub fn time<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let started = Instant::now();
        let result = f();
        self.add(started.elapsed());
        result
    }
}

impl AddAssign for TimeSeries {
    fn add_assign(&mut self, other: Self) {
        self.elapsed += other.elapsed;
        self.laps += other.laps;
    }
}

#[derive(Default, Clone, Debug)]
pub struct PipelineStatistics {
    pub total_reads: u64,
    pub filtered_reads: u64,
    pub baq_reads: u64,
    pub num_batches: u64,

    pub io: TimeSeries,
    pub read_filter: TimeSeries,
    pub cigar_expansion: TimeSeries,
    pub snp_filter: TimeSeries,
    pub baq: TimeSeries,
    pub fractional_error: TimeSeries,
    pub covariates: TimeSeries,
    pub postprocessing: TimeSeries,
    pub output: TimeSeries,
}

impl AddAssign for PipelineStatistics {
    fn add_assign(&mut self, other: Self) {
        self.total_reads += other.total_reads;
        self.filtered_reads += other.filtered_reads;
        self.baq_reads += other.baq_reads;
        self.num_batches += other.num_batches;

        self.io += other.io;
        self.read_filter += other.read_filter;
        self.cigar_expansion += other.cigar_expansion;
        self.snp_filter += other.snp_filter;
        self.baq += other.baq;
        self.fractional_error += other.fractional_error;
        self.covariates += other.covariates;
        self.postprocessing += other.postprocessing;
        self.output += other.output;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointwise_addition() {
        let mut a = PipelineStatistics { total_reads: 10, filtered_reads: 2, ..Default::default() };
        a.baq.add(Duration::from_millis(5));

        let mut b = PipelineStatistics { total_reads: 3, baq_reads: 1, num_batches: 1, ..Default::default() };
        b.baq.add(Duration::from_millis(7));

        a += b;
        assert_eq!(a.total_reads, 13);
        assert_eq!(a.filtered_reads, 2);
        assert_eq!(a.baq_reads, 1);
        assert_eq!(a.baq.laps, 2);
        assert_eq!(a.baq.elapsed, Duration::from_millis(12));
    }
}
