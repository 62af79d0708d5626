//! requal: high-throughput base quality score recalibration (BQSR).
//!
//! Consumes an aligned BAM, an indexed FASTA reference and one or more VCFs
//! of known variant sites; produces GATK-compatible recalibration tables
//! describing the empirical quality of every (read group, reported quality,
//! covariate, event) combination observed in the input.

pub mod cli;
pub mod core;
