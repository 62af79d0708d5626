use clap::{Arg, ArgSettings};

use super::validate;

pub fn reqdefaults() -> Vec<ArgSettings> {
    vec![ArgSettings::Required, ArgSettings::TakesValue]
}

pub fn defaults() -> Vec<ArgSettings> {
    vec![ArgSettings::TakesValue]
}

pub mod core {
    use super::*;

    pub const INPUT: &str = "input";
    pub const REFERENCE: &str = "reference";
    pub const KNOWN_SITES: &str = "known-sites";
    pub const OUTPUT: &str = "output";
    pub const BATCH_SIZE: &str = "batch-size";
    pub const THREADS: &str = "threads";

    pub const SECTION_NAME: &str = "Core";

    pub fn args<'a>() -> Vec<Arg<'a>> {
        let args = vec![
            Arg::new(INPUT)
                .short('i')
                .long(INPUT)
                .settings(&reqdefaults())
                .validator(validate::path)
                .long_about("Path to the input BAM file with aligned reads. The file is never modified; recalibration results go to the output table only."),
            Arg::new(REFERENCE)
                .short('r')
                .long(REFERENCE)
                .settings(&reqdefaults())
                .validator(validate::path)
                .long_about("Indexed fasta file with the reference genome assembly. Contig names must match the names in the input BAM header."),
            Arg::new(KNOWN_SITES)
                .short('k')
                .long(KNOWN_SITES)
                .settings(&reqdefaults())
                .multiple(true)
                .validator(validate::path)
                .long_about("VCF file(s) with known variant sites (e.g. dbSNP). Bases overlapping known sites are excluded from the error accounting. May be specified multiple times."),
            Arg::new(OUTPUT)
                .short('o')
                .long(OUTPUT)
                .settings(&defaults())
                .validator(validate::writable)
                .default_value("/dev/stdout")
                .long_about("Path for the GATK-format recalibration report. By default, the report is printed to stdout."),
            Arg::new(BATCH_SIZE)
                .long(BATCH_SIZE)
                .settings(&defaults())
                .validator(validate::numeric(1usize, 10_000_000usize))
                .default_value("100000")
                .long_about("Number of reads processed per batch. Larger batches improve throughput at the cost of memory."),
            Arg::new(THREADS)
                .short('t')
                .long(THREADS)
                .settings(&defaults())
                .validator(validate::numeric(1, usize::MAX))
                .default_value("1")
                .long_about("Maximum number of threads to spawn at once."),
        ];
        args.into_iter().map(|x| x.help_heading(Some(SECTION_NAME))).collect()
    }
}

pub mod covariates {
    use super::*;

    pub const NO_CYCLE: &str = "no-cycle-covariate";
    pub const NO_CONTEXT: &str = "no-context-covariate";
    pub const MISMATCHES_CONTEXT_SIZE: &str = "mismatches-context-size";
    pub const INDELS_CONTEXT_SIZE: &str = "indels-context-size";
    pub const LOW_QUALITY_TAIL: &str = "low-quality-tail";

    pub const SECTION_NAME: &str = "Covariates";

    pub fn args<'a>() -> Vec<Arg<'a>> {
        let args = vec![
            Arg::new(NO_CYCLE)
                .long(NO_CYCLE)
                .settings(&defaults())
                .takes_value(false)
                .long_about("Do not build the machine-cycle covariate table."),
            Arg::new(NO_CONTEXT)
                .long(NO_CONTEXT)
                .settings(&defaults())
                .takes_value(false)
                .long_about("Do not build the sequence-context covariate table."),
            Arg::new(MISMATCHES_CONTEXT_SIZE)
                .long(MISMATCHES_CONTEXT_SIZE)
                .settings(&defaults())
                .validator(validate::numeric(1usize, 6usize))
                .default_value("2")
                .long_about("K-mer length of the sequence context recorded for mismatch events."),
            Arg::new(INDELS_CONTEXT_SIZE)
                .long(INDELS_CONTEXT_SIZE)
                .settings(&defaults())
                .validator(validate::numeric(1usize, 6usize))
                .default_value("3")
                .long_about("K-mer length of the sequence context recorded for insertion and deletion events."),
            Arg::new(LOW_QUALITY_TAIL)
                .long(LOW_QUALITY_TAIL)
                .settings(&defaults())
                .validator(validate::numeric(0u8, 63u8))
                .default_value("2")
                .long_about("Minimum base quality included in the covariate accounting. Bases below the threshold are ignored, not recalibrated."),
        ];
        args.into_iter().map(|x| x.help_heading(Some(SECTION_NAME))).collect()
    }
}

pub mod baq {
    use super::*;

    pub const NO_BAQ: &str = "no-baq";

    pub const SECTION_NAME: &str = "BAQ";

    pub fn args<'a>() -> Vec<Arg<'a>> {
        let args = vec![Arg::new(NO_BAQ)
            .long(NO_BAQ)
            .settings(&defaults())
            .takes_value(false)
            .long_about("Disable Base Alignment Quality recalibration; reported qualities are keyed as-is.")];
        args.into_iter().map(|x| x.help_heading(Some(SECTION_NAME))).collect()
    }
}

pub mod solid {
    use super::*;

    pub const RECAL_MODE: &str = "solid-recal-mode";
    pub const NOCALL_STRATEGY: &str = "solid-nocall-strategy";

    pub const SECTION_NAME: &str = "SOLiD";

    pub fn args<'a>() -> Vec<Arg<'a>> {
        let args = vec![
            Arg::new(RECAL_MODE)
                .long(RECAL_MODE)
                .settings(&defaults())
                .validator(validate::solid_recal_mode)
                .possible_values(&["DO_NOTHING", "SET_Q_ZERO", "SET_Q_ZERO_BASE_N", "REMOVE_REF_BIAS"])
                .default_value("SET_Q_ZERO")
                .long_about("How SOLiD color-space miscalls should be recalibrated."),
            Arg::new(NOCALL_STRATEGY)
                .long(NOCALL_STRATEGY)
                .settings(&defaults())
                .validator(validate::solid_nocall_strategy)
                .possible_values(&["THROW_EXCEPTION", "LEAVE_READ_UNRECALIBRATED", "PURGE_READ"])
                .default_value("THROW_EXCEPTION")
                .long_about("What to do with SOLiD no-calls."),
        ];
        args.into_iter().map(|x| x.help_heading(Some(SECTION_NAME))).collect()
    }
}

pub fn all<'a>() -> Vec<Arg<'a>> {
    core::args()
        .into_iter()
        .chain(covariates::args().into_iter())
        .chain(baq::args().into_iter())
        .chain(solid::args().into_iter())
        .collect()
}
