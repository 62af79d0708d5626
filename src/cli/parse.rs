use std::path::PathBuf;
use std::str::FromStr;

use clap::ArgMatches;
use indicatif::ProgressBar;
use itertools::Itertools;

use crate::core::pipeline::RecalOptions;

use super::args;

pub fn input(pbar: ProgressBar, matches: &ArgMatches) -> PathBuf {
    pbar.set_message("Parsing path to the input alignments...");
    let result: PathBuf = matches.value_of(args::core::INPUT).unwrap().into();
    pbar.finish_with_message(format!("Input file path: {}", result.display()));
    result
}

pub fn reference(pbar: ProgressBar, matches: &ArgMatches) -> PathBuf {
    pbar.set_message("Parsing path to the reference assembly...");
    let result: PathBuf = matches.value_of(args::core::REFERENCE).unwrap().into();
    pbar.finish_with_message(format!("Path to the reference assembly: {}", result.display()));
    result
}

pub fn known_sites(pbar: ProgressBar, matches: &ArgMatches) -> Vec<PathBuf> {
    pbar.set_message("Parsing paths to known variant sites...");
    let result: Vec<PathBuf> = matches.values_of(args::core::KNOWN_SITES).unwrap().map(|x| x.into()).collect();
    let paths = result.iter().map(|x| x.display()).join(" ");
    pbar.finish_with_message(format!("Known sites that will be masked: {}", paths));
    result
}

pub fn output(pbar: ProgressBar, matches: &ArgMatches) -> PathBuf {
    pbar.set_message("Parsing output path...");
    let result: PathBuf = matches.value_of(args::core::OUTPUT).unwrap().into();
    pbar.finish_with_message(format!("Recalibration report will be saved to {}", result.display()));
    result
}

pub fn threads(pbar: ProgressBar, matches: &ArgMatches) -> usize {
    pbar.set_message("Parsing number of threads allowed to launch...");
    let result = matches.value_of(args::core::THREADS).and_then(|x| x.parse().ok()).unwrap();
    pbar.finish_with_message(format!("Using thread pool with at most {} threads", result));
    result
}

pub fn options(pbar: ProgressBar, matches: &ArgMatches) -> RecalOptions {
    pbar.set_message("Parsing recalibration options...");
    let result = RecalOptions {
        batch_size: matches.value_of(args::core::BATCH_SIZE).unwrap().parse().unwrap(),
        no_baq: matches.is_present(args::baq::NO_BAQ),
        no_cycle_covariate: matches.is_present(args::covariates::NO_CYCLE),
        no_context_covariate: matches.is_present(args::covariates::NO_CONTEXT),
        low_quality_tail: matches.value_of(args::covariates::LOW_QUALITY_TAIL).unwrap().parse().unwrap(),
        mismatches_context_size: matches.value_of(args::covariates::MISMATCHES_CONTEXT_SIZE).unwrap().parse().unwrap(),
        indels_context_size: matches.value_of(args::covariates::INDELS_CONTEXT_SIZE).unwrap().parse().unwrap(),
        solid_recal_mode: FromStr::from_str(matches.value_of(args::solid::RECAL_MODE).unwrap()).unwrap(),
        solid_nocall_strategy: FromStr::from_str(matches.value_of(args::solid::NOCALL_STRATEGY).unwrap()).unwrap(),
        baq: Default::default(),
    };

    let mut msg = format!(
        "Recalibration options: batch size {}, low quality tail {}, context sizes {}/{} (mismatches/indels).",
        result.batch_size, result.low_quality_tail, result.mismatches_context_size, result.indels_context_size
    );
    if result.no_baq {
        msg += " BAQ disabled.";
    }
    if result.no_cycle_covariate {
        msg += " Cycle covariate disabled.";
    }
    if result.no_context_covariate {
        msg += " Context covariate disabled.";
    }
    pbar.finish_with_message(msg);
    result
}
