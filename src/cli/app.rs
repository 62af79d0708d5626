use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Instant;

use clap::ArgMatches;
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use rayon::ThreadPoolBuilder;

use crate::core::batch::flags;
use crate::core::error::Result;
use crate::core::filters::{ByFlags, ByQuality, Sequential};
use crate::core::io::bam::BatchReader;
use crate::core::io::{fasta, vcf};
use crate::core::pipeline::{Pipeline, PipelineStatus, RecalOptions};

use super::{parse, resformat};

/// Default exclusions: unmapped, secondary, QC-fail, duplicate and
/// supplementary reads take no part in recalibration.
const EXCLUDE_FLAGS: u16 =
    flags::UNMAPPED | flags::SECONDARY | flags::QC_FAIL | flags::DUPLICATE | flags::SUPPLEMENTARY;
const MIN_MAPQ: u8 = 1;

struct ParsedArgs {
    input: PathBuf,
    reference: PathBuf,
    known_sites: Vec<PathBuf>,
    output: PathBuf,
    options: RecalOptions,
}

impl ParsedArgs {
    fn new(matches: &ArgMatches, factory: &impl Fn() -> ProgressBar) -> ParsedArgs {
        ParsedArgs {
            input: parse::input(factory(), matches),
            reference: parse::reference(factory(), matches),
            known_sites: parse::known_sites(factory(), matches),
            output: parse::output(factory(), matches),
            options: parse::options(factory(), matches),
        }
    }
}

pub struct App {
    args: ParsedArgs,
    style: ProgressStyle,
}

impl App {
    pub fn new(matches: &ArgMatches) -> App {
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {spinner} {msg}")
            .on_finish(ProgressFinish::AndLeave);

        let spawner = style.clone();
        let factory = move || ProgressBar::new_spinner().with_style(spawner.clone());

        let threads = parse::threads(factory(), matches);
        ThreadPoolBuilder::new().num_threads(threads).build_global().expect("Failed to initialize thread pool");

        let args = ParsedArgs::new(matches, &factory);
        App { args, style }
    }

    fn pbar(&self) -> ProgressBar {
        ProgressBar::new_spinner().with_style(self.style.clone())
    }

    pub fn run(self) -> Result<PipelineStatus> {
        let pbar = self.pbar();
        pbar.set_message("Loading the reference genome...");
        let genome = fasta::load(&self.args.reference)?;
        pbar.finish_with_message(format!("Loaded {} reference sequences", genome.num_sequences()));

        let pbar = self.pbar();
        pbar.set_message("Loading known variant sites...");
        let variants = vcf::load(&self.args.known_sites, &genome)?;
        pbar.finish_with_message(format!("Loaded {} known variant sites", variants.len()));

        let filter = Sequential::new(ByQuality::new(MIN_MAPQ), ByFlags::new(0, EXCLUDE_FLAGS));
        let mut reader = BatchReader::new(&self.args.input, &genome, self.args.options.batch_size)?;
        let mut pipeline = Pipeline::new(&genome, &variants, filter, self.args.options.clone())?;

        let cancelled = pipeline.cancel_flag();
        ctrlc::set_handler(move || cancelled.store(true, Ordering::Relaxed))
            .expect("Failed to install the interrupt handler");

        let pbar = self.pbar();
        let mut read_groups = std::mem::take(pipeline.read_groups_mut());
        let (mut batches, mut reads) = (0u64, 0u64);
        let status = {
            let loader = std::iter::from_fn(|| reader.next_batch(&mut read_groups).transpose()).inspect(|batch| {
                if let Ok(batch) = batch {
                    batches += 1;
                    reads += batch.len() as u64;
                    pbar.set_message(format!("Processing batch {} ({} reads loaded)", batches, reads));
                }
            });
            pipeline.run(loader)?
        };
        *pipeline.read_groups_mut() = read_groups;

        let stats = pipeline.stats();
        pbar.finish_with_message(format!(
            "Processed {} reads in {} batches ({} filtered out, {} BAQ-recalibrated)",
            stats.total_reads, stats.num_batches, stats.filtered_reads, stats.baq_reads
        ));

        if status == PipelineStatus::Cancelled {
            return Ok(status);
        }

        let pbar = self.pbar();
        pbar.set_message("Writing the recalibration report...");
        let mut recalibration = pipeline.finalize();

        let started = Instant::now();
        let mut saveto = BufWriter::new(File::create(&self.args.output)?);
        resformat::report(&mut saveto, &recalibration)?;
        recalibration.stats.output.add(started.elapsed());

        pbar.finish_with_message(format!(
            "Recalibration report saved to {} in {:.2?}",
            self.args.output.display(),
            recalibration.stats.output.elapsed
        ));

        Ok(status)
    }
}
