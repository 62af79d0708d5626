use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::core::baq::{recalibrate_batch, BaqParams};
use crate::core::batch::AlignmentBatch;
use crate::core::cigar::expand_batch;
use crate::core::context::BatchContext;
use crate::core::covariates::empirical::{self, EmpiricalTable};
use crate::core::covariates::{gather_batch, CovariateChain, CovariateTable, GatherOptions};
use crate::core::error::{Error, Result};
use crate::core::filters::{filter_batch, mask_known_sites, ReadFilter};
use crate::core::genome::ReferenceGenome;
use crate::core::stats::PipelineStatistics;
use crate::core::strings::StringDatabase;
use crate::core::variants::VariantDatabase;

/// SOLiD color-space handling. Parsed and recorded; requal performs no
/// color-space transformation (see DESIGN.md).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SolidRecalMode {
    DoNothing,
    SetQZero,
    SetQZeroBaseN,
    RemoveRefBias,
}

impl Default for SolidRecalMode {
    fn default() -> Self {
        SolidRecalMode::SetQZero
    }
}

impl FromStr for SolidRecalMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "DO_NOTHING" => Ok(SolidRecalMode::DoNothing),
            "SET_Q_ZERO" => Ok(SolidRecalMode::SetQZero),
            "SET_Q_ZERO_BASE_N" => Ok(SolidRecalMode::SetQZeroBaseN),
            "REMOVE_REF_BIAS" => Ok(SolidRecalMode::RemoveRefBias),
            _ => Err(format!("unknown SOLiD recalibration mode: {}", s)),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SolidNocallStrategy {
    ThrowException,
    LeaveReadUnrecalibrated,
    PurgeRead,
}

impl Default for SolidNocallStrategy {
    fn default() -> Self {
        SolidNocallStrategy::ThrowException
    }
}

impl FromStr for SolidNocallStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "THROW_EXCEPTION" => Ok(SolidNocallStrategy::ThrowException),
            "LEAVE_READ_UNRECALIBRATED" => Ok(SolidNocallStrategy::LeaveReadUnrecalibrated),
            "PURGE_READ" => Ok(SolidNocallStrategy::PurgeRead),
            _ => Err(format!("unknown SOLiD nocall strategy: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecalOptions {
    pub batch_size: usize,
    pub no_baq: bool,
    pub no_cycle_covariate: bool,
    pub no_context_covariate: bool,
    pub low_quality_tail: u8,
    pub mismatches_context_size: usize,
    pub indels_context_size: usize,
    pub solid_recal_mode: SolidRecalMode,
    pub solid_nocall_strategy: SolidNocallStrategy,
    pub baq: BaqParams,
}

impl Default for RecalOptions {
    fn default() -> Self {
        RecalOptions {
            batch_size: 100_000,
            no_baq: false,
            no_cycle_covariate: false,
            no_context_covariate: false,
            low_quality_tail: 2,
            mismatches_context_size: 2,
            indels_context_size: 3,
            solid_recal_mode: Default::default(),
            solid_nocall_strategy: Default::default(),
            baq: Default::default(),
        }
    }
}

impl RecalOptions {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be positive".into()));
        }
        for (name, k) in [("mismatches", self.mismatches_context_size), ("indels", self.indels_context_size)] {
            if !(1..=6).contains(&k) {
                return Err(Error::Config(format!("{} context size {} outside the supported 1..=6", name, k)));
            }
        }
        if self.low_quality_tail > 63 {
            return Err(Error::Config(format!("low quality tail {} exceeds the covariate range", self.low_quality_tail)));
        }
        Ok(())
    }

    fn gather(&self) -> GatherOptions {
        GatherOptions::new(self.low_quality_tail, self.mismatches_context_size, self.indels_context_size)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PipelineStatus {
    Complete,
    Cancelled,
}

/// Everything the postprocess stage derives: per-chain empirical tables plus
/// whatever is needed to decode their keys for output.
pub struct Recalibration {
    pub options: RecalOptions,
    pub read_groups: StringDatabase,
    pub quality_chain: CovariateChain,
    pub context_chain: CovariateChain,
    pub cycle_chain: CovariateChain,
    pub read_group_table: EmpiricalTable,
    pub quality_table: EmpiricalTable,
    pub context_table: Option<EmpiricalTable>,
    pub cycle_table: Option<EmpiricalTable>,
    pub stats: PipelineStatistics,
}

/// Drives batches through the stage sequence and owns all cross-batch
/// state: the read-group interner, the global tables and the statistics.
/// Global merges happen on the driver thread in batch arrival order, so
/// identical inputs give bit-identical tables.
pub struct Pipeline<'a, F: ReadFilter> {
    genome: &'a ReferenceGenome,
    variants: &'a VariantDatabase,
    filter: F,
    options: RecalOptions,
    read_groups: StringDatabase,
    ctx: BatchContext,
    quality_chain: CovariateChain,
    context_chain: CovariateChain,
    cycle_chain: CovariateChain,
    quality_table: CovariateTable,
    context_table: CovariateTable,
    cycle_table: CovariateTable,
    stats: PipelineStatistics,
    cancelled: Arc<AtomicBool>,
}

impl<'a, F: ReadFilter> Pipeline<'a, F> {
    pub fn new(
        genome: &'a ReferenceGenome,
        variants: &'a VariantDatabase,
        filter: F,
        options: RecalOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Pipeline {
            genome,
            variants,
            filter,
            options,
            read_groups: StringDatabase::default(),
            ctx: BatchContext::new(),
            quality_chain: CovariateChain::quality(),
            context_chain: CovariateChain::context(),
            cycle_chain: CovariateChain::cycle(),
            quality_table: CovariateTable::new(),
            context_table: CovariateTable::new(),
            cycle_table: CovariateTable::new(),
            stats: PipelineStatistics::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Read groups are interned by the loader through this handle; ids match
    /// the ReadGroup covariate values.
    pub fn read_groups_mut(&mut self) -> &mut StringDatabase {
        &mut self.read_groups
    }

    /// Shared flag checked at batch boundaries; setting it makes the driver
    /// finish the current batch, skip the rest and report Cancelled.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn stats(&self) -> &PipelineStatistics {
        &self.stats
    }

    pub fn quality_table(&self) -> &CovariateTable {
        &self.quality_table
    }

    pub fn process_batch(&mut self, batch: &AlignmentBatch) {
        self.stats.total_reads += batch.len() as u64;
        self.ctx.reset(batch);

        let started = Instant::now();
        self.stats.filtered_reads += filter_batch(batch, &mut self.ctx, &self.filter);
        self.stats.read_filter.add(started.elapsed());

        if !self.ctx.active_reads.is_empty() {
            let started = Instant::now();
            expand_batch(batch, &mut self.ctx, self.genome);
            self.stats.cigar_expansion.add(started.elapsed());

            let started = Instant::now();
            mask_known_sites(batch, &mut self.ctx, self.genome, self.variants);
            self.stats.snp_filter.add(started.elapsed());

            if !self.options.no_baq {
                let started = Instant::now();
                self.stats.baq_reads += recalibrate_batch(batch, &mut self.ctx, self.genome, &self.options.baq);
                self.stats.baq.add(started.elapsed());
            }

            let started = Instant::now();
            crate::core::fractional::assign_errors(batch, &mut self.ctx, self.genome);
            self.stats.fractional_error.add(started.elapsed());

            let started = Instant::now();
            let gather = self.options.gather();
            let records = gather_batch(batch, &self.ctx, &self.quality_chain, &gather);
            self.quality_table.merge(&CovariateTable::from_records(records));
            if !self.options.no_context_covariate {
                let records = gather_batch(batch, &self.ctx, &self.context_chain, &gather);
                self.context_table.merge(&CovariateTable::from_records(records));
            }
            if !self.options.no_cycle_covariate {
                let records = gather_batch(batch, &self.ctx, &self.cycle_chain, &gather);
                self.cycle_table.merge(&CovariateTable::from_records(records));
            }
            self.stats.covariates.add(started.elapsed());
        }

        self.stats.num_batches += 1;
    }

    /// Consumes batches in order. The only blocking points are the loader
    /// and the stage barriers inside `process_batch`.
    pub fn run<I>(&mut self, batches: I) -> Result<PipelineStatus>
    where
        I: IntoIterator<Item = Result<AlignmentBatch>>,
    {
        let mut batches = batches.into_iter();
        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                return Ok(PipelineStatus::Cancelled);
            }
            let started = Instant::now();
            let batch = batches.next();
            self.stats.io.add(started.elapsed());
            match batch {
                Some(batch) => self.process_batch(&batch?),
                None => return Ok(PipelineStatus::Complete),
            }
        }
    }

    /// Postprocess: derive empirical qualities for every table.
    pub fn finalize(mut self) -> Recalibration {
        let started = Instant::now();
        let read_group_table = empirical::build_read_group(&self.quality_table, &self.quality_chain);
        let quality_table = empirical::build(&self.quality_table, &self.quality_chain);
        let context_table = (!self.options.no_context_covariate)
            .then(|| empirical::build(&self.context_table, &self.context_chain));
        let cycle_table =
            (!self.options.no_cycle_covariate).then(|| empirical::build(&self.cycle_table, &self.cycle_chain));
        self.stats.postprocessing.add(started.elapsed());

        Recalibration {
            options: self.options,
            read_groups: self.read_groups,
            quality_chain: self.quality_chain,
            context_chain: self.context_chain,
            cycle_chain: self.cycle_chain,
            read_group_table,
            quality_table,
            context_table,
            cycle_table,
            stats: self.stats,
        }
    }
}
