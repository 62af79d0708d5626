//! End-to-end recalibration scenarios driven through the library API on
//! synthetic batches: single reads against a toy reference, with and without
//! known sites, soft clips and multi-batch accumulation.

use rust_htslib::bam::record::Cigar;

use requal::cli::resformat;
use requal::core::batch::{flags, AlignmentBatch, ReadRecord};
use requal::core::covariates::{Covariate, EventType};
use requal::core::dna::PackedSequence;
use requal::core::filters::ByFlags;
use requal::core::genome::ReferenceGenome;
use requal::core::pipeline::{Pipeline, PipelineStatus, RecalOptions, Recalibration};
use requal::core::variants::VariantDatabase;

const EXCLUDE_FLAGS: u16 = 3844;

fn read(seq: &[u8], qual: u8, cigar: Vec<Cigar>) -> ReadRecord {
    ReadRecord {
        read_group: 0,
        sequence_id: 0,
        alignment_start: 0,
        cigar,
        bases: PackedSequence::from_ascii(seq),
        quals: vec![qual; seq.len()],
        flags: 0,
        mapq: 60,
        malformed: false,
    }
}

fn genome() -> ReferenceGenome {
    let mut genome = ReferenceGenome::new();
    genome.add_sequence("chr1", b"ACGTACGT");
    genome
}

fn options() -> RecalOptions {
    // scenarios exercise the covariate accounting; BAQ has dedicated tests
    RecalOptions { no_baq: true, ..Default::default() }
}

fn recalibrate(batches: Vec<AlignmentBatch>, variants: VariantDatabase, options: RecalOptions) -> Recalibration {
    let genome = genome();
    let mut pipeline = Pipeline::new(&genome, &variants, ByFlags::new(0, EXCLUDE_FLAGS), options).unwrap();
    pipeline.read_groups_mut().insert("rg1");
    let status = pipeline.run(batches.into_iter().map(Ok)).unwrap();
    assert_eq!(status, PipelineStatus::Complete);
    pipeline.finalize()
}

fn quality_rows(recal: &Recalibration) -> Vec<(u8, char, u64, f64, f64)> {
    recal
        .quality_table
        .iter()
        .map(|(key, value)| {
            let qual = recal.quality_chain.decode(key, Covariate::QualityScore) as u8;
            let event = EventType::from_code(recal.quality_chain.decode(key, Covariate::EventType)).ascii();
            (qual, event, value.observations, value.mismatches, value.empirical_quality)
        })
        .collect()
}

#[test]
fn all_match_single_read() {
    let batch = AlignmentBatch::new(vec![read(b"ACGTACGT", 30, vec![Cigar::Match(8)])]);
    let recal = recalibrate(vec![batch], VariantDatabase::default(), options());

    assert_eq!(quality_rows(&recal), vec![(30, 'M', 8, 0.0, 30.0)]);

    let (_, value) = recal.read_group_table.iter().next().unwrap();
    assert_eq!(value.observations, 8);
    assert_eq!(value.mismatches, 0.0);
    assert!((value.expected_errors - 0.008).abs() < 1e-12);
    assert!((value.estimated_quality - 30.0).abs() < 1e-9);
    assert_eq!(value.empirical_quality, 30.0);
}

#[test]
fn one_mismatch() {
    let batch = AlignmentBatch::new(vec![read(b"ACGAACGT", 30, vec![Cigar::Match(8)])]);
    let recal = recalibrate(vec![batch], VariantDatabase::default(), options());

    // a handful of observations cannot move the empirical quality off the prior
    assert_eq!(quality_rows(&recal), vec![(30, 'M', 8, 1.0, 30.0)]);

    // the error lands on the GA context (the 2-mer ending at the mismatch)
    let context = recal.context_table.as_ref().unwrap();
    let chain = &recal.context_chain;
    let erroneous: Vec<(u32, f64)> = context
        .iter()
        .filter(|(_, value)| value.mismatches > 0.0)
        .map(|(key, value)| (chain.decode(key, Covariate::Context), value.mismatches))
        .collect();
    assert_eq!(erroneous.len(), 1);
    assert_eq!(requal::core::covariates::decode_context(erroneous[0].0, 2), "GA");
    assert_eq!(erroneous[0].1, 1.0);
}

#[test]
fn masked_mismatch_is_invisible() {
    // same as one_mismatch, but the mismatching base overlaps a known SNP
    let batch = AlignmentBatch::new(vec![read(b"ACGAACGT", 30, vec![Cigar::Match(8)])]);
    let recal = recalibrate(vec![batch], VariantDatabase::from_intervals(vec![(3, 4)]), options());

    assert_eq!(quality_rows(&recal), vec![(30, 'M', 7, 0.0, 30.0)]);
}

#[test]
fn fully_masked_batch_yields_empty_tables() {
    let batch = AlignmentBatch::new(vec![read(b"ACGTACGT", 30, vec![Cigar::Match(8)])]);
    let recal = recalibrate(vec![batch], VariantDatabase::from_intervals(vec![(0, 8)]), options());

    assert!(recal.quality_table.is_empty());
    assert!(recal.read_group_table.is_empty());
    assert!(recal.context_table.as_ref().unwrap().is_empty());
}

#[test]
fn soft_clips_take_no_part() {
    let record = read(b"NNACGTACGTNN", 30, vec![Cigar::SoftClip(2), Cigar::Match(8), Cigar::SoftClip(2)]);
    let batch = AlignmentBatch::new(vec![record]);
    let recal = recalibrate(vec![batch], VariantDatabase::default(), options());

    assert_eq!(quality_rows(&recal), vec![(30, 'M', 8, 0.0, 30.0)]);

    // clipped bases appear in no table at all
    let total_cycle_observations: u64 =
        recal.cycle_table.as_ref().unwrap().iter().map(|(_, value)| value.observations).sum();
    assert_eq!(total_cycle_observations, 8);
}

#[test]
fn empty_batch_keeps_the_pipeline_going() {
    let mut unmapped = read(b"ACGTACGT", 30, vec![Cigar::Match(8)]);
    unmapped.flags = flags::UNMAPPED;

    let batches =
        vec![AlignmentBatch::new(vec![unmapped; 3]), AlignmentBatch::new(vec![read(b"ACGTACGT", 30, vec![Cigar::Match(8)])])];
    let recal = recalibrate(batches, VariantDatabase::default(), options());

    assert_eq!(recal.stats.total_reads, 4);
    assert_eq!(recal.stats.filtered_reads, 3);
    assert_eq!(recal.stats.num_batches, 2);
    assert_eq!(quality_rows(&recal), vec![(30, 'M', 8, 0.0, 30.0)]);
}

#[test]
fn observations_accumulate_across_batches() {
    let make = || AlignmentBatch::new(vec![read(b"ACGAACGT", 30, vec![Cigar::Match(8)])]);
    let recal = recalibrate(vec![make(), make(), make()], VariantDatabase::default(), options());

    assert_eq!(quality_rows(&recal), vec![(30, 'M', 24, 3.0, 30.0)]);
}

#[test]
fn insertions_key_their_own_event() {
    // 3M2I3M: the two inserted bases are keyed as insertion events
    let batch = AlignmentBatch::new(vec![read(b"ACGTTTAC", 30, vec![Cigar::Match(3), Cigar::Ins(2), Cigar::Match(3)])]);
    let recal = recalibrate(vec![batch], VariantDatabase::default(), options());

    let mut rows = quality_rows(&recal);
    rows.sort_by_key(|&(_, event, ..)| event);
    assert_eq!(rows.len(), 2);
    let (_, event, observations, mismatches, _) = rows[0];
    assert_eq!((event, observations), ('I', 2));
    assert_eq!(mismatches, 0.0);
    let (_, event, observations, mismatches, _) = rows[1];
    assert_eq!((event, observations), ('M', 6));
    // the insertion mass lands on its flanking match bases
    assert_eq!(mismatches, 1.0);
}

#[test]
fn disabled_covariates_are_not_built() {
    let batch = AlignmentBatch::new(vec![read(b"ACGTACGT", 30, vec![Cigar::Match(8)])]);
    let options = RecalOptions { no_baq: true, no_cycle_covariate: true, no_context_covariate: true, ..Default::default() };
    let recal = recalibrate(vec![batch], VariantDatabase::default(), options);

    assert!(recal.context_table.is_none());
    assert!(recal.cycle_table.is_none());
    assert_eq!(quality_rows(&recal).len(), 1);
}

#[test]
fn report_is_deterministic() {
    let run = || {
        let batch = AlignmentBatch::new(vec![
            read(b"ACGAACGT", 30, vec![Cigar::Match(8)]),
            read(b"ACGTACGT", 25, vec![Cigar::Match(8)]),
        ]);
        let recal = recalibrate(vec![batch], VariantDatabase::from_intervals(vec![(6, 7)]), options());
        let mut out = Vec::new();
        resformat::report(&mut out, &recal).unwrap();
        String::from_utf8(out).unwrap()
    };

    let first = run();
    assert_eq!(first, run());

    assert!(first.starts_with("#:GATKReport.v1.1:3\n"));
    for table in ["RecalTable0", "RecalTable1", "RecalTable2"] {
        assert!(first.contains(&format!("#:GATKTable:{}:", table)), "missing {}", table);
    }
    // quality rows are sorted numerically: 25 before 30
    let lines: Vec<&str> = first.lines().collect();
    let q25 = lines.iter().position(|x| x.split_whitespace().take(3).eq(["rg1", "25", "M"])).unwrap();
    let q30 = lines.iter().position(|x| x.split_whitespace().take(3).eq(["rg1", "30", "M"])).unwrap();
    assert!(q25 < q30);
}

#[test]
fn baq_enabled_never_raises_qualities() {
    let batch = AlignmentBatch::new(vec![read(b"ACGTACGT", 40, vec![Cigar::Match(8)])]);
    let recal = recalibrate(vec![batch], VariantDatabase::default(), RecalOptions::default());

    assert_eq!(recal.stats.baq_reads, 1);
    for (key, _) in recal.quality_table.iter() {
        let qual = recal.quality_chain.decode(key, Covariate::QualityScore);
        assert!(qual <= 40, "BAQ raised a quality to {}", qual);
        assert!(qual >= 6);
    }
}
