pub use chain::{ChainKind, Covariate, CovariateChain, CovariateKey};
pub use table::{CovariateTable, CovariateValue};

pub mod chain;
pub mod empirical;
pub mod table;

use derive_more::Constructor;

use crate::core::batch::{AlignmentBatch, ReadRecord};
use crate::core::cigar::CigarEvent;
use crate::core::context::BatchContext;
use crate::core::dna::Nucleotide;

/// Event type as it appears inside covariate keys and in the output tables.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EventType {
    Match = 0,
    Insertion = 1,
    Deletion = 2,
}

impl EventType {
    pub fn ascii(self) -> char {
        match self {
            EventType::Match => 'M',
            EventType::Insertion => 'I',
            EventType::Deletion => 'D',
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            0 => EventType::Match,
            1 => EventType::Insertion,
            _ => EventType::Deletion,
        }
    }
}

#[derive(Constructor, Clone, Copy, Debug)]
pub struct GatherOptions {
    /// Bases below this post-BAQ quality are not keyed.
    pub low_quality_tail: u8,
    pub mismatches_context_size: usize,
    pub indels_context_size: usize,
}

/// Emits one (key, error mass) record per active, unmasked Match/Insertion
/// base of the batch. A base whose optional covariate cannot be computed
/// (context truncated by the read edge or an ambiguous base, cycle out of
/// range) is skipped for this chain only.
pub fn gather_batch(
    batch: &AlignmentBatch,
    ctx: &BatchContext,
    chain: &CovariateChain,
    options: &GatherOptions,
) -> Vec<(CovariateKey, f64)> {
    let mut records = Vec::new();
    let mut values = Vec::with_capacity(chain.fields().len());

    for &read in &ctx.active_reads {
        let record = &batch.reads[read as usize];
        let range = ctx.read_bases(read);

        'bases: for base in range.clone() {
            if !ctx.active_locations[base] {
                continue;
            }
            let event = match ctx.events[base] {
                CigarEvent::Match => EventType::Match,
                CigarEvent::Insertion => EventType::Insertion,
                _ => continue,
            };
            let qual = ctx.baq_quals[base];
            if qual < options.low_quality_tail {
                continue;
            }
            let cursor = base - range.start;

            values.clear();
            for field in chain.fields() {
                let value = match field.covariate {
                    Covariate::ReadGroup => record.read_group,
                    Covariate::QualityScore => (qual as u32).min((1 << chain::QUALITY_BITS) - 1),
                    Covariate::EventType => event as u32,
                    Covariate::Cycle => match encode_cycle(record, cursor) {
                        Some(value) => value,
                        None => continue 'bases,
                    },
                    Covariate::Context => {
                        let k = match event {
                            EventType::Match => options.mismatches_context_size,
                            _ => options.indels_context_size,
                        };
                        match encode_context(record, cursor, k) {
                            Some(value) => value,
                            None => continue 'bases,
                        }
                    }
                };
                values.push(value);
            }
            records.push((chain.encode(&values), ctx.fractional_errors[base]));
        }
    }
    records
}

/// 1-based machine cycle of a base: reverse-strand reads count from the read
/// end, second-of-pair reads are negated. Sign-folded into the key.
pub fn encode_cycle(record: &ReadRecord, cursor: usize) -> Option<u32> {
    let mut cycle = if record.is_reverse() { record.len() - cursor } else { cursor + 1 } as i32;
    if record.is_second_in_pair() {
        cycle = -cycle;
    }
    let magnitude = cycle.unsigned_abs();
    if magnitude >= 1 << (chain::CYCLE_BITS - 1) {
        return None;
    }
    Some((magnitude << 1) | (cycle < 0) as u32)
}

pub fn decode_cycle(value: u32) -> i32 {
    let magnitude = (value >> 1) as i32;
    if value & 1 == 1 {
        -magnitude
    } else {
        magnitude
    }
}

/// The k-mer ending at the base, in machine orientation (reverse-strand
/// reads are reverse-complemented), two bits per base.
pub fn encode_context(record: &ReadRecord, cursor: usize, k: usize) -> Option<u32> {
    let machine = if record.is_reverse() { record.len() - 1 - cursor } else { cursor };
    if machine + 1 < k {
        return None;
    }
    let mut value = 0u32;
    for offset in 0..k {
        let base = base_at(record, machine + 1 - k + offset);
        value |= base.twobit()? << (2 * offset);
    }
    Some(value)
}

pub fn decode_context(value: u32, k: usize) -> String {
    (0..k).map(|offset| Nucleotide::from_twobit(value >> (2 * offset)).symbol()).collect()
}

#[inline]
fn base_at(record: &ReadRecord, machine: usize) -> Nucleotide {
    if record.is_reverse() {
        record.bases.get(record.len() - 1 - machine).complement()
    } else {
        record.bases.get(machine)
    }
}

#[cfg(test)]
mod tests {
    use rust_htslib::bam::record::Cigar;

    use crate::core::batch::flags;
    use crate::core::batch::test_utils::read;
    use crate::core::cigar::expand_batch;
    use crate::core::filters::{filter_batch, ByFlags};
    use crate::core::genome::ReferenceGenome;

    use super::*;

    #[test]
    fn cycle_orientation() {
        let forward = read(0, 0, 0, b"ACGTACGT", 30, vec![Cigar::Match(8)]);
        assert_eq!(encode_cycle(&forward, 0), Some(1 << 1));
        assert_eq!(encode_cycle(&forward, 7), Some(8 << 1));

        let mut reverse = forward.clone();
        reverse.flags = flags::REVERSE;
        assert_eq!(encode_cycle(&reverse, 7), Some(1 << 1));
        assert_eq!(encode_cycle(&reverse, 0), Some(8 << 1));

        let mut second = forward.clone();
        second.flags = flags::SECOND_IN_PAIR;
        assert_eq!(encode_cycle(&second, 0), Some((1 << 1) | 1));
        assert_eq!(decode_cycle(encode_cycle(&second, 0).unwrap()), -1);
    }

    #[test]
    fn cycle_out_of_range() {
        let mut long = read(0, 0, 0, b"A", 30, vec![Cigar::Match(1)]);
        long.bases = crate::core::dna::PackedSequence::from_ascii(&vec![b'A'; 600]);
        long.quals = vec![30; 600];
        assert_eq!(encode_cycle(&long, 599), None);
        assert!(encode_cycle(&long, 400).is_some());
    }

    #[test]
    fn context_forward() {
        let r = read(0, 0, 0, b"ACGTACGT", 30, vec![Cigar::Match(8)]);
        // first base has no 2-mer context
        assert_eq!(encode_context(&r, 0, 2), None);
        let value = encode_context(&r, 2, 2).unwrap();
        assert_eq!(decode_context(value, 2), "CG");
        assert_eq!(decode_context(encode_context(&r, 7, 3).unwrap(), 3), "CGT");
    }

    #[test]
    fn context_reverse_complements() {
        let mut r = read(0, 0, 0, b"ACGTACGT", 30, vec![Cigar::Match(8)]);
        r.flags = flags::REVERSE;
        // machine-order sequence is revcomp: ACGTACGT; cursor 5 is machine
        // index 2, context "CG"
        assert_eq!(decode_context(encode_context(&r, 5, 2).unwrap(), 2), "CG");
        // the machine-first base has no context
        assert_eq!(encode_context(&r, 7, 2), None);
    }

    #[test]
    fn context_ambiguous_base() {
        let r = read(0, 0, 0, b"ANGT", 30, vec![Cigar::Match(4)]);
        assert_eq!(encode_context(&r, 2, 2), None);
        assert_eq!(encode_context(&r, 3, 2).unwrap(), encode_context(&read(0, 0, 0, b"AGGT", 30, vec![]), 3, 2).unwrap());
    }

    #[test]
    fn gather_respects_masks_and_tail() {
        let mut genome = ReferenceGenome::new();
        genome.add_sequence("chr1", b"ACGTACGT");
        let mut record = read(0, 0, 0, b"ACGTACGT", 30, vec![Cigar::Match(8)]);
        record.quals[1] = 1; // below the default tail of 2
        let batch = AlignmentBatch::new(vec![record]);

        let mut ctx = BatchContext::new();
        ctx.reset(&batch);
        filter_batch(&batch, &mut ctx, &ByFlags::new(0, 3844));
        expand_batch(&batch, &mut ctx, &genome);
        ctx.active_locations.set(4, false); // pretend a known site

        let chain = CovariateChain::quality();
        let records = gather_batch(&batch, &ctx, &chain, &GatherOptions::new(2, 2, 3));
        assert_eq!(records.len(), 6);
        for (key, errors) in records {
            assert_eq!(chain.decode(key, Covariate::QualityScore), 30);
            assert_eq!(chain.decode(key, Covariate::EventType), EventType::Match as u32);
            assert_eq!(errors, 0.0);
        }
    }
}
