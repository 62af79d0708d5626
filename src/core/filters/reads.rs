use derive_getters::Getters;
use derive_more::Constructor;
#[cfg(test)]
use mockall::mock;

use crate::core::batch::{AlignmentBatch, ReadRecord};
use crate::core::context::BatchContext;

pub trait ReadFilter {
    fn is_read_ok(&self, read: &ReadRecord) -> bool;
}

#[cfg(test)]
mock! {
    pub ReadFilter {}
    impl ReadFilter for ReadFilter {
        fn is_read_ok(&self, read: &ReadRecord) -> bool;
    }
}

#[derive(Constructor, Getters, Copy, Clone)]
pub struct ByFlags {
    include: u16,
    exclude: u16,
}

impl ReadFilter for ByFlags {
    #[inline]
    fn is_read_ok(&self, read: &ReadRecord) -> bool {
        ((read.flags & self.include) == self.include) && ((read.flags & self.exclude) == 0)
    }
}

#[derive(Constructor, Getters, Copy, Clone)]
pub struct ByQuality {
    mapq: u8,
}

impl ReadFilter for ByQuality {
    #[inline]
    fn is_read_ok(&self, read: &ReadRecord) -> bool {
        // 255 = mapping quality is not available
        read.mapq >= self.mapq && read.mapq != 255
    }
}

#[derive(Constructor, Copy, Clone)]
pub struct Sequential<First: ReadFilter, Second: ReadFilter> {
    first: First,
    second: Second,
}

impl<First: ReadFilter, Second: ReadFilter> ReadFilter for Sequential<First, Second> {
    #[inline]
    fn is_read_ok(&self, read: &ReadRecord) -> bool {
        self.first.is_read_ok(read) & self.second.is_read_ok(read)
    }
}

/// Builds the active read list: reads passing the filter, resolvable against
/// the reference, structurally sound, and touching at least one reference
/// base. Returns the number of dropped reads.
pub fn filter_batch(batch: &AlignmentBatch, ctx: &mut BatchContext, filter: &impl ReadFilter) -> u64 {
    ctx.active_reads.clear();
    for (i, read) in batch.reads.iter().enumerate() {
        let structurally_ok = !read.malformed
            && read.has_valid_sequence()
            && !read.is_empty()
            && read.cigar_read_len() == read.len()
            && read.has_match_ops();
        if structurally_ok && filter.is_read_ok(read) {
            ctx.active_reads.push(i as u32);
        }
    }
    (batch.len() - ctx.active_reads.len()) as u64
}

#[cfg(test)]
mod tests {
    use rust_htslib::bam::record::Cigar;

    use crate::core::batch::test_utils::read;
    use crate::core::batch::flags;
    use crate::core::genome::INVALID_SEQUENCE;

    use super::*;

    #[test]
    fn by_flags() {
        let dummy = ByFlags::new(0, 3844);
        for (flag, expected) in [(83u16, true), (0u16, true), (4u16, false), (1024u16, false), (2048u16, false)] {
            let mut r = read(0, 0, 0, b"ACGT", 30, vec![Cigar::Match(4)]);
            r.flags = flag;
            assert_eq!(dummy.is_read_ok(&r), expected);
        }

        let dummy = ByFlags::new(flags::PAIRED, 0);
        let mut r = read(0, 0, 0, b"ACGT", 30, vec![Cigar::Match(4)]);
        assert!(!dummy.is_read_ok(&r));
        r.flags = flags::PAIRED | flags::REVERSE;
        assert!(dummy.is_read_ok(&r));
    }

    #[test]
    fn by_quality() {
        let dummy = ByQuality::new(10);
        for (mapq, expected) in [(0, false), (9, false), (10, true), (254, true), (255, false)] {
            let mut r = read(0, 0, 0, b"ACGT", 30, vec![Cigar::Match(4)]);
            r.mapq = mapq;
            assert_eq!(dummy.is_read_ok(&r), expected);
        }
    }

    #[test]
    fn active_list() {
        let mut unmapped = read(0, 0, 0, b"ACGT", 30, vec![Cigar::Match(4)]);
        unmapped.flags = flags::UNMAPPED;
        let mut broken = read(0, 0, 0, b"ACGT", 30, vec![Cigar::Match(3)]);
        broken.malformed = true;
        let unresolved = read(0, INVALID_SEQUENCE, 0, b"ACGT", 30, vec![Cigar::Match(4)]);
        let clipped = read(0, 0, 0, b"ACGT", 30, vec![Cigar::SoftClip(4)]);
        let ok = read(0, 0, 0, b"ACGT", 30, vec![Cigar::Match(4)]);

        let batch = AlignmentBatch::new(vec![unmapped, broken, unresolved, clipped, ok]);
        let mut ctx = BatchContext::new();
        ctx.reset(&batch);

        let dropped = filter_batch(&batch, &mut ctx, &ByFlags::new(0, 3844));
        assert_eq!(ctx.active_reads, vec![4]);
        assert_eq!(dropped, 4);
    }

    #[test]
    fn sequential_consults_both() {
        let mut first = MockReadFilter::new();
        first.expect_is_read_ok().once().return_const(true);
        let mut second = MockReadFilter::new();
        second.expect_is_read_ok().once().return_const(false);

        let r = read(0, 0, 0, b"ACGT", 30, vec![Cigar::Match(4)]);
        assert!(!Sequential::new(first, second).is_read_ok(&r));
    }
}
