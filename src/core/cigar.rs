use bio_types::genome::Position;
use rust_htslib::bam::record::Cigar;

use crate::core::batch::AlignmentBatch;
use crate::core::context::{window_is_empty, BatchContext, DeletionEvent, EMPTY_WINDOW};
use crate::core::genome::ReferenceGenome;

/// Per-base alignment event. Deletions consume no read base and travel in
/// the parallel deletion stream (`BatchContext::deletions`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CigarEvent {
    Match,
    Insertion,
    Deletion,
    SoftClip,
}

impl CigarEvent {
    pub fn ascii(self) -> char {
        match self {
            CigarEvent::Match => 'M',
            CigarEvent::Insertion => 'I',
            CigarEvent::Deletion => 'D',
            CigarEvent::SoftClip => 'S',
        }
    }
}

/// Expands the CIGAR of every active read into the per-base event stream,
/// reference offsets and alignment windows. Match bases and insertions are
/// marked active; soft clips stay inactive. A read that turns out to touch
/// no reference base (it should have been filtered) is dropped from the
/// active list.
pub fn expand_batch(batch: &AlignmentBatch, ctx: &mut BatchContext, genome: &ReferenceGenome) {
    for i in 0..ctx.active_reads.len() {
        let read = ctx.active_reads[i];
        expand_read(batch, ctx, genome, read);
    }
    let mut active = std::mem::take(&mut ctx.active_reads);
    active.retain(|&read| !window_is_empty(ctx.alignment_windows[read as usize]));
    ctx.active_reads = active;
}

fn expand_read(batch: &AlignmentBatch, ctx: &mut BatchContext, genome: &ReferenceGenome, read: u32) {
    let record = &batch.reads[read as usize];
    let range = ctx.read_bases(read);

    let mut cursor = range.start;
    let mut refpos = record.alignment_start;
    let mut window: (Position, Position) = EMPTY_WINDOW;

    for op in &record.cigar {
        match op {
            Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                window.0 = window.0.min(refpos);
                window.1 = refpos + *len as Position - 1;
                for _ in 0..*len {
                    ctx.events[cursor] = CigarEvent::Match;
                    ctx.read_offsets[cursor] = (refpos - record.alignment_start) as u16;
                    ctx.active_locations.set(cursor, true);
                    refpos += 1;
                    cursor += 1;
                }
            }
            Cigar::Ins(len) => {
                for _ in 0..*len {
                    ctx.events[cursor] = CigarEvent::Insertion;
                    ctx.read_offsets[cursor] = (refpos - record.alignment_start) as u16;
                    ctx.active_locations.set(cursor, true);
                    cursor += 1;
                }
            }
            Cigar::SoftClip(len) => {
                for _ in 0..*len {
                    ctx.events[cursor] = CigarEvent::SoftClip;
                    ctx.read_offsets[cursor] = (refpos - record.alignment_start) as u16;
                    cursor += 1;
                }
            }
            Cigar::Del(len) => {
                ctx.deletions.push(DeletionEvent {
                    read,
                    cursor: (cursor - range.start) as u32,
                    len: *len,
                });
                refpos += *len as Position;
            }
            // splices consume reference without being errors
            Cigar::RefSkip(len) => refpos += *len as Position,
            Cigar::HardClip(_) | Cigar::Pad(_) => {}
        }
    }
    debug_assert_eq!(cursor, range.end, "CIGAR does not cover the read");

    ctx.sequence_windows[read as usize] = window;
    ctx.alignment_windows[read as usize] = if window_is_empty(window) {
        EMPTY_WINDOW
    } else {
        (genome.global_pos(record.sequence_id, window.0), genome.global_pos(record.sequence_id, window.1))
    };
}
