use bio_types::genome::Position;

use crate::core::batch::AlignmentBatch;
use crate::core::cigar::CigarEvent;
use crate::core::context::BatchContext;
use crate::core::genome::ReferenceGenome;

/// Assigns per-base error mass: 1.0 on every mismatching Match base, and
/// 1.0 per indel event split evenly across the read bases flanking it.
pub fn assign_errors(batch: &AlignmentBatch, ctx: &mut BatchContext, genome: &ReferenceGenome) {
    for i in 0..ctx.active_reads.len() {
        let read = ctx.active_reads[i];
        let record = &batch.reads[read as usize];
        let range = ctx.read_bases(read);
        let start = genome.global_pos(record.sequence_id, record.alignment_start);

        for base in range.clone() {
            if ctx.events[base] == CigarEvent::Match
                && genome.base(start + ctx.read_offsets[base] as Position) != record.bases.get(base - range.start)
            {
                ctx.fractional_errors[base] += 1.0;
            }
        }

        // each insertion run is one event
        let mut base = range.start;
        while base < range.end {
            if ctx.events[base] != CigarEvent::Insertion {
                base += 1;
                continue;
            }
            let run = base;
            while base < range.end && ctx.events[base] == CigarEvent::Insertion {
                base += 1;
            }
            let before = if run > range.start { Some(run - 1) } else { None };
            let after = if base < range.end { Some(base) } else { None };
            distribute(&mut ctx.fractional_errors, before, after);
        }
    }

    for i in 0..ctx.deletions.len() {
        let deletion = ctx.deletions[i];
        let range = ctx.read_bases(deletion.read);
        let cursor = range.start + deletion.cursor as usize;
        let before = if deletion.cursor > 0 { Some(cursor - 1) } else { None };
        let after = if cursor < range.end { Some(cursor) } else { None };
        distribute(&mut ctx.fractional_errors, before, after);
    }
}

fn distribute(errors: &mut [f64], before: Option<usize>, after: Option<usize>) {
    let share = 1.0 / (before.is_some() as u8 + after.is_some() as u8).max(1) as f64;
    for flank in before.into_iter().chain(after) {
        errors[flank] += share;
    }
}
