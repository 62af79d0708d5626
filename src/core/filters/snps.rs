use crate::core::batch::AlignmentBatch;
use crate::core::context::BatchContext;
use crate::core::genome::ReferenceGenome;
use crate::core::variants::VariantDatabase;

/// Clears the active bit of every base whose reference position overlaps a
/// known variant. Masked bases are invisible to covariate gathering and to
/// mismatch counting.
pub fn mask_known_sites(
    batch: &AlignmentBatch,
    ctx: &mut BatchContext,
    genome: &ReferenceGenome,
    variants: &VariantDatabase,
) {
    if variants.is_empty() {
        return;
    }
    for i in 0..ctx.active_reads.len() {
        let read = ctx.active_reads[i];
        let record = &batch.reads[read as usize];
        let start = genome.global_pos(record.sequence_id, record.alignment_start);
        let range = ctx.read_bases(read);
        for base in range {
            if ctx.active_locations[base] && variants.covers(start + ctx.read_offsets[base] as u64) {
                ctx.active_locations.set(base, false);
            }
        }
    }
}
