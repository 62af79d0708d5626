use std::ops::Range;

use bio_types::genome::Position;
use bitvec::vec::BitVec;

use crate::core::batch::AlignmentBatch;
use crate::core::cigar::CigarEvent;

/// Inclusive reference window; `start > end` means the read never touched
/// the reference (and must not survive filtering).
pub type Window = (Position, Position);

pub const EMPTY_WINDOW: Window = (Position::MAX, 0);

#[inline]
pub fn window_is_empty(window: Window) -> bool {
    window.0 > window.1
}

/// A deletion consumes reference but no read bases, so it cannot live in the
/// per-base event stream; deletions are carried separately for the
/// fractional-error stage.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DeletionEvent {
    pub read: u32,
    /// Read cursor at the deletion: the index of the first base after it.
    pub cursor: u32,
    pub len: u32,
}

/// Mutable per-batch scratch owned by the pipeline driver. Buffers grow to
/// the largest batch seen and are retained across batches.
#[derive(Default)]
pub struct BatchContext {
    /// Read indices surviving the filter stage, strictly increasing.
    pub active_reads: Vec<u32>,
    /// Start of each read's slice in the per-base streams, plus a sentinel.
    pub base_offsets: Vec<u32>,
    /// Per-read alignment window in global reference coordinates.
    pub alignment_windows: Vec<Window>,
    /// The same window in local (per-sequence) coordinates.
    pub sequence_windows: Vec<Window>,
    /// One event per read base (Match/Insertion/SoftClip).
    pub events: Vec<CigarEvent>,
    /// Per-base offset into the reference, relative to the alignment start.
    pub read_offsets: Vec<u16>,
    pub deletions: Vec<DeletionEvent>,
    /// Per-base "contributes to covariates" bits.
    pub active_locations: BitVec,
    /// Per-base quality after BAQ; seeded with the reported qualities.
    pub baq_quals: Vec<u8>,
    /// Per-base error mass assigned by the fractional-error stage.
    pub fractional_errors: Vec<f64>,
}

impl BatchContext {
    pub fn new() -> Self {
        Default::default()
    }

    /// Rebinds the context to a new batch, reusing allocations.
    pub fn reset(&mut self, batch: &AlignmentBatch) {
        self.active_reads.clear();
        self.deletions.clear();

        self.base_offsets.clear();
        self.base_offsets.reserve(batch.len() + 1);
        let mut total = 0u32;
        self.base_offsets.push(0);
        for read in &batch.reads {
            total += read.len() as u32;
            self.base_offsets.push(total);
        }
        let total = total as usize;

        self.alignment_windows.clear();
        self.alignment_windows.resize(batch.len(), EMPTY_WINDOW);
        self.sequence_windows.clear();
        self.sequence_windows.resize(batch.len(), EMPTY_WINDOW);

        self.events.clear();
        self.events.resize(total, CigarEvent::SoftClip);
        self.read_offsets.clear();
        self.read_offsets.resize(total, 0);
        self.active_locations.clear();
        self.active_locations.resize(total, false);
        self.fractional_errors.clear();
        self.fractional_errors.resize(total, 0.0);

        self.baq_quals.clear();
        self.baq_quals.reserve(total);
        for read in &batch.reads {
            self.baq_quals.extend_from_slice(&read.quals);
        }
    }

    /// Range of the given read's bases within the per-base streams.
    #[inline]
    pub fn read_bases(&self, read: u32) -> Range<usize> {
        self.base_offsets[read as usize] as usize..self.base_offsets[read as usize + 1] as usize
    }
}
