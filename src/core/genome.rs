use std::ops::Range;

use bio_types::genome::Position;

use crate::core::dna::{Nucleotide, PackedSequence};
use crate::core::strings::StringDatabase;

/// Sequence id assigned to reads whose reference name is absent from the
/// loaded genome; such reads are dropped by the read filter with a counter.
pub const INVALID_SEQUENCE: u32 = u32::MAX;

/// The reference genome as one packed base store plus per-sequence offsets
/// into it. Positions come in two flavors: local (0-based within one
/// sequence) and global (0-based within the concatenation); both directions
/// of the mapping are needed by the pipeline.
#[derive(Clone)]
pub struct ReferenceGenome {
    names: StringDatabase,
    bases: PackedSequence,
    // start offset of each sequence, plus the total length as a sentinel
    offsets: Vec<Position>,
}

impl ReferenceGenome {
    pub fn new() -> Self {
        ReferenceGenome { names: StringDatabase::default(), bases: PackedSequence::new(), offsets: vec![0] }
    }

    pub fn add_sequence(&mut self, name: &str, sequence: &[u8]) -> u32 {
        let id = self.names.insert(name);
        debug_assert_eq!(id as usize, self.offsets.len() - 1, "sequences must be added once, in order");
        self.bases.extend_from_ascii(sequence);
        self.offsets.push(self.bases.len() as Position);
        id
    }

    pub fn names(&self) -> &StringDatabase {
        &self.names
    }

    pub fn sequence_id(&self, name: &str) -> Option<u32> {
        self.names.id_of(name)
    }

    pub fn num_sequences(&self) -> usize {
        self.names.len()
    }

    pub fn sequence_len(&self, id: u32) -> Position {
        self.offsets[id as usize + 1] - self.offsets[id as usize]
    }

    pub fn sequence_range(&self, id: u32) -> Range<Position> {
        self.offsets[id as usize]..self.offsets[id as usize + 1]
    }

    #[inline]
    pub fn global_pos(&self, id: u32, local: Position) -> Position {
        self.offsets[id as usize] + local
    }

    pub fn local_pos(&self, global: Position) -> (u32, Position) {
        debug_assert!(global < *self.offsets.last().unwrap());
        let id = self.offsets.partition_point(|&x| x <= global) - 1;
        (id as u32, global - self.offsets[id])
    }

    #[inline]
    pub fn base(&self, global: Position) -> Nucleotide {
        self.bases.get(global as usize)
    }

    pub fn total_len(&self) -> Position {
        *self.offsets.last().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genome() -> ReferenceGenome {
        let mut genome = ReferenceGenome::new();
        genome.add_sequence("chr1", b"ACGTACGT");
        genome.add_sequence("chr2", b"TTTT");
        genome.add_sequence("chr3", b"GGGGGGGGGG");
        genome
    }

    #[test]
    fn coordinates() {
        let genome = genome();
        assert_eq!(genome.num_sequences(), 3);
        assert_eq!(genome.sequence_id("chr2"), Some(1));
        assert_eq!(genome.sequence_id("chrM"), None);

        assert_eq!(genome.global_pos(0, 3), 3);
        assert_eq!(genome.global_pos(1, 0), 8);
        assert_eq!(genome.global_pos(2, 9), 21);

        assert_eq!(genome.local_pos(3), (0, 3));
        assert_eq!(genome.local_pos(8), (1, 0));
        assert_eq!(genome.local_pos(21), (2, 9));
    }

    #[test]
    fn bases() {
        let genome = genome();
        assert_eq!(genome.base(0), Nucleotide::A);
        assert_eq!(genome.base(8), Nucleotide::T);
        assert_eq!(genome.base(12), Nucleotide::G);
        assert_eq!(genome.sequence_len(1), 4);
        assert_eq!(genome.total_len(), 22);
    }
}
