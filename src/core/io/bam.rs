use std::path::{Path, PathBuf};

use bio_types::genome::Position;
use rust_htslib::bam;
use rust_htslib::bam::record::Aux;
use rust_htslib::bam::Read;

use crate::core::batch::{AlignmentBatch, ReadRecord};
use crate::core::dna::PackedSequence;
use crate::core::error::{Error, Result};
use crate::core::genome::{ReferenceGenome, INVALID_SEQUENCE};
use crate::core::strings::StringDatabase;

/// Read group assigned to records carrying no RG tag.
const UNKNOWN_READ_GROUP: &str = "unknown";

/// Streams fixed-size batches of reads out of a BAM. Reference names are
/// resolved against the loaded genome once, from the header; reads on
/// sequences the reference does not carry keep INVALID_SEQUENCE and are
/// dropped downstream with a counter.
pub struct BatchReader {
    path: PathBuf,
    reader: bam::Reader,
    tid2seq: Vec<u32>,
    batch_size: usize,
    record: bam::Record,
}

impl BatchReader {
    pub fn new(path: &Path, genome: &ReferenceGenome, batch_size: usize) -> Result<Self> {
        let reader = bam::Reader::from_path(path).map_err(|x| Error::input(path, x))?;
        let header = reader.header();
        let tid2seq = (0..header.target_count())
            .map(|tid| {
                std::str::from_utf8(header.tid2name(tid))
                    .ok()
                    .and_then(|name| genome.sequence_id(name))
                    .unwrap_or(INVALID_SEQUENCE)
            })
            .collect();

        Ok(BatchReader { path: path.to_owned(), reader, tid2seq, batch_size, record: bam::Record::new() })
    }

    /// Next batch, or None at end of input. Read groups are interned into
    /// the pipeline's database so ids match the ReadGroup covariate.
    pub fn next_batch(&mut self, read_groups: &mut StringDatabase) -> Result<Option<AlignmentBatch>> {
        let mut reads = Vec::with_capacity(self.batch_size);
        while reads.len() < self.batch_size {
            match self.reader.read(&mut self.record) {
                None => break,
                Some(Err(x)) => return Err(Error::input(&self.path, x)),
                Some(Ok(())) => {
                    let read = decode(&self.record, &self.tid2seq, read_groups);
                    reads.push(read);
                }
            }
        }
        if reads.is_empty() {
            Ok(None)
        } else {
            Ok(Some(AlignmentBatch::new(reads)))
        }
    }
}

fn decode(record: &bam::Record, tid2seq: &[u32], read_groups: &mut StringDatabase) -> ReadRecord {
    let read_group = match record.aux(b"RG") {
        Ok(Aux::String(name)) => read_groups.insert(name),
        _ => read_groups.insert(UNKNOWN_READ_GROUP),
    };

    let tid = record.tid();
    let sequence_id = if tid >= 0 && (tid as usize) < tid2seq.len() { tid2seq[tid as usize] } else { INVALID_SEQUENCE };

    let seq = record.seq().as_bytes();
    let quals = record.qual().to_vec();
    let cigar: Vec<_> = record.cigar().iter().cloned().collect();
    let malformed = quals.len() != seq.len();

    ReadRecord {
        read_group,
        sequence_id,
        alignment_start: record.pos().max(0) as Position,
        cigar,
        bases: PackedSequence::from_ascii(&seq),
        quals,
        flags: record.flags(),
        mapq: record.mapq(),
        malformed,
    }
}
