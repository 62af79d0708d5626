use std::path::Path;

use bio_types::genome::Position;
use rust_htslib::bcf::{Read, Reader};

use crate::core::error::{Error, Result};
use crate::core::genome::ReferenceGenome;
use crate::core::variants::VariantDatabase;

/// Loads known variant sites from one or more VCFs into a single interval
/// index in global reference coordinates. A site spans its reference allele:
/// `[pos, pos + ref_len)`.
pub fn load(paths: &[impl AsRef<Path>], genome: &ReferenceGenome) -> Result<VariantDatabase> {
    let mut intervals = Vec::new();
    for path in paths {
        collect(path.as_ref(), genome, &mut intervals)?;
    }
    Ok(VariantDatabase::from_intervals(intervals))
}

fn collect(path: &Path, genome: &ReferenceGenome, intervals: &mut Vec<(Position, Position)>) -> Result<()> {
    let mut reader = Reader::from_path(path).map_err(|x| Error::input(path, x))?;

    // map VCF contig ids onto genome sequence ids upfront
    let rid2seq: Vec<u32> = {
        let header = reader.header();
        (0..header.contig_count())
            .map(|rid| {
                let name = header.rid2name(rid).map_err(|x| Error::input(path, x))?;
                let name = std::str::from_utf8(name).map_err(|x| Error::input(path, x))?;
                genome
                    .sequence_id(name)
                    .ok_or_else(|| Error::input(path, format!("contig {} is absent from the reference", name)))
            })
            .collect::<Result<_>>()?
    };

    let mut record = reader.empty_record();
    while let Some(result) = reader.read(&mut record) {
        result.map_err(|x| Error::input(path, x))?;

        let rid = match record.rid() {
            Some(rid) => rid as usize,
            None => continue,
        };
        if record.pos() < 0 {
            continue;
        }
        let sequence = rid2seq[rid];
        let pos = record.pos() as Position;
        let ref_len = record.alleles().first().map_or(1, |x| x.len().max(1)) as Position;
        let end = (pos + ref_len).min(genome.sequence_len(sequence));
        if pos >= end {
            continue;
        }
        intervals.push((genome.global_pos(sequence, pos), genome.global_pos(sequence, end)));
    }
    Ok(())
}
