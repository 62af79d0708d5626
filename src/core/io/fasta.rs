use std::path::Path;

use rust_htslib::faidx;

use crate::core::error::{Error, Result};
use crate::core::genome::ReferenceGenome;

/// Loads every contig of an indexed FASTA into the packed genome store.
pub fn load(path: &Path) -> Result<ReferenceGenome> {
    let reader = faidx::Reader::from_path(path).map_err(|x| Error::input(path, x))?;

    let mut genome = ReferenceGenome::new();
    for i in 0..reader.n_seqs() {
        let name = reader.seq_name(i as i64).map_err(|x| Error::input(path, x))?;
        // htslib clamps the window to the contig end
        let sequence = reader.fetch_seq(&name, 0, i32::MAX as usize - 2).map_err(|x| Error::input(path, x))?;
        genome.add_sequence(&name, sequence);
    }

    if genome.num_sequences() == 0 {
        return Err(Error::input(path, "reference contains no sequences"));
    }
    Ok(genome)
}
