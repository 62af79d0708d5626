pub use reads::{filter_batch, ByFlags, ByQuality, ReadFilter, Sequential};
pub use snps::mask_known_sites;

#[cfg(test)]
pub use reads::MockReadFilter;

mod reads;
mod snps;
