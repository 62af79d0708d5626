pub type CovariateKey = u64;

/// The covariates a chain can carry. Each one is an observable attribute of
/// a single read base.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Covariate {
    ReadGroup,
    QualityScore,
    Cycle,
    Context,
    EventType,
}

pub const READ_GROUP_BITS: u32 = 16;
pub const QUALITY_BITS: u32 = 6;
pub const CYCLE_BITS: u32 = 10;
pub const CONTEXT_BITS: u32 = 12;
pub const EVENT_BITS: u32 = 2;

#[derive(Clone, Copy, Debug)]
pub struct FieldDescriptor {
    pub covariate: Covariate,
    pub bits: u32,
}

/// Which recalibration table a chain feeds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChainKind {
    Quality,
    Cycle,
    Context,
}

/// A chain of bit-field descriptors packed LSB-first into one 64-bit key.
/// Decoding consults the descriptor table, so adding a covariate is a matter
/// of declaring its width and encoder.
#[derive(Clone, Debug)]
pub struct CovariateChain {
    kind: ChainKind,
    fields: Vec<FieldDescriptor>,
}

impl CovariateChain {
    /// (ReadGroup, QualityScore, EventType) — feeds RecalTable1.
    pub fn quality() -> Self {
        CovariateChain {
            kind: ChainKind::Quality,
            fields: vec![
                FieldDescriptor { covariate: Covariate::ReadGroup, bits: READ_GROUP_BITS },
                FieldDescriptor { covariate: Covariate::QualityScore, bits: QUALITY_BITS },
                FieldDescriptor { covariate: Covariate::EventType, bits: EVENT_BITS },
            ],
        }
    }

    /// (ReadGroup, QualityScore, Cycle, EventType) — feeds RecalTable2.
    pub fn cycle() -> Self {
        CovariateChain {
            kind: ChainKind::Cycle,
            fields: vec![
                FieldDescriptor { covariate: Covariate::ReadGroup, bits: READ_GROUP_BITS },
                FieldDescriptor { covariate: Covariate::QualityScore, bits: QUALITY_BITS },
                FieldDescriptor { covariate: Covariate::Cycle, bits: CYCLE_BITS },
                FieldDescriptor { covariate: Covariate::EventType, bits: EVENT_BITS },
            ],
        }
    }

    /// (ReadGroup, QualityScore, Context, EventType) — feeds RecalTable2.
    pub fn context() -> Self {
        CovariateChain {
            kind: ChainKind::Context,
            fields: vec![
                FieldDescriptor { covariate: Covariate::ReadGroup, bits: READ_GROUP_BITS },
                FieldDescriptor { covariate: Covariate::QualityScore, bits: QUALITY_BITS },
                FieldDescriptor { covariate: Covariate::Context, bits: CONTEXT_BITS },
                FieldDescriptor { covariate: Covariate::EventType, bits: EVENT_BITS },
            ],
        }
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn contains(&self, covariate: Covariate) -> bool {
        self.fields.iter().any(|f| f.covariate == covariate)
    }

    /// The optional covariate a RecalTable2-style chain reports, if any.
    pub fn target(&self) -> Option<Covariate> {
        match self.kind {
            ChainKind::Quality => None,
            ChainKind::Cycle => Some(Covariate::Cycle),
            ChainKind::Context => Some(Covariate::Context),
        }
    }

    /// Packs field values (in chain order) into a key, LSB-first.
    pub fn encode(&self, values: &[u32]) -> CovariateKey {
        debug_assert_eq!(values.len(), self.fields.len());
        let mut key = 0u64;
        let mut shift = 0;
        for (field, &value) in self.fields.iter().zip(values) {
            debug_assert!(value < 1 << field.bits, "{:?} value {} exceeds {} bits", field.covariate, value, field.bits);
            key |= (value as u64) << shift;
            shift += field.bits;
        }
        key
    }

    /// Recovers one field's value from a key.
    pub fn decode(&self, key: CovariateKey, covariate: Covariate) -> u32 {
        let (shift, bits) = self.locate(covariate);
        ((key >> shift) & ((1 << bits) - 1)) as u32
    }

    /// Zeroes one field, collapsing keys along that covariate axis.
    pub fn mask_out(&self, key: CovariateKey, covariate: Covariate) -> CovariateKey {
        let (shift, bits) = self.locate(covariate);
        key & !(((1u64 << bits) - 1) << shift)
    }

    fn locate(&self, covariate: Covariate) -> (u32, u32) {
        let mut shift = 0;
        for field in &self.fields {
            if field.covariate == covariate {
                return (shift, field.bits);
            }
            shift += field.bits;
        }
        panic!("covariate {:?} is not part of this chain", covariate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for chain in [CovariateChain::quality(), CovariateChain::cycle(), CovariateChain::context()] {
            let values: Vec<u32> =
                chain.fields().iter().map(|f| (1u32 << f.bits) - 1 - (f.bits % 3)).collect();
            let key = chain.encode(&values);
            for (field, &value) in chain.fields().iter().zip(&values) {
                assert_eq!(chain.decode(key, field.covariate), value, "{:?}", field.covariate);
            }
        }
    }

    #[test]
    fn zero_values() {
        let chain = CovariateChain::context();
        let key = chain.encode(&[0, 0, 0, 0]);
        assert_eq!(key, 0);
        assert_eq!(chain.decode(key, Covariate::Context), 0);
    }

    #[test]
    fn mask_out_collapses_axis() {
        let chain = CovariateChain::quality();
        let a = chain.encode(&[7, 30, 1]);
        let b = chain.encode(&[7, 45, 1]);
        assert_ne!(a, b);
        assert_eq!(chain.mask_out(a, Covariate::QualityScore), chain.mask_out(b, Covariate::QualityScore));
        assert_eq!(chain.decode(chain.mask_out(a, Covariate::QualityScore), Covariate::ReadGroup), 7);
        assert_eq!(chain.decode(chain.mask_out(a, Covariate::QualityScore), Covariate::EventType), 1);
    }

    #[test]
    fn canonical_order_is_msb_last() {
        // later fields occupy higher bits, so keys sort by the last field first
        let chain = CovariateChain::quality();
        assert!(chain.encode(&[0, 63, 0]) < chain.encode(&[0, 0, 1]));
    }
}
