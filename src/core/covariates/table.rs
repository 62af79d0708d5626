use derive_more::{Add, AddAssign};

use super::chain::CovariateKey;

#[derive(Clone, Copy, Default, PartialEq, Debug, Add, AddAssign)]
pub struct CovariateValue {
    pub observations: u64,
    /// Fractional-error accounting yields non-integer error mass.
    pub mismatches: f64,
}

/// Sorted, unique-key accumulator mapping covariate keys to observation and
/// mismatch counts. Built per batch from raw records, then merged into the
/// process-global table in batch order.
#[derive(Clone, Default, Debug)]
pub struct CovariateTable {
    keys: Vec<CovariateKey>,
    values: Vec<CovariateValue>,
}

impl CovariateTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sorts records by key and reduces equal keys: one observation per
    /// record, error masses summed in sort order.
    pub fn from_records(mut records: Vec<(CovariateKey, f64)>) -> Self {
        records.sort_unstable_by_key(|&(key, _)| key);

        let mut table = CovariateTable::new();
        for (key, errors) in records {
            match table.keys.last() {
                Some(&last) if last == key => {
                    let value = table.values.last_mut().unwrap();
                    value.observations += 1;
                    value.mismatches += errors;
                }
                _ => {
                    table.keys.push(key);
                    table.values.push(CovariateValue { observations: 1, mismatches: errors });
                }
            }
        }
        table
    }

    /// Linear merge-by-key; entries on equal keys are summed.
    pub fn merge(&mut self, other: &CovariateTable) {
        if other.is_empty() {
            return;
        }
        let mut keys = Vec::with_capacity(self.len() + other.len());
        let mut values = Vec::with_capacity(self.len() + other.len());

        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            if self.keys[i] < other.keys[j] {
                keys.push(self.keys[i]);
                values.push(self.values[i]);
                i += 1;
            } else if self.keys[i] > other.keys[j] {
                keys.push(other.keys[j]);
                values.push(other.values[j]);
                j += 1;
            } else {
                keys.push(self.keys[i]);
                values.push(self.values[i] + other.values[j]);
                i += 1;
                j += 1;
            }
        }
        keys.extend_from_slice(&self.keys[i..]);
        values.extend_from_slice(&self.values[i..]);
        keys.extend_from_slice(&other.keys[j..]);
        values.extend_from_slice(&other.values[j..]);

        self.keys = keys;
        self.values = values;
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, key: CovariateKey) -> Option<&CovariateValue> {
        self.keys.binary_search(&key).ok().map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (CovariateKey, &CovariateValue)> {
        self.keys.iter().copied().zip(self.values.iter())
    }
}
