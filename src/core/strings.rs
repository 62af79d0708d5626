use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::Hasher;

/// Tracks string identifiers (read groups, sequence names) as dense u32 ids.
/// Ids are insertion indices and stay stable for the lifetime of the
/// database. Hash collisions are resolved by comparing the stored strings.
#[derive(Default, Clone, Debug)]
pub struct StringDatabase {
    strings: Vec<String>,
    buckets: HashMap<u64, Vec<u32>>,
}

impl StringDatabase {
    /// Inserts a string, returning the new id. Returns the existing id if
    /// the string is already present.
    pub fn insert(&mut self, string: &str) -> u32 {
        if let Some(id) = self.id_of(string) {
            return id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(string.to_owned());
        self.buckets.entry(Self::hash(string)).or_default().push(id);
        id
    }

    pub fn id_of(&self, string: &str) -> Option<u32> {
        self.buckets
            .get(&Self::hash(string))?
            .iter()
            .copied()
            .find(|&id| self.strings[id as usize] == string)
    }

    pub fn name(&self, id: u32) -> &str {
        &self.strings[id as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(|x| x.as_str())
    }

    fn hash(string: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write(string.as_bytes());
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut db = StringDatabase::default();
        for (ind, name) in ["rg1", "rg2", "", "chr1", "a very long read group identifier"].iter().enumerate() {
            let id = db.insert(name);
            assert_eq!(id, ind as u32);
            assert_eq!(db.name(id), *name);
            assert_eq!(db.id_of(name), Some(id));
        }
        assert_eq!(db.len(), 5);
    }

    #[test]
    fn idempotent_insert() {
        let mut db = StringDatabase::default();
        let first = db.insert("rg1");
        db.insert("rg2");
        assert_eq!(db.insert("rg1"), first);
        assert_eq!(db.len(), 2);
    }

    #[test]
    fn missing_lookup() {
        let mut db = StringDatabase::default();
        db.insert("rg1");
        assert_eq!(db.id_of("rg2"), None);
    }
}
