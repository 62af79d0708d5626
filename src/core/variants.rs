use bio_types::genome::Position;

/// Known variant sites as half-open intervals in global reference
/// coordinates, sorted by start. Overlapping intervals are permitted; the
/// widest interval length is kept so point queries can bound how far back
/// from the binary-search partition they must walk.
#[derive(Default, Clone)]
pub struct VariantDatabase {
    starts: Vec<Position>,
    ends: Vec<Position>,
    max_len: Position,
}

impl VariantDatabase {
    pub fn from_intervals(mut intervals: Vec<(Position, Position)>) -> Self {
        intervals.sort_unstable();
        let max_len = intervals.iter().map(|&(start, end)| end.saturating_sub(start)).max().unwrap_or(0);
        let (starts, ends) = intervals.into_iter().unzip();
        VariantDatabase { starts, ends, max_len }
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// True if any known variant interval covers the given position.
    pub fn covers(&self, pos: Position) -> bool {
        let pivot = self.starts.partition_point(|&start| start <= pos);
        for i in (0..pivot).rev() {
            if self.starts[i] + self.max_len <= pos {
                return false;
            }
            if self.ends[i] > pos {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_queries() {
        let db = VariantDatabase::from_intervals(vec![(3, 4), (10, 13), (11, 12)]);
        for (pos, expected) in [(0, false), (2, false), (3, true), (4, false), (10, true), (12, true), (13, false)] {
            assert_eq!(db.covers(pos), expected, "position {}", pos);
        }
    }

    #[test]
    fn straddling_interval() {
        // a long interval followed by short ones must still be found
        let db = VariantDatabase::from_intervals(vec![(0, 100), (50, 51), (60, 61)]);
        assert!(db.covers(99));
        assert!(db.covers(55));
        assert!(!db.covers(100));
    }

    #[test]
    fn empty() {
        let db = VariantDatabase::default();
        assert!(!db.covers(0));
        assert!(db.is_empty());
    }
}
