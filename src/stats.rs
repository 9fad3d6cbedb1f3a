use std::collections::BTreeMap;

/// Running sum and count for one group.
#[derive(Debug, Default, Clone, Copy)]
struct MeanCell {
    sum: f64,
    count: usize,
}

/// Accumulates values per key and reports the arithmetic mean of each group.
///
/// Keys come out sorted, which keeps every written artifact deterministic.
#[derive(Debug, Clone)]
pub struct GroupedMean<K: Ord> {
    cells: BTreeMap<K, MeanCell>,
}

impl<K: Ord> Default for GroupedMean<K> {
    fn default() -> Self {
        Self {
            cells: BTreeMap::new(),
        }
    }
}

impl<K: Ord> GroupedMean<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, value: f64) {
        let cell = self.cells.entry(key).or_default();
        cell.sum += value;
        cell.count += 1;
    }

    pub fn finish(self) -> BTreeMap<K, f64> {
        self.cells
            .into_iter()
            .map(|(k, c)| (k, c.sum / c.count as f64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_groups() {
        let acc: GroupedMean<u32> = GroupedMean::new();
        assert!(acc.finish().is_empty());
    }

    #[test]
    fn test_means_per_key() {
        let mut acc = GroupedMean::new();
        acc.add(5, 10.0);
        acc.add(5, 20.0);
        acc.add(1, 7.0);

        let means = acc.finish();
        assert_eq!(means.len(), 2);
        assert_eq!(means[&5], 15.0);
        assert_eq!(means[&1], 7.0);
    }

    #[test]
    fn test_keys_come_out_sorted() {
        let mut acc = GroupedMean::new();
        for k in [3, 1, 2] {
            acc.add(k, 1.0);
        }
        let keys: Vec<_> = acc.finish().into_keys().collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }
}
