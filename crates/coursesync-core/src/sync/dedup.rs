//! Key-based deduplication of rows gathered across fan-out fetches.

use std::collections::HashMap;
use std::hash::Hash;

/// Rows keyed by natural key, in first-seen order.
///
/// Pushing a key again replaces the earlier row in place, which matches what a
/// sequence of overwriting upserts would leave behind.
pub(crate) struct KeyedRows<K, T> {
    index: HashMap<K, usize>,
    rows: Vec<T>,
}

impl<K: Eq + Hash, T> KeyedRows<K, T> {
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, key: K, row: T) {
        match self.index.get(&key) {
            Some(&i) => self.rows[i] = row,
            None => {
                self.index.insert(key, self.rows.len());
                self.rows.push(row);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn into_rows(self) -> Vec<T> {
        self.rows
    }
}
