use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::Value;

/// One materialized row.
///
/// Lookups by label ignore case. A label carried by several columns resolves to its
/// occurrences in turn, the same way [`ColumnCatalog::ordinal`](crate::catalog::ColumnCatalog::ordinal)
/// does on a live reader.
#[derive(Debug)]
pub struct Db2Row {
    /// Column labels, shared by every row of the result set.
    pub column_names: Arc<Vec<String>>,
    pub values: Vec<Value>,
    // Upper-cased label -> every ordinal carrying it, ascending.
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, Vec<usize>>>,
    cursor: AtomicUsize,
}

impl Clone for Db2Row {
    fn clone(&self) -> Self {
        Self {
            column_names: Arc::clone(&self.column_names),
            values: self.values.clone(),
            column_index_cache: Arc::clone(&self.column_index_cache),
            cursor: AtomicUsize::new(self.cursor.load(Ordering::Relaxed)),
        }
    }
}

impl Db2Row {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        let cache = Arc::new(index_cache(&column_names));
        Self::with_cache(column_names, values, cache)
    }

    pub(crate) fn with_cache(
        column_names: Arc<Vec<String>>,
        values: Vec<Value>,
        column_index_cache: Arc<HashMap<String, Vec<usize>>>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index_cache,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Ordinal of the next column, from the last match onward and wrapping around,
    /// whose label matches `column_name` ignoring case.
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        let ordinals = self.column_index_cache.get(&column_name.to_uppercase())?;
        let start = self.cursor.load(Ordering::Relaxed);
        let idx = ordinals
            .iter()
            .copied()
            .find(|&i| i >= start)
            .or_else(|| ordinals.first().copied())?;
        self.cursor.store(idx + 1, Ordering::Relaxed);
        Some(idx)
    }

    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&Value> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

pub(crate) fn index_cache(column_names: &[String]) -> HashMap<String, Vec<usize>> {
    let mut cache: HashMap<String, Vec<usize>> = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        cache.entry(name.to_uppercase()).or_default().push(i);
    }
    cache
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(names: &[&str], values: Vec<Value>) -> Db2Row {
        Db2Row::new(Arc::new(names.iter().map(|n| (*n).to_string()).collect()), values)
    }

    #[test]
    fn duplicated_label_steps_through_occurrences() {
        let row = row(&["ID", "ID"], vec![Value::Int32(1), Value::Int32(2)]);
        assert_eq!(row.get("ID"), Some(&Value::Int32(1)));
        assert_eq!(row.get("id"), Some(&Value::Int32(2)));
        assert_eq!(row.get("Id"), Some(&Value::Int32(1)));
    }

    #[test]
    fn unique_label_always_resolves_to_its_column() {
        let row = row(&["A", "B"], vec![Value::Int32(1), Value::Int32(2)]);
        for _ in 0..3 {
            assert_eq!(row.get_column_index("b"), Some(1));
            assert_eq!(row.get_column_index("A"), Some(0));
        }
        assert_eq!(row.get_column_index("C"), None);
    }

    #[test]
    fn clone_keeps_the_lookup_position() {
        let original = row(&["X", "X"], vec![Value::Int32(1), Value::Int32(2)]);
        assert_eq!(original.get_column_index("X"), Some(0));
        let copy = original.clone();
        assert_eq!(copy.get_column_index("X"), Some(1));
        assert_eq!(original.get_column_index("X"), Some(1));
    }
}
