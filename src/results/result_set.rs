use std::collections::HashMap;
use std::sync::Arc;

use super::row::{Db2Row, index_cache};
use crate::types::Value;

/// Rows read from one result set.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub results: Vec<Db2Row>,
    /// Number of rows added.
    pub rows_affected: usize,
    column_names: Option<Arc<Vec<String>>>,
    column_index_cache: Option<Arc<HashMap<String, Vec<usize>>>>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            ..ResultSet::default()
        }
    }

    /// Set the labels shared by all rows added afterwards.
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index_cache = Some(Arc::new(index_cache(&column_names)));
        self.column_names = Some(column_names);
    }

    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Append a row; ignored until column names are set.
    pub fn add_row_values(&mut self, values: Vec<Value>) {
        let (Some(column_names), Some(cache)) = (&self.column_names, &self.column_index_cache) else {
            return;
        };
        self.results
            .push(Db2Row::with_cache(Arc::clone(column_names), values, Arc::clone(cache)));
        self.rows_affected += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_labels_and_rotate_duplicates() {
        let mut rs = ResultSet::with_capacity(2);
        rs.add_row_values(vec![Value::Int32(0)]);
        assert!(rs.is_empty());

        rs.set_column_names(Arc::new(vec!["ID".into(), "NOTE".into(), "ID".into()]));
        rs.add_row_values(vec![Value::Int32(1), Value::from("a"), Value::Int32(2)]);
        assert_eq!(rs.len(), 1);
        assert_eq!(rs.rows_affected, 1);

        let row = &rs.results[0];
        assert_eq!(row.get("id"), Some(&Value::Int32(1)));
        assert_eq!(row.get("Note").and_then(Value::as_text), Some("a"));
        assert_eq!(row.get("ID"), Some(&Value::Int32(2)));
        assert_eq!(row.get("id"), Some(&Value::Int32(1)));
        assert_eq!(row.get_by_index(2), Some(&Value::Int32(2)));
        assert!(row.get("missing").is_none());
    }
}
