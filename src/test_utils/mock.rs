//! Scripted native driver that records every call it receives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::native::{
    BindTarget, ColumnMetadata, NativeConnection, NativeDriver, NativeError, NativeParam, NativeResult,
    NativeResultSet, NativeStatement, NativeValue, Nullability,
};

/// Native call that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    Connect,
    Prepare,
    Bind,
    ExecuteUpdate,
    ExecuteQuery,
    Commit,
    Rollback,
}

/// One scripted result set.
#[derive(Debug, Clone, Default)]
pub struct MockResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Vec<NativeValue>>,
}

impl MockResult {
    /// Columns given as `(label, native type name)`.
    #[must_use]
    pub fn new(columns: &[(&str, &str)]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|(label, type_name)| ColumnMetadata::new(*label, *type_name, Nullability::Nullable))
                .collect(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn row(mut self, values: Vec<NativeValue>) -> Self {
        self.rows.push(values);
        self
    }
}

/// Everything the driver has seen.
#[derive(Debug, Default)]
pub struct MockState {
    pub connection_strings: Vec<String>,
    pub prepared: Vec<String>,
    /// `(statement text, target, value)` per bind.
    pub binds: Vec<(String, BindTarget, NativeParam)>,
    pub timeouts: Vec<u32>,
    pub auto_commit: Vec<bool>,
    pub isolation: Vec<i32>,
    pub commits: usize,
    pub rollbacks: usize,
    pub statements_closed: usize,
    pub result_sets_closed: usize,
    pub connection_closed: bool,
    /// Result sets per executed query, consumed in order.
    queries: VecDeque<Vec<MockResult>>,
    update_counts: VecDeque<u64>,
    failures: Vec<(MockOp, NativeError)>,
}

impl MockState {
    fn take_failure(&mut self, op: MockOp) -> NativeResult<()> {
        match self.failures.iter().position(|(o, _)| *o == op) {
            Some(idx) => Err(self.failures.remove(idx).1),
            None => Ok(()),
        }
    }

    /// Binds made against statements whose text equals `sql`.
    #[must_use]
    pub fn binds_for(&self, sql: &str) -> Vec<(BindTarget, NativeParam)> {
        self.binds
            .iter()
            .filter(|(text, _, _)| text == sql)
            .map(|(_, target, param)| (target.clone(), param.clone()))
            .collect()
    }
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Handle used by tests to script the driver and inspect what it recorded.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Shared,
}

impl MockDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection sharing this driver's state.
    #[must_use]
    pub fn connection(&self) -> Box<dyn NativeConnection> {
        Box::new(MockConnection {
            state: Arc::clone(&self.state),
        })
    }

    /// Queue the result sets of the next executed query.
    pub fn queue_query(&self, results: Vec<MockResult>) {
        lock(&self.state).queries.push_back(results);
    }

    /// Queue the row count of the next executed update; unqueued updates report 1.
    pub fn queue_update_count(&self, count: u64) {
        lock(&self.state).update_counts.push_back(count);
    }

    /// Make the next `op` call fail with `error`.
    pub fn fail_next(&self, op: MockOp, error: NativeError) {
        lock(&self.state).failures.push((op, error));
    }

    /// Inspect the recorded state.
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }
}

#[async_trait]
impl NativeDriver for MockDriver {
    async fn connect(&self, connection_string: &str) -> NativeResult<Box<dyn NativeConnection>> {
        {
            let mut state = lock(&self.state);
            state.take_failure(MockOp::Connect)?;
            state.connection_strings.push(connection_string.to_string());
        }
        Ok(self.connection())
    }
}

pub struct MockConnection {
    state: Shared,
}

#[async_trait]
impl NativeConnection for MockConnection {
    async fn prepare(&mut self, sql: &str) -> NativeResult<Box<dyn NativeStatement>> {
        let mut state = lock(&self.state);
        state.take_failure(MockOp::Prepare)?;
        state.prepared.push(sql.to_string());
        Ok(Box::new(MockStatement {
            sql: sql.to_string(),
            state: Arc::clone(&self.state),
            remaining: VecDeque::new(),
        }))
    }

    async fn set_auto_commit(&mut self, auto_commit: bool) -> NativeResult<()> {
        lock(&self.state).auto_commit.push(auto_commit);
        Ok(())
    }

    async fn set_transaction_isolation(&mut self, level: i32) -> NativeResult<()> {
        lock(&self.state).isolation.push(level);
        Ok(())
    }

    async fn commit(&mut self) -> NativeResult<()> {
        let mut state = lock(&self.state);
        state.commits += 1;
        state.take_failure(MockOp::Commit)
    }

    async fn rollback(&mut self) -> NativeResult<()> {
        let mut state = lock(&self.state);
        state.rollbacks += 1;
        state.take_failure(MockOp::Rollback)
    }

    async fn close(&mut self) -> NativeResult<()> {
        lock(&self.state).connection_closed = true;
        Ok(())
    }
}

pub struct MockStatement {
    sql: String,
    state: Shared,
    remaining: VecDeque<MockResult>,
}

impl MockStatement {
    fn result_set(&self, result: MockResult) -> Box<dyn NativeResultSet> {
        Box::new(MockResultSet {
            result,
            current: None,
            state: Arc::clone(&self.state),
        })
    }
}

#[async_trait]
impl NativeStatement for MockStatement {
    fn bind(&mut self, target: &BindTarget, param: NativeParam) -> NativeResult<()> {
        let mut state = lock(&self.state);
        state.take_failure(MockOp::Bind)?;
        state.binds.push((self.sql.clone(), target.clone(), param));
        Ok(())
    }

    fn set_query_timeout(&mut self, seconds: u32) -> NativeResult<()> {
        lock(&self.state).timeouts.push(seconds);
        Ok(())
    }

    async fn execute_update(&mut self) -> NativeResult<u64> {
        let mut state = lock(&self.state);
        state.take_failure(MockOp::ExecuteUpdate)?;
        Ok(state.update_counts.pop_front().unwrap_or(1))
    }

    async fn execute_query(&mut self) -> NativeResult<Box<dyn NativeResultSet>> {
        let scripted = {
            let mut state = lock(&self.state);
            state.take_failure(MockOp::ExecuteQuery)?;
            state.queries.pop_front().unwrap_or_default()
        };
        self.remaining = scripted.into();
        let first = self.remaining.pop_front().unwrap_or_default();
        Ok(self.result_set(first))
    }

    async fn more_results(&mut self) -> NativeResult<Option<Box<dyn NativeResultSet>>> {
        Ok(self.remaining.pop_front().map(|result| self.result_set(result)))
    }

    async fn close(&mut self) -> NativeResult<()> {
        lock(&self.state).statements_closed += 1;
        Ok(())
    }
}

pub struct MockResultSet {
    result: MockResult,
    current: Option<usize>,
    state: Shared,
}

impl MockResultSet {
    fn cell(&self, ordinal: usize) -> NativeResult<&NativeValue> {
        let row = self
            .current
            .and_then(|idx| self.result.rows.get(idx))
            .ok_or_else(|| NativeError::sql("24000", "Invalid cursor state"))?;
        row.get(ordinal)
            .ok_or_else(|| NativeError::sql("07009", format!("Invalid descriptor index {ordinal}")))
    }
}

#[async_trait]
impl NativeResultSet for MockResultSet {
    fn metadata(&self) -> NativeResult<Vec<ColumnMetadata>> {
        Ok(self.result.columns.clone())
    }

    async fn next(&mut self) -> NativeResult<bool> {
        let next = self.current.map_or(0, |idx| idx + 1);
        self.current = Some(next.min(self.result.rows.len()));
        Ok(next < self.result.rows.len())
    }

    async fn get_object(&mut self, ordinal: usize) -> NativeResult<NativeValue> {
        self.cell(ordinal).cloned()
    }

    async fn get_string(&mut self, ordinal: usize) -> NativeResult<Option<String>> {
        match self.cell(ordinal)? {
            NativeValue::Null => Err(NativeError::invalid_cast(
                "Unable to cast object of type 'System.DBNull' to type 'System.String'.",
            )),
            NativeValue::String(text) | NativeValue::SqlXml(text) | NativeValue::Other(text) => {
                Ok(Some(text.clone()))
            }
            other => Ok(Some(format!("{other:?}"))),
        }
    }

    async fn get_bytes(&mut self, ordinal: usize, offset: u64, buf: &mut [u8]) -> NativeResult<usize> {
        let bytes = match self.cell(ordinal)? {
            NativeValue::Bytes(bytes) => bytes,
            NativeValue::Null => return Err(NativeError::invalid_cast("Specified cast is not valid.")),
            other => {
                return Err(NativeError::invalid_cast(format!("{other:?} is not binary")));
            }
        };
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(bytes.len());
        let n = (bytes.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&bytes[start..start + n]);
        Ok(n)
    }

    async fn close(&mut self) -> NativeResult<()> {
        lock(&self.state).result_sets_closed += 1;
        Ok(())
    }
}
