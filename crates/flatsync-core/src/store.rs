//! Store contract the engine writes through.
//!
//! The engine is store-agnostic: anything honoring this trait under standard
//! relational semantics can be a destination. A SQLite-backed implementation
//! ships in the `flatsync-sqlite` crate.

use crate::error::EngineResult;
use crate::record::Record;
use crate::value::Value;

/// Outcome of one failed row inside a batch write.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    /// Zero-based row index within the batch
    pub row: usize,

    /// Store-reported failure message
    pub message: String,
}

/// Outcome of one atomic batch write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Rows the statement affected inside the committed transaction
    pub rows_written: u64,

    /// Rows skipped under continue-on-error, with their messages
    pub row_errors: Vec<RowError>,
}

/// Async store capability: prepared statements, verbatim execution, and an
/// explicit atomic batch operation.
///
/// `run`, `get`, and `all` cover the prepare/bind/execute shapes the engine
/// needs; `exec` runs engine-native statements verbatim (the raw-statement
/// import path); `write_batch` is the higher-order "run atomically"
/// capability the batch writer drives. Parameters always bind positionally.
///
/// Implementations must be `Send + Sync`; one run issues calls strictly
/// sequentially, but the same store may back several runs over its lifetime.
#[async_trait::async_trait]
pub trait DataStore: Send + Sync {
    /// Execute one or more statements verbatim, discarding any results.
    async fn exec(&self, statements: &str) -> EngineResult<()>;

    /// Prepare a statement, bind `params` positionally, execute it, and
    /// return the affected-row count.
    async fn run(&self, statement: &str, params: &[Value]) -> EngineResult<u64>;

    /// Prepare a query, bind `params`, and return the first result row,
    /// if any.
    async fn get(&self, statement: &str, params: &[Value]) -> EngineResult<Option<Record>>;

    /// Prepare a query, bind `params`, and return every result row.
    async fn all(&self, statement: &str, params: &[Value]) -> EngineResult<Vec<Record>>;

    /// Execute `statement` once per parameter row inside a single atomic
    /// transaction.
    ///
    /// With `continue_on_error`, a failing row is recorded in the outcome
    /// and the transaction proceeds; the commit covers the surviving rows.
    /// Without it, the first failure rolls the whole transaction back and
    /// surfaces as a write error.
    async fn write_batch(
        &self,
        statement: &str,
        rows: &[Vec<Value>],
        continue_on_error: bool,
    ) -> EngineResult<BatchOutcome>;

    /// Whether `table` exists in the store's catalog.
    async fn table_exists(&self, table: &str) -> EngineResult<bool>;
}
