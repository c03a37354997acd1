//! Core types for the flatsync import/export engine.
//!
//! This crate provides the foundational types shared by the engine and its
//! store implementations, including:
//!
//! - [`Value`] - Tagged cell value (null, integer, real, text, blob)
//! - [`Record`] - Ordered column/value row
//! - [`TableMapping`] - Rename/reshape instructions for one operation
//! - [`ValidationRule`] - Declarative per-column rules
//! - [`ProgressInfo`] / [`ProgressSink`] - Progress snapshots and delivery
//! - [`CancelToken`] - Cooperative cancellation checked between batches
//! - [`ImportResult`] / [`ExportResult`] - Structured run outcomes
//! - [`EngineError`] - The engine's error taxonomy
//! - [`DataStore`] - The async store contract the engine writes through
//!
//! # Architecture
//!
//! ```text
//! flatsync-core (this crate)
//!    │
//!    ├─── flatsync-sqlite  (DataStore over embedded SQLite)
//!    └─── flatsync         (parsers, validator, batch writer, CLI)
//! ```

pub mod cancel;
pub mod error;
pub mod mapping;
pub mod progress;
pub mod record;
pub mod result;
pub mod rules;
pub mod store;
pub mod value;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use error::{EngineError, EngineResult};
pub use mapping::{ForeignKeyRef, TableMapping};
pub use progress::{NullSink, ProgressInfo, ProgressSink, ProgressStatus, SharedProgress};
pub use record::Record;
pub use result::{ExportResult, ImportResult};
pub use rules::{RuleKind, ValidationRule};
pub use store::{BatchOutcome, DataStore, RowError};
pub use value::Value;
