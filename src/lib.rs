//! Flatsync Library
//!
//! A library for bulk-importing flat-file data into a relational store and
//! exporting it back out.
//!
//! # Features
//!
//! - Format parsing: delimited text, structured records (JSON), raw
//!   statement batches, and spreadsheets via a pluggable codec
//! - Schema inference: column types sampled from the data when provisioning
//!   the destination table
//! - Validation: declarative per-column rules (required, unique, pattern,
//!   range, enum) with strict and continue-on-error policies
//! - Transactional batching: fixed-size batches, one atomic transaction each
//! - Progress and cancellation: per-batch snapshots to a caller-supplied
//!   sink, cooperative cancellation between batches
//! - Streaming: bounded-memory delimited-text ingestion from any reader
//!
//! # CLI Usage
//!
//! ```bash
//! # Import a CSV, provisioning the table from inferred types
//! flatsync import data.csv --db app.db --table people --create-table
//!
//! # Import JSON records with a profile (mapping + validation rules)
//! flatsync import data.json --db app.db --format structured-record --profile rules.yaml
//!
//! # Export a table as pretty-printed JSON with a schema envelope
//! flatsync export --db app.db --table people --format structured-record \
//!     --pretty --include-schema -o people.json
//! ```

pub mod export;
pub mod format;
pub mod import;
pub mod infer;
pub mod map;
pub mod profile;
pub mod provision;
pub mod stream;
pub mod validate;

// Re-export the core data model for convenience
pub use flatsync_core::{
    BatchOutcome, CancelToken, DataStore, EngineError, EngineResult, ExportResult, ForeignKeyRef,
    ImportResult, ProgressInfo, ProgressSink, ProgressStatus, Record, RowError, RuleKind,
    SharedProgress, TableMapping, ValidationRule, Value,
};

pub use export::{run_export, ExportOptions, ExportOutput};
pub use format::{DataFormat, ParsedPayload, SheetCodec};
pub use import::{run_import, ImportOptions, RecordTransform};
pub use profile::ImportProfile;
pub use stream::run_stream_import;
pub use validate::{UniqueSeen, Validated, Validator};
