//! Spreadsheet codec seam.
//!
//! Workbook formats are binary and vendor-specific, so the engine does not
//! decode them itself. Callers plug in a [`SheetCodec`] and the import and
//! export paths route spreadsheet payloads through it.

use flatsync_core::{EngineResult, Record};

/// Sheet name used on export when the caller does not pick one.
pub const DEFAULT_SHEET: &str = "Sheet1";

/// Decodes and encodes workbook payloads.
///
/// `decode` receives the raw payload bytes and an optional sheet name; with
/// no name the codec should use the workbook's first sheet. `encode` builds
/// a single-sheet workbook from records.
pub trait SheetCodec: Send + Sync {
    fn decode(&self, payload: &[u8], sheet: Option<&str>) -> EngineResult<Vec<Record>>;

    fn encode(&self, sheet: &str, records: &[Record]) -> EngineResult<Vec<u8>>;
}
