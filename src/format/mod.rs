//! Payload formats: parsing on import, encoding on export.
//!
//! Each format lives in its own submodule behind the [`parse_payload`]
//! dispatch. Delimited text, structured records, and raw statements are
//! built in; spreadsheets are pluggable through the [`SheetCodec`] seam.

use clap::ValueEnum;
use flatsync_core::{EngineError, EngineResult, Record};
use serde::{Deserialize, Serialize};

pub mod delimited;
pub mod sheet;
pub mod statement;
pub mod structured;

pub use sheet::SheetCodec;

/// Supported payload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataFormat {
    /// Delimited text with a header row (CSV and friends)
    DelimitedText,

    /// JSON records: an array, a wrapper object, or one bare object
    StructuredRecord,

    /// Engine-native statements executed verbatim
    RawStatement,

    /// One sheet of a spreadsheet, via a registered codec
    Spreadsheet,
}

impl DataFormat {
    /// Format name as spelled on the command line and in options.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DelimitedText => "delimited-text",
            Self::StructuredRecord => "structured-record",
            Self::RawStatement => "raw-statement",
            Self::Spreadsheet => "spreadsheet",
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a payload decodes to.
///
/// Record-bearing formats produce an ordered record sequence; the
/// raw-statement format carries its statements through opaquely, with no
/// record extraction and no observable row count.
#[derive(Debug)]
pub enum ParsedPayload {
    /// Ordered records ready for mapping and validation
    Records(Vec<Record>),

    /// Verbatim statement batch for `DataStore::exec`
    Statements(String),
}

/// Decode a payload under the declared format.
pub fn parse_payload(
    format: DataFormat,
    payload: &[u8],
    delimiter: u8,
    sheet_name: Option<&str>,
    sheet_codec: Option<&dyn SheetCodec>,
) -> EngineResult<ParsedPayload> {
    match format {
        DataFormat::DelimitedText => {
            let text = decode_utf8(payload)?;
            Ok(ParsedPayload::Records(delimited::parse(&text, delimiter)?))
        }
        DataFormat::StructuredRecord => {
            let text = decode_utf8(payload)?;
            Ok(ParsedPayload::Records(structured::parse(&text)?))
        }
        DataFormat::RawStatement => Ok(ParsedPayload::Statements(decode_utf8(payload)?)),
        DataFormat::Spreadsheet => {
            let codec = sheet_codec.ok_or_else(|| {
                EngineError::Format(
                    "spreadsheet format requires a registered sheet codec".to_string(),
                )
            })?;
            Ok(ParsedPayload::Records(codec.decode(payload, sheet_name)?))
        }
    }
}

/// Decode payload bytes as UTF-8.
pub fn decode_utf8(payload: &[u8]) -> EngineResult<String> {
    String::from_utf8(payload.to_vec()).map_err(|e| {
        EngineError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("payload is not valid UTF-8: {e}"),
        ))
    })
}

/// Check a caller-declared payload encoding name.
///
/// Only UTF-8 is supported; the option exists so an unsupported declaration
/// fails up front as an IO error rather than a garbled parse.
pub fn check_encoding(encoding: &str) -> EngineResult<()> {
    match encoding.to_ascii_lowercase().as_str() {
        "utf8" | "utf-8" => Ok(()),
        other => Err(EngineError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("unsupported encoding: {other}"),
        ))),
    }
}
