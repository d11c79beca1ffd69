//! Export options, state machine states, and the top-level error type.

use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use coinsheet_io_xlsx::{SpecXlsxWriteOptions, XlsxWriteError};
use thiserror::Error;

use crate::conf::{C_PATH_OUTPUT_DEFAULT, N_IDX_AGGREGATE_COLUMN_DEFAULT};

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Column selector reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumColumnIdentifier {
    /// Select by column name.
    Name(String),
    /// Select by zero-based column index.
    Index(usize),
}

impl FromStr for EnumColumnIdentifier {
    type Err = Infallible;

    /// Numeric text selects by index; anything else selects by name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let c_ref = s.trim();
        Ok(match c_ref.parse::<usize>() {
            Ok(n_idx) => Self::Index(n_idx),
            Err(_) => Self::Name(c_ref.to_string()),
        })
    }
}

impl fmt::Display for EnumColumnIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name:?}"),
            Self::Index(n_idx) => write!(f, "#{n_idx}"),
        }
    }
}

/// Coarse error classification carried by a failed export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumExportErrorKind {
    /// Data source unreachable.
    Connection,
    /// Query rejected or failed.
    Query,
    /// Row stream failed mid-way.
    CursorRead,
    /// Static export configuration does not match the result columns.
    Configuration,
    /// Document shape violation.
    Structure,
    /// Serialization or persistence failed.
    Write,
    /// Host cancelled the export at a row boundary.
    Cancelled,
}

impl fmt::Display for EnumExportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_text = match self {
            Self::Connection => "connection error",
            Self::Query => "query error",
            Self::CursorRead => "cursor read error",
            Self::Configuration => "configuration error",
            Self::Structure => "document structure error",
            Self::Write => "write error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(c_text)
    }
}

/// Orchestrator state: `Idle -> CursorOpen -> Streaming -> Finalizing -> {Done, Failed}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnumExportState {
    #[default]
    Idle,
    CursorOpen,
    Streaming,
    Finalizing,
    /// Terminal success with the artifact location.
    Done(PathBuf),
    /// Terminal failure with the causing error kind.
    Failed(EnumExportErrorKind),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for one export run.
#[derive(Debug, Clone)]
pub struct SpecExportOptions {
    /// Destination workbook path; created or overwritten.
    pub path_output: PathBuf,
    /// Column bound to the coin aggregator.
    pub aggregate_column: EnumColumnIdentifier,
    /// Sheet-level writer options.
    pub write_options: SpecXlsxWriteOptions,
    /// Cancellation flag polled between rows.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for SpecExportOptions {
    fn default() -> Self {
        Self {
            path_output: PathBuf::from(C_PATH_OUTPUT_DEFAULT),
            aggregate_column: EnumColumnIdentifier::Index(N_IDX_AGGREGATE_COLUMN_DEFAULT),
            write_options: SpecXlsxWriteOptions::default(),
            cancel_flag: None,
        }
    }
}

/// Fatal export errors. Aggregation problems never appear here.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Data source unreachable or a table could not be loaded.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution failed.
    #[error("Query error: {0}")]
    Query(String),

    /// Reading row `row` (zero-based) failed.
    #[error("Cursor read error at row {row}: {message}")]
    CursorRead {
        /// Zero-based data row index.
        row: usize,
        /// Underlying error text.
        message: String,
    },

    /// The aggregate column selector names no result column.
    #[error("Aggregate column {0} not found in result columns")]
    UnknownColumn(EnumColumnIdentifier),

    /// The document would violate its shape invariants.
    #[error("Document structure error: {0}")]
    Structure(#[source] XlsxWriteError),

    /// The workbook could not be serialized or persisted.
    #[error("Write error: {0}")]
    Write(#[source] XlsxWriteError),

    /// Cancelled at a row boundary; carries the number of rows already read.
    #[error("Export cancelled after {0} rows")]
    Cancelled(usize),
}

impl ExportError {
    /// Coarse kind for state reporting and user-facing messages.
    pub fn kind(&self) -> EnumExportErrorKind {
        match self {
            Self::Connection(_) => EnumExportErrorKind::Connection,
            Self::Query(_) => EnumExportErrorKind::Query,
            Self::CursorRead { .. } => EnumExportErrorKind::CursorRead,
            Self::UnknownColumn(_) => EnumExportErrorKind::Configuration,
            Self::Structure(_) => EnumExportErrorKind::Structure,
            Self::Write(_) => EnumExportErrorKind::Write,
            Self::Cancelled(_) => EnumExportErrorKind::Cancelled,
        }
    }
}

impl From<XlsxWriteError> for ExportError {
    fn from(err: XlsxWriteError) -> Self {
        if err.is_structural() {
            Self::Structure(err)
        } else {
            Self::Write(err)
        }
    }
}

/// Result alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
