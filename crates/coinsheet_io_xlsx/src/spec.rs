//! Shared XLSX specification models and the writer error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::conf::{C_SHEET_NAME_DEFAULT, derive_default_header_format, derive_default_text_format};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification, translated to a `rust_xlsxwriter::Format` at save time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,

    /// Number format code.
    pub num_format: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only (default).
    #[default]
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells.
    All,
}

/// Autofit policy applied when the sheet is serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::Header,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Writer options for the single exported sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxWriteOptions {
    /// Requested sheet name; sanitized before use.
    pub sheet_name: String,
    /// Header row format.
    pub fmt_header: SpecCellFormat,
    /// Body cell format.
    pub fmt_text: SpecCellFormat,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        Self {
            sheet_name: C_SHEET_NAME_DEFAULT.to_string(),
            fmt_header: derive_default_header_format(),
            fmt_text: derive_default_text_format(),
            policy_autofit: SpecAutofitCellsPolicy::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-writer report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Final sheet name used in the workbook.
    pub sheet_name: String,
    /// Number of data rows (header excluded).
    pub n_rows: usize,
    /// Cells cut down to [`crate::conf::N_LEN_EXCEL_CELL_TEXT_MAX`] characters.
    pub n_cells_truncated: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Errors raised while building or persisting the export document.
#[derive(Debug, Error)]
pub enum XlsxWriteError {
    /// `add_header` was called twice.
    #[error("Header already written ({0} columns).")]
    HeaderAlreadyWritten(usize),

    /// A data row arrived before the header.
    #[error("Cannot add a data row before the header.")]
    MissingHeader,

    /// Header contains repeated names.
    #[error("Duplicate column names detected: {0}")]
    DuplicateColumns(String),

    /// Data row width differs from the header width.
    #[error("Row {row} has {actual} cells; expected {expected}.")]
    RowWidthMismatch {
        /// Zero-based data row index.
        row: usize,
        /// Header width.
        expected: usize,
        /// Cells supplied.
        actual: usize,
    },

    /// Sheet would exceed an Excel worksheet limit.
    #[error("Excel limit exceeded: {0}")]
    LimitExceeded(String),

    /// Workbook assembly or serialization failed.
    #[error("xlsx write error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    /// Persisting the serialized workbook failed.
    #[error("Failed to persist workbook to {}: {source}", .path.display())]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl XlsxWriteError {
    /// Whether the error is a document-shape violation rather than a persistence failure.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::HeaderAlreadyWritten(_)
                | Self::MissingHeader
                | Self::DuplicateColumns(_)
                | Self::RowWidthMismatch { .. }
                | Self::LimitExceeded(_)
        )
    }
}

/// Result alias for writer operations.
pub type XlsxResult<T> = Result<T, XlsxWriteError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
