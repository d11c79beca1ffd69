//! Append-only in-memory sheet model.

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::spec::{XlsxResult, XlsxWriteError};
use crate::util::validate_unique_columns;

/// One named sheet: a header row plus text data rows of identical width.
///
/// Rows can only be appended; nothing is edited in place once pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    sheet_name: String,
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl ExportDocument {
    /// Create an empty document for `sheet_name`.
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            header: None,
            rows: Vec::new(),
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Header row, if written.
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Data rows in insertion order.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Column count; zero before the header is written.
    pub fn width(&self) -> usize {
        self.header.as_ref().map_or(0, Vec::len)
    }

    /// Number of data rows (header excluded).
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Set the header row. Allowed exactly once, before any data row.
    pub fn push_header(&mut self, names: Vec<String>) -> XlsxResult<()> {
        if let Some(header) = &self.header {
            return Err(XlsxWriteError::HeaderAlreadyWritten(header.len()));
        }
        if names.len() > N_NCOLS_EXCEL_MAX {
            return Err(XlsxWriteError::LimitExceeded(format!(
                "{} columns exceeds the worksheet maximum of {N_NCOLS_EXCEL_MAX}.",
                names.len()
            )));
        }
        validate_unique_columns(&names)?;

        self.header = Some(names);
        Ok(())
    }

    /// Append one data row whose width must equal the header width.
    pub fn push_row(&mut self, cells: Vec<String>) -> XlsxResult<()> {
        let Some(header) = &self.header else {
            return Err(XlsxWriteError::MissingHeader);
        };
        if cells.len() != header.len() {
            return Err(XlsxWriteError::RowWidthMismatch {
                row: self.rows.len(),
                expected: header.len(),
                actual: cells.len(),
            });
        }
        if self.rows.len() + 1 >= N_NROWS_EXCEL_MAX {
            return Err(XlsxWriteError::LimitExceeded(format!(
                "more than {} data rows do not fit one worksheet.",
                N_NROWS_EXCEL_MAX - 1
            )));
        }

        self.rows.push(cells);
        Ok(())
    }

    /// Iterate header (when present) followed by data rows.
    pub fn iter_grid(&self) -> impl Iterator<Item = &[String]> {
        self.header
            .iter()
            .map(Vec::as_slice)
            .chain(self.rows.iter().map(Vec::as_slice))
    }
}
