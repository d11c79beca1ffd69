//! Forward-only row cursor abstraction and the in-memory implementation.

use crate::spec::{ExportError, ExportResult};

/// Raw cell payload: `None` is SQL NULL, `Some` holds the undecoded bytes.
pub type RawCell = Option<Vec<u8>>;

/// One result row. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<RawCell>,
}

impl Row {
    pub fn new(cells: Vec<RawCell>) -> Self {
        Self { cells }
    }

    /// Build a row from optional text cells.
    pub fn from_texts<'a>(cells: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        Self {
            cells: cells
                .into_iter()
                .map(|cell| cell.map(|s| s.as_bytes().to_vec()))
                .collect(),
        }
    }

    /// Number of cells.
    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// Raw bytes of cell `idx`; `None` for NULL or out of range.
    pub fn cell(&self, idx: usize) -> Option<&[u8]> {
        self.cells.get(idx).and_then(|cell| cell.as_deref())
    }
}

/// Single-pass reader over a result set.
///
/// Only one owner reads a cursor. `close` is idempotent and implementations
/// also release their resource on drop, so every exit path frees it.
pub trait RowCursor {
    /// Column names, in result order.
    fn columns(&self) -> &[String];

    /// Next row, or `Ok(None)` at end of data.
    fn next_row(&mut self) -> ExportResult<Option<Row>>;

    /// Release the underlying query resource.
    fn close(&mut self) -> ExportResult<()>;
}

/// Cursor over rows already held in memory.
#[derive(Debug)]
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: Option<std::vec::IntoIter<Row>>,
    n_idx_row: usize,
}

impl MemoryCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: Some(rows.into_iter()),
            n_idx_row: 0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.rows.is_none()
    }
}

impl RowCursor for MemoryCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> ExportResult<Option<Row>> {
        let Some(rows) = self.rows.as_mut() else {
            return Err(ExportError::CursorRead {
                row: self.n_idx_row,
                message: "cursor is closed".to_string(),
            });
        };
        let Some(row) = rows.next() else {
            return Ok(None);
        };
        if row.width() != self.columns.len() {
            return Err(ExportError::CursorRead {
                row: self.n_idx_row,
                message: format!(
                    "row has {} cells for {} columns",
                    row.width(),
                    self.columns.len()
                ),
            });
        }
        self.n_idx_row += 1;
        Ok(Some(row))
    }

    fn close(&mut self) -> ExportResult<()> {
        self.rows = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["name".to_string(), "coins".to_string()]
    }

    #[test]
    fn test_memory_cursor_yields_rows_in_order() {
        let mut cursor = MemoryCursor::new(
            columns(),
            vec![
                Row::from_texts([Some("Alice"), Some("[]")]),
                Row::from_texts([Some("Bob"), None]),
            ],
        );

        assert_eq!(cursor.columns(), columns().as_slice());
        assert_eq!(cursor.next_row().unwrap().unwrap().cell(0), Some(&b"Alice"[..]));
        let row_bob = cursor.next_row().unwrap().unwrap();
        assert_eq!(row_bob.cell(0), Some(&b"Bob"[..]));
        assert_eq!(row_bob.cell(1), None);
        assert!(cursor.next_row().unwrap().is_none());
    }

    #[test]
    fn test_memory_cursor_rejects_short_rows() {
        let mut cursor = MemoryCursor::new(columns(), vec![Row::from_texts([Some("Alice")])]);
        let err = cursor.next_row().unwrap_err();
        assert!(matches!(err, ExportError::CursorRead { row: 0, .. }));
    }

    #[test]
    fn test_close_is_idempotent_and_stops_reads() {
        let mut cursor = MemoryCursor::new(columns(), vec![]);
        cursor.close().unwrap();
        cursor.close().unwrap();
        assert!(cursor.is_closed());
        assert!(cursor.next_row().is_err());
    }
}
