//! Query sources: the data-access boundary that turns query text into a cursor.

use std::fs::File;
use std::path::Path;

use polars::prelude::{
    AnyValue, CsvReadOptions, DataFrame, IntoLazy, IpcReader, PolarsResult, SerReader,
};
use polars::sql::SQLContext;
use tracing::{debug, info};

use crate::cursor::{MemoryCursor, RawCell, Row, RowCursor};
use crate::spec::{ExportError, ExportResult};

/// Data-access collaborator: `query(sql)` yields a forward-only cursor.
pub trait QuerySource {
    fn query(&mut self, sql: &str) -> ExportResult<Box<dyn RowCursor + '_>>;
}

////////////////////////////////////////////////////////////////////////////////
// #region MemorySource

/// Returns the same canned result set for any query text.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl MemorySource {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }
}

impl QuerySource for MemorySource {
    fn query(&mut self, sql: &str) -> ExportResult<Box<dyn RowCursor + '_>> {
        debug!(query = sql, rows = self.rows.len(), "memory source query");
        Ok(Box::new(MemoryCursor::new(
            self.columns.clone(),
            self.rows.clone(),
        )))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FrameSqlSource

/// SQL over polars frames registered as named tables.
///
/// Tables come from IPC (`.arrow`, `.ipc`, `.feather`) or CSV files, or from
/// frames built in memory. CSV columns are all read as text.
///
/// A query result is collected into one frame before the cursor is returned;
/// polars has no ordered batch stream for SQL results.
pub struct FrameSqlSource {
    ctx: SQLContext,
    l_tables: Vec<String>,
}

impl Default for FrameSqlSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSqlSource {
    pub fn new() -> Self {
        Self {
            ctx: SQLContext::new(),
            l_tables: Vec::new(),
        }
    }

    /// Registered table names, in registration order.
    pub fn table_names(&self) -> &[String] {
        &self.l_tables
    }

    /// Register an in-memory frame as table `name`.
    pub fn register_frame(&mut self, name: &str, df: DataFrame) {
        self.ctx.register(name, df.lazy());
        if !self.l_tables.iter().any(|c_name| c_name == name) {
            self.l_tables.push(name.to_string());
        }
    }

    /// Load `path` and register it as table `name`.
    ///
    /// A missing, unreadable, or unsupported file is a connection error.
    pub fn register_file(&mut self, name: &str, path: &Path) -> ExportResult<()> {
        let df = read_table_file(path).map_err(|err| {
            ExportError::Connection(format!(
                "failed to load table {name:?} from {}: {err}",
                path.display()
            ))
        })?;
        info!(
            table = name,
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            "table registered"
        );
        self.register_frame(name, df);
        Ok(())
    }
}

impl QuerySource for FrameSqlSource {
    fn query(&mut self, sql: &str) -> ExportResult<Box<dyn RowCursor + '_>> {
        if self.l_tables.is_empty() {
            return Err(ExportError::Connection(
                "no tables registered with the SQL source".to_string(),
            ));
        }
        let df = self
            .ctx
            .execute(sql)
            .and_then(|lf| lf.collect())
            .map_err(|err| ExportError::Query(err.to_string()))?;
        debug!(rows = df.height(), cols = df.width(), "query executed");
        Ok(Box::new(FrameCursor::new(df)))
    }
}

fn read_table_file(path: &Path) -> Result<DataFrame, String> {
    let c_ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let result: PolarsResult<DataFrame> = match c_ext.as_str() {
        "csv" => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish()),
        "arrow" | "ipc" | "feather" => {
            let file = File::open(path).map_err(|err| err.to_string())?;
            IpcReader::new(file).finish()
        }
        _ => return Err(format!("unsupported table file extension {c_ext:?}")),
    };
    result.map_err(|err| err.to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FrameCursor

/// Row-by-row cursor over a query result frame.
///
/// The whole result frame is held in memory. Cells are converted one row at a
/// time; the frame is dropped on close.
pub struct FrameCursor {
    columns: Vec<String>,
    frame: Option<DataFrame>,
    n_idx_row: usize,
}

impl FrameCursor {
    pub fn new(df: DataFrame) -> Self {
        let columns = df
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        Self {
            columns,
            frame: Some(df),
            n_idx_row: 0,
        }
    }
}

impl RowCursor for FrameCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> ExportResult<Option<Row>> {
        let Some(df) = self.frame.as_ref() else {
            return Err(ExportError::CursorRead {
                row: self.n_idx_row,
                message: "cursor is closed".to_string(),
            });
        };
        if self.n_idx_row >= df.height() {
            return Ok(None);
        }

        let mut l_cells = Vec::with_capacity(self.columns.len());
        for col in df.get_columns() {
            let value = col
                .get(self.n_idx_row)
                .map_err(|err| ExportError::CursorRead {
                    row: self.n_idx_row,
                    message: err.to_string(),
                })?;
            l_cells.push(derive_raw_cell_from_any_value(value));
        }

        self.n_idx_row += 1;
        Ok(Some(Row::new(l_cells)))
    }

    fn close(&mut self) -> ExportResult<()> {
        self.frame = None;
        Ok(())
    }
}

/// Raw cell bytes for one polars value: text verbatim, NULL as `None`,
/// everything else in its display form.
pub fn derive_raw_cell_from_any_value(value: AnyValue<'_>) -> RawCell {
    match value {
        AnyValue::Null => None,
        AnyValue::String(val) => Some(val.as_bytes().to_vec()),
        AnyValue::StringOwned(val) => Some(val.as_bytes().to_vec()),
        AnyValue::Binary(val) => Some(val.to_vec()),
        AnyValue::BinaryOwned(val) => Some(val),
        AnyValue::Boolean(val) => Some(if val { "true" } else { "false" }.as_bytes().to_vec()),
        other => Some(other.to_string().into_bytes()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
