//! XLSX writer kernel: accumulates an [`ExportDocument`] and serializes it as a
//! single-sheet workbook where every cell is text.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::{debug, info, warn};

use crate::conf::N_LEN_EXCEL_CELL_TEXT_MAX;
use crate::document::ExportDocument;
use crate::spec::{SpecCellFormat, SpecXlsxReport, SpecXlsxWriteOptions, XlsxResult, XlsxWriteError};
use crate::util::{
    cast_col_num, cast_row_num, derive_column_widths, sanitize_sheet_name, truncate_cell_text,
};

/// Stateful single-sheet workbook writer.
///
/// The document is buffered in memory until [`Self::save`] consumes the writer.
pub struct XlsxWriter {
    document: ExportDocument,
    write_options: SpecXlsxWriteOptions,
    report: SpecXlsxReport,
}

impl XlsxWriter {
    /// Create a writer with an empty document.
    pub fn new(write_options: SpecXlsxWriteOptions) -> Self {
        let sheet_name = sanitize_sheet_name(&write_options.sheet_name, "_");
        let mut report = SpecXlsxReport {
            sheet_name: sheet_name.clone(),
            ..Default::default()
        };
        if sheet_name != write_options.sheet_name {
            report.warn(format!(
                "Sheet name {:?} sanitized to {sheet_name:?}.",
                write_options.sheet_name
            ));
        }

        Self {
            document: ExportDocument::new(sheet_name),
            write_options,
            report,
        }
    }

    /// Write the header row (column names verbatim, in order).
    pub fn add_header(&mut self, mut names: Vec<String>) -> XlsxResult<()> {
        self.truncate_cells(None, &mut names);
        self.document.push_header(names)
    }

    /// Append one data row; width must equal the header width.
    ///
    /// Cells longer than Excel allows are cut and reported, never rejected.
    pub fn add_row(&mut self, mut cells: Vec<String>) -> XlsxResult<()> {
        self.truncate_cells(Some(self.document.height()), &mut cells);
        self.document.push_row(cells)?;
        self.report.n_rows = self.document.height();
        Ok(())
    }

    fn truncate_cells(&mut self, row: Option<usize>, cells: &mut [String]) {
        for (n_idx_col, c_cell) in cells.iter_mut().enumerate() {
            if !truncate_cell_text(c_cell) {
                continue;
            }
            let c_where = match row {
                Some(n_idx_row) => format!("row {n_idx_row}"),
                None => "header".to_string(),
            };
            warn!(row = ?row, col = n_idx_col, "cell text truncated to Excel limit");
            self.report.n_cells_truncated += 1;
            self.report.warn(format!(
                "Cell at {c_where} col {n_idx_col} truncated to {N_LEN_EXCEL_CELL_TEXT_MAX} characters."
            ));
        }
    }

    /// Borrow the in-memory document.
    pub fn document(&self) -> &ExportDocument {
        &self.document
    }

    /// Snapshot of the writer report.
    pub fn report(&self) -> SpecXlsxReport {
        self.report.clone()
    }

    /// Serialize the document and persist it at `path`, replacing any existing file.
    ///
    /// Missing parent directories are created. The bytes go to a sibling temp
    /// file first, so a failed save never leaves a partial workbook at `path`.
    pub fn save(self, path: impl AsRef<Path>) -> XlsxResult<PathBuf> {
        let path_file_out = path.as_ref().to_path_buf();
        let Some(l_header) = self.document.header() else {
            return Err(XlsxWriteError::MissingHeader);
        };

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(self.document.sheet_name())?;

        let fmt_header = derive_rust_xlsx_format(&self.write_options.fmt_header);
        let fmt_text = derive_rust_xlsx_format(&self.write_options.fmt_text);

        write_row(worksheet, 0, l_header, &fmt_header)?;
        for (n_idx_row, row) in self.document.rows().iter().enumerate() {
            write_row(worksheet, n_idx_row + 1, row, &fmt_text)?;
        }

        if let Some(l_widths) = derive_column_widths(
            l_header,
            self.document.rows(),
            &self.write_options.policy_autofit,
        ) {
            for (n_idx_col, n_width) in l_widths.into_iter().enumerate() {
                worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width as f64)?;
            }
        }

        let v_bytes = workbook.save_to_buffer()?;
        debug!(bytes = v_bytes.len(), "workbook serialized");

        persist_workbook_bytes(&path_file_out, &v_bytes)?;
        info!(
            path = %path_file_out.display(),
            rows = self.document.height(),
            sheet = self.document.sheet_name(),
            "workbook saved"
        );
        Ok(path_file_out)
    }
}

fn write_row(
    worksheet: &mut Worksheet,
    row_idx: usize,
    cells: &[String],
    format: &Format,
) -> XlsxResult<()> {
    let n_row = cast_row_num(row_idx)?;
    for (col_idx, cell_value) in cells.iter().enumerate() {
        let n_col = cast_col_num(col_idx)?;
        if cell_value.is_empty() {
            worksheet.write_blank(n_row, n_col, format)?;
        } else {
            worksheet.write_string_with_format(n_row, n_col, cell_value, format)?;
        }
    }
    Ok(())
}

fn persist_workbook_bytes(path: &Path, v_bytes: &[u8]) -> XlsxResult<()> {
    let to_io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| XlsxWriteError::Io { path, source }
    };

    let Some(c_file_name) = path.file_name() else {
        return Err(XlsxWriteError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"),
        });
    };

    let path_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(path_dir).map_err(to_io_error(path_dir))?;

    // Unique sibling per save; dropped (and removed) on any failure below.
    let mut c_prefix = OsString::from(".");
    c_prefix.push(c_file_name);
    c_prefix.push(".");
    let mut file_tmp = tempfile::Builder::new()
        .prefix(&c_prefix)
        .suffix(".part")
        .tempfile_in(path_dir)
        .map_err(to_io_error(path))?;
    file_tmp.write_all(v_bytes).map_err(to_io_error(path))?;
    file_tmp
        .persist(path)
        .map_err(|err| to_io_error(path)(err.error))?;
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}
