//! `coinsheet_io_xlsx` v1:
//! single-sheet XLSX export writer.
//!
//! Modules:
//! - `conf`     : constants and default presets
//! - `spec`     : options, report, error
//! - `document` : append-only in-memory sheet
//! - `util`     : pure helper functions
//! - `writer`   : `rust_xlsxwriter`-backed serializer
pub mod conf;
pub mod document;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_SHEET_NAME_DEFAULT, N_LEN_EXCEL_CELL_TEXT_MAX, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use document::ExportDocument;
pub use spec::{
    EnumAutofitColumnsRule, SpecAutofitCellsPolicy, SpecCellFormat, SpecXlsxReport,
    SpecXlsxWriteOptions, XlsxResult, XlsxWriteError,
};
pub use util::{derive_column_widths, sanitize_sheet_name};
pub use writer::XlsxWriter;
