//! XLSX constants and default preset factories.

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count (header included).
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel cell text maximum length, in characters.
pub const N_LEN_EXCEL_CELL_TEXT_MAX: usize = 32_767;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Sheet name used when the caller does not pick one.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet1";
/// Excel "Text" number format. Cells carrying it stay text on re-entry.
pub const C_NUM_FORMAT_TEXT: &str = "@";

/// Base format shared by header and body cells.
pub fn derive_base_xlsx_format() -> SpecCellFormat {
    SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    }
}

/// Body cell preset: every exported value is text.
pub fn derive_default_text_format() -> SpecCellFormat {
    derive_base_xlsx_format().with_(SpecCellFormat {
        num_format: Some(C_NUM_FORMAT_TEXT.to_string()),
        ..Default::default()
    })
}

/// Header row preset.
pub fn derive_default_header_format() -> SpecCellFormat {
    derive_base_xlsx_format().with_(SpecCellFormat {
        bold: Some(true),
        align: Some("center".to_string()),
        border: Some(1),
        num_format: Some(C_NUM_FORMAT_TEXT.to_string()),
        ..Default::default()
    })
}
