//! Stateless helper utilities used by the XLSX writer kernel.

use std::collections::{BTreeMap, BTreeSet};

use crate::conf::{
    C_SHEET_NAME_DEFAULT, N_LEN_EXCEL_CELL_TEXT_MAX, N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumAutofitColumnsRule, SpecAutofitCellsPolicy, XlsxResult, XlsxWriteError};

////////////////////////////////////////////////////////////////////////////////
// #region ColumnValidation

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> XlsxResult<()> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(XlsxWriteError::DuplicateColumns(c_msg))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = C_SHEET_NAME_DEFAULT.to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Cut `text` to Excel's cell limit on a char boundary; `true` when it was cut.
pub fn truncate_cell_text(text: &mut String) -> bool {
    match text.char_indices().nth(N_LEN_EXCEL_CELL_TEXT_MAX) {
        Some((n_idx_byte, _)) => {
            text.truncate(n_idx_byte);
            true
        }
        None => false,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Autofit

/// Approximate display width: non-ASCII glyphs count as 1.6 columns.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

/// Infer final column widths for a header + body grid.
///
/// Returns `None` when autofit is disabled.
pub fn derive_column_widths(
    header: &[String],
    rows: &[Vec<String>],
    policy: &SpecAutofitCellsPolicy,
) -> Option<Vec<usize>> {
    if matches!(policy.rule_columns, EnumAutofitColumnsRule::None) || header.is_empty() {
        return None;
    }

    let n_width = header.len();
    let l_width_by_col_header: Vec<usize> = header
        .iter()
        .map(|c_name| estimate_unicode_string_width(c_name))
        .collect();

    let mut l_width_by_col_body = vec![0usize; n_width];
    if matches!(
        policy.rule_columns,
        EnumAutofitColumnsRule::Body | EnumAutofitColumnsRule::All
    ) {
        let n_rows_sample = policy
            .height_body_inferred_max
            .map_or(rows.len(), |n_max| usize::min(rows.len(), n_max));
        for row in &rows[..n_rows_sample] {
            for (n_idx_col, c_value) in row.iter().enumerate().take(n_width) {
                l_width_by_col_body[n_idx_col] = usize::max(
                    l_width_by_col_body[n_idx_col],
                    estimate_unicode_string_width(c_value),
                );
            }
        }
    }

    let n_min = usize::max(1, policy.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy.width_cell_max));

    let l_widths = (0..n_width)
        .map(|n_idx_col| {
            let n_width_recorded = match policy.rule_columns {
                EnumAutofitColumnsRule::Body => l_width_by_col_body[n_idx_col],
                EnumAutofitColumnsRule::All => usize::max(
                    l_width_by_col_header[n_idx_col],
                    l_width_by_col_body[n_idx_col],
                ),
                EnumAutofitColumnsRule::Header | EnumAutofitColumnsRule::None => {
                    l_width_by_col_header[n_idx_col]
                }
            };
            usize::min(
                n_max,
                usize::max(n_min, n_width_recorded + policy.width_cell_padding),
            )
        })
        .collect();

    Some(l_widths)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region IndexCasting

/// Convert a zero-based row index to the worksheet row type.
pub fn cast_row_num(value: usize) -> XlsxResult<u32> {
    u32::try_from(value)
        .map_err(|_| XlsxWriteError::LimitExceeded(format!("row index overflow: {value}")))
}

/// Convert a zero-based column index to the worksheet column type.
pub fn cast_col_num(value: usize) -> XlsxResult<u16> {
    u16::try_from(value)
        .map_err(|_| XlsxWriteError::LimitExceeded(format!("column index overflow: {value}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
