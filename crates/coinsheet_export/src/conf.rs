//! Export constants and defaults.

/// Artifact path used when the caller does not pick one.
pub const C_PATH_OUTPUT_DEFAULT: &str = "upload/user_coin_list.xlsx";
/// Column position bound to the coin aggregator by default.
pub const N_IDX_AGGREGATE_COLUMN_DEFAULT: usize = 5;
/// Cap on warning lines kept in one export report.
pub const N_REPORT_WARNINGS_MAX: usize = 100;
