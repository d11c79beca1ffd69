//! Export report model.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::conf::N_REPORT_WARNINGS_MAX;

/// Counters and diagnostics for one export run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// Data rows written (header excluded).
    pub cnt_rows: u64,
    /// Cells that went through the aggregator.
    pub cnt_aggregated: u64,
    /// Aggregated cells that raised at least one diagnostic.
    pub cnt_degraded: u64,
    /// Total diagnostics raised, including those past the warning cap.
    pub cnt_degradations: u64,
    /// Cells cut to the spreadsheet text limit.
    pub cnt_truncated: u64,
    /// Non-fatal warnings, capped at [`N_REPORT_WARNINGS_MAX`].
    pub warnings: Vec<String>,
}

impl ExportReport {
    /// Record a warning; lines past the cap are counted but dropped.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        if self.warnings.len() < N_REPORT_WARNINGS_MAX {
            self.warnings.push(msg.as_ref().to_string());
        }
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_rows".to_string(), self.cnt_rows);
        dict_counts.insert("cnt_aggregated".to_string(), self.cnt_aggregated);
        dict_counts.insert("cnt_degraded".to_string(), self.cnt_degraded);
        dict_counts.insert("cnt_degradations".to_string(), self.cnt_degradations);
        dict_counts.insert("cnt_truncated".to_string(), self.cnt_truncated);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} rows={} aggregated={} degraded={} degradations={} truncated={}",
            self.cnt_rows,
            self.cnt_aggregated,
            self.cnt_degraded,
            self.cnt_degradations,
            self.cnt_truncated
        )
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[EXPORT]"))
    }
}

/// Successful export: artifact location plus report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub report: ExportReport,
}
