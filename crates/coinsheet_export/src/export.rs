//! Export orchestrator.
//!
//! One [`Exporter::run`] call drives a query result through the column
//! transforms into a single-sheet workbook:
//! `Idle -> CursorOpen -> Streaming -> Finalizing -> {Done, Failed}`.

use std::sync::atomic::Ordering;

use coinsheet_io_xlsx::XlsxWriter;
use tracing::{debug, error, info, warn};

use crate::aggregate::Degradation;
use crate::cursor::RowCursor;
use crate::report::{ExportOutcome, ExportReport};
use crate::source::QuerySource;
use crate::spec::{EnumExportState, ExportError, ExportResult, SpecExportOptions};
use crate::transform::ColumnTransformRegistry;

/// Stateful export driver. Holds options and the last run's state only.
#[derive(Debug, Default)]
pub struct Exporter {
    options: SpecExportOptions,
    state: EnumExportState,
}

impl Exporter {
    pub fn new(options: SpecExportOptions) -> Self {
        Self {
            options,
            state: EnumExportState::Idle,
        }
    }

    pub fn options(&self) -> &SpecExportOptions {
        &self.options
    }

    /// Current state; terminal after `run` returns.
    pub fn state(&self) -> &EnumExportState {
        &self.state
    }

    /// Run `query` against `source` and write the result to the configured path.
    ///
    /// On failure nothing is written at the output path and the state carries
    /// the error kind.
    pub fn run(&mut self, source: &mut dyn QuerySource, query: &str) -> ExportResult<ExportOutcome> {
        self.state = EnumExportState::Idle;
        info!(
            query,
            path = %self.options.path_output.display(),
            "export started"
        );

        match self.run_stages(source, query) {
            Ok(outcome) => {
                self.transition(EnumExportState::Done(outcome.path.clone()));
                info!(
                    path = %outcome.path.display(),
                    rows = outcome.report.cnt_rows,
                    degraded = outcome.report.cnt_degraded,
                    "export finished"
                );
                Ok(outcome)
            }
            Err(err) => {
                self.transition(EnumExportState::Failed(err.kind()));
                error!(kind = %err.kind(), error = %err, "export failed");
                Err(err)
            }
        }
    }

    fn transition(&mut self, state: EnumExportState) {
        debug!(from = ?self.state, to = ?state, "export state");
        self.state = state;
    }

    fn is_cancelled(&self) -> bool {
        self.options
            .cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn run_stages(
        &mut self,
        source: &mut dyn QuerySource,
        query: &str,
    ) -> ExportResult<ExportOutcome> {
        let mut cursor = source.query(query)?;
        self.transition(EnumExportState::CursorOpen);

        let result_stream = self.stream_rows(cursor.as_mut());
        let result_close = cursor.close();
        drop(cursor);

        let (writer, report) = match (result_stream, result_close) {
            (Ok(streamed), Ok(())) => streamed,
            (Ok((_, report)), Err(err_close)) => {
                return Err(match err_close {
                    err @ ExportError::CursorRead { .. } => err,
                    other => ExportError::CursorRead {
                        row: report.cnt_rows as usize,
                        message: format!("cursor close failed: {other}"),
                    },
                });
            }
            (Err(err), Ok(())) => return Err(err),
            (Err(err), Err(err_close)) => {
                warn!(error = %err_close, "cursor close failed after export error");
                return Err(err);
            }
        };

        self.transition(EnumExportState::Finalizing);
        let path = writer.save(&self.options.path_output)?;
        Ok(ExportOutcome { path, report })
    }

    fn stream_rows(
        &mut self,
        cursor: &mut dyn RowCursor,
    ) -> ExportResult<(XlsxWriter, ExportReport)> {
        let l_columns = cursor.columns().to_vec();
        let n_width = l_columns.len();
        let registry = ColumnTransformRegistry::resolve(&l_columns, &self.options.aggregate_column)?;
        debug!(
            cols = n_width,
            aggregate = ?registry.aggregate_index(),
            "column transforms resolved"
        );

        let mut report = ExportReport::default();
        if registry.aggregate_index().is_none() {
            let c_warning = format!(
                "Aggregate column {} is outside the {n_width} result columns; all columns exported as-is.",
                self.options.aggregate_column
            );
            warn!("{c_warning}");
            report.warn(c_warning);
        }

        let mut writer = XlsxWriter::new(self.options.write_options.clone());
        for c_warning in &writer.report().warnings {
            warn!("{c_warning}");
        }
        writer.add_header(l_columns)?;

        self.transition(EnumExportState::Streaming);
        let mut n_idx_row = 0usize;
        loop {
            if self.is_cancelled() {
                return Err(ExportError::Cancelled(n_idx_row));
            }
            let Some(row) = cursor.next_row()? else {
                break;
            };
            if row.width() != n_width {
                return Err(ExportError::CursorRead {
                    row: n_idx_row,
                    message: format!("row has {} cells for {n_width} columns", row.width()),
                });
            }

            let mut l_texts = Vec::with_capacity(n_width);
            for (n_idx_col, cell) in registry.apply_row(&row).into_iter().enumerate() {
                if let Some(aggregation) = &cell.aggregation {
                    report.cnt_aggregated += 1;
                    if aggregation.is_degraded() {
                        report.cnt_degraded += 1;
                    }
                    for degradation in &aggregation.degradations {
                        report.cnt_degradations += 1;
                        match degradation {
                            Degradation::NotAnArray(_) => {
                                debug!(row = n_idx_row, col = n_idx_col, "{degradation}")
                            }
                            _ => warn!(row = n_idx_row, col = n_idx_col, "{degradation}"),
                        }
                        report.warn(format!("row {n_idx_row} col {n_idx_col}: {degradation}"));
                    }
                }
                l_texts.push(cell.text);
            }

            writer.add_row(l_texts)?;
            n_idx_row += 1;
            report.cnt_rows += 1;
        }

        let report_writer = writer.report();
        report.cnt_truncated = report_writer.n_cells_truncated as u64;
        for c_warning in report_writer.warnings {
            report.warn(c_warning);
        }

        Ok((writer, report))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;
    use std::io::Read;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::cursor::Row;
    use crate::source::MemorySource;
    use crate::spec::{EnumColumnIdentifier, EnumExportErrorKind};

    /// Cursor with scripted failures that counts `close` calls.
    struct ScriptedCursor {
        columns: Vec<String>,
        rows: Vec<Row>,
        n_idx_row: usize,
        fail_at: Option<usize>,
        if_close_fails: bool,
        flag_after_first: Option<Arc<AtomicBool>>,
        n_closes: Rc<Cell<usize>>,
    }

    impl RowCursor for ScriptedCursor {
        fn columns(&self) -> &[String] {
            &self.columns
        }

        fn next_row(&mut self) -> ExportResult<Option<Row>> {
            if self.fail_at == Some(self.n_idx_row) {
                return Err(ExportError::CursorRead {
                    row: self.n_idx_row,
                    message: "connection reset".to_string(),
                });
            }
            let row = self.rows.get(self.n_idx_row).cloned();
            self.n_idx_row += 1;
            if let Some(flag) = &self.flag_after_first {
                flag.store(true, Ordering::Relaxed);
            }
            Ok(row)
        }

        fn close(&mut self) -> ExportResult<()> {
            self.n_closes.set(self.n_closes.get() + 1);
            if self.if_close_fails {
                return Err(ExportError::Connection("close refused".to_string()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct ScriptedSource {
        rows: Vec<Row>,
        fail_at: Option<usize>,
        if_close_fails: bool,
        flag_after_first: Option<Arc<AtomicBool>>,
        n_closes: Rc<Cell<usize>>,
    }

    impl QuerySource for ScriptedSource {
        fn query(&mut self, _sql: &str) -> ExportResult<Box<dyn RowCursor + '_>> {
            Ok(Box::new(ScriptedCursor {
                columns: columns(),
                rows: self.rows.clone(),
                n_idx_row: 0,
                fail_at: self.fail_at,
                if_close_fails: self.if_close_fails,
                flag_after_first: self.flag_after_first.clone(),
                n_closes: Rc::clone(&self.n_closes),
            }))
        }
    }

    struct RefusingSource;

    impl QuerySource for RefusingSource {
        fn query(&mut self, _sql: &str) -> ExportResult<Box<dyn RowCursor + '_>> {
            Err(ExportError::Connection("refused".to_string()))
        }
    }

    fn columns() -> Vec<String> {
        vec!["name".to_string(), "coins".to_string()]
    }

    fn alice_and_bob() -> Vec<Row> {
        vec![
            Row::from_texts([Some("Alice"), Some(r#"[{"x":3,"y":2}]"#)]),
            Row::from_texts([Some("Bob"), Some("")]),
        ]
    }

    fn options_for(path_output: PathBuf) -> SpecExportOptions {
        SpecExportOptions {
            path_output,
            aggregate_column: EnumColumnIdentifier::Name("coins".to_string()),
            ..Default::default()
        }
    }

    fn read_zip_entry(path: &Path, name: &str) -> String {
        let file = fs::File::open(path).expect("open xlsx");
        let mut archive = zip::ZipArchive::new(file).expect("xlsx is a zip archive");
        let mut entry = archive.by_name(name).expect("entry exists");
        let mut c_text = String::new();
        entry.read_to_string(&mut c_text).expect("utf-8 entry");
        c_text
    }

    #[test]
    fn test_end_to_end_alice_and_bob() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("upload").join("user_coin_list.xlsx");

        let mut source = MemorySource::new(columns(), alice_and_bob());
        let mut exporter = Exporter::new(options_for(path_out.clone()));
        let outcome = exporter
            .run(&mut source, "SELECT * FROM users")
            .expect("export");

        assert_eq!(outcome.path, path_out);
        assert_eq!(outcome.report.cnt_rows, 2);
        assert_eq!(outcome.report.cnt_aggregated, 1);
        assert_eq!(outcome.report.cnt_degraded, 0);
        assert_eq!(exporter.state(), &EnumExportState::Done(path_out.clone()));

        let c_workbook = read_zip_entry(&path_out, "xl/workbook.xml");
        assert!(c_workbook.contains("name=\"Sheet1\""));
        let c_strings = read_zip_entry(&path_out, "xl/sharedStrings.xml");
        for c_expected in ["name", "coins", "Alice", "5", "Bob"] {
            assert!(c_strings.contains(&format!("<t>{c_expected}</t>")));
        }
        let c_sheet = read_zip_entry(&path_out, "xl/worksheets/sheet1.xml");
        assert_eq!(c_sheet.matches("t=\"s\"").count(), 5);
    }

    #[test]
    fn test_cursor_failure_on_second_row_leaves_no_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("out.xlsx");

        let mut source = ScriptedSource {
            rows: alice_and_bob(),
            fail_at: Some(1),
            ..Default::default()
        };
        let mut exporter = Exporter::new(options_for(path_out.clone()));
        let err = exporter.run(&mut source, "q").unwrap_err();

        assert!(matches!(err, ExportError::CursorRead { row: 1, .. }));
        assert_eq!(
            exporter.state(),
            &EnumExportState::Failed(EnumExportErrorKind::CursorRead)
        );
        assert_eq!(source.n_closes.get(), 1);
        assert!(!path_out.exists());
    }

    #[test]
    fn test_cursor_closed_once_on_success() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut source = ScriptedSource {
            rows: alice_and_bob(),
            ..Default::default()
        };
        let mut exporter = Exporter::new(options_for(tmp.path().join("out.xlsx")));
        exporter.run(&mut source, "q").expect("export");
        assert_eq!(source.n_closes.get(), 1);
    }

    #[test]
    fn test_close_failure_after_clean_stream_is_cursor_read() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("out.xlsx");
        let mut source = ScriptedSource {
            rows: alice_and_bob(),
            if_close_fails: true,
            ..Default::default()
        };
        let mut exporter = Exporter::new(options_for(path_out.clone()));
        let err = exporter.run(&mut source, "q").unwrap_err();

        assert!(matches!(err, ExportError::CursorRead { row: 2, .. }));
        assert!(!path_out.exists());
    }

    #[test]
    fn test_stream_error_wins_over_close_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut source = ScriptedSource {
            rows: alice_and_bob(),
            fail_at: Some(0),
            if_close_fails: true,
            ..Default::default()
        };
        let mut exporter = Exporter::new(options_for(tmp.path().join("out.xlsx")));
        let err = exporter.run(&mut source, "q").unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_rows_keep_cursor_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("out.xlsx");
        let l_rows: Vec<Row> = (0..50)
            .map(|n_idx| {
                let c_name = format!("user{n_idx}");
                Row::from_texts([Some(c_name.as_str()), None])
            })
            .collect();

        let mut source = MemorySource::new(columns(), l_rows);
        let mut exporter = Exporter::new(options_for(path_out.clone()));
        let outcome = exporter.run(&mut source, "q").expect("export");
        assert_eq!(outcome.report.cnt_rows, 50);

        let c_strings = read_zip_entry(&path_out, "xl/sharedStrings.xml");
        let l_positions: Vec<usize> = (0..50)
            .map(|n_idx| {
                c_strings
                    .find(&format!("<t>user{n_idx}</t>"))
                    .expect("name present")
            })
            .collect();
        assert!(l_positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_degraded_payloads_are_reported_not_fatal() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut source = MemorySource::new(
            columns(),
            vec![
                Row::from_texts([Some("Carol"), Some("not json")]),
                Row::from_texts([Some("Dave"), Some(r#"[{"a":10},{"b":"x"}]"#)]),
            ],
        );
        let mut exporter = Exporter::new(options_for(tmp.path().join("out.xlsx")));
        let outcome = exporter.run(&mut source, "q").expect("export");

        assert_eq!(outcome.report.cnt_aggregated, 2);
        assert_eq!(outcome.report.cnt_degraded, 2);
        assert_eq!(outcome.report.cnt_degradations, 2);
        assert!(outcome.report.warnings[0].starts_with("row 0 col 1:"));
    }

    #[test]
    fn test_cancel_flag_stops_at_row_boundary() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("out.xlsx");
        let flag = Arc::new(AtomicBool::new(false));

        let mut source = ScriptedSource {
            rows: alice_and_bob(),
            flag_after_first: Some(Arc::clone(&flag)),
            ..Default::default()
        };
        let mut exporter = Exporter::new(SpecExportOptions {
            cancel_flag: Some(flag),
            ..options_for(path_out.clone())
        });
        let err = exporter.run(&mut source, "q").unwrap_err();

        assert!(matches!(err, ExportError::Cancelled(1)));
        assert_eq!(
            exporter.state(),
            &EnumExportState::Failed(EnumExportErrorKind::Cancelled)
        );
        assert_eq!(source.n_closes.get(), 1);
        assert!(!path_out.exists());
    }

    #[test]
    fn test_unknown_aggregate_column_fails_before_rows() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut source = ScriptedSource {
            rows: alice_and_bob(),
            fail_at: Some(0),
            ..Default::default()
        };
        let mut exporter = Exporter::new(SpecExportOptions {
            aggregate_column: EnumColumnIdentifier::Name("gold".to_string()),
            ..options_for(tmp.path().join("out.xlsx"))
        });
        let err = exporter.run(&mut source, "q").unwrap_err();

        assert!(matches!(err, ExportError::UnknownColumn(_)));
        assert_eq!(
            exporter.state(),
            &EnumExportState::Failed(EnumExportErrorKind::Configuration)
        );
        assert_eq!(source.n_closes.get(), 1);
    }

    #[test]
    fn test_query_failure_goes_straight_to_failed() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut exporter = Exporter::new(options_for(tmp.path().join("out.xlsx")));
        let err = exporter.run(&mut RefusingSource, "q").unwrap_err();

        assert_eq!(err.kind(), EnumExportErrorKind::Connection);
        assert_eq!(
            exporter.state(),
            &EnumExportState::Failed(EnumExportErrorKind::Connection)
        );
    }

    #[test]
    fn test_unwritable_output_is_write_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_blocker = tmp.path().join("blocker");
        fs::write(&path_blocker, b"file").unwrap();

        let mut source = ScriptedSource {
            rows: alice_and_bob(),
            ..Default::default()
        };
        let mut exporter = Exporter::new(options_for(path_blocker.join("out.xlsx")));
        let err = exporter.run(&mut source, "q").unwrap_err();

        assert_eq!(err.kind(), EnumExportErrorKind::Write);
        assert_eq!(
            exporter.state(),
            &EnumExportState::Failed(EnumExportErrorKind::Write)
        );
        assert_eq!(source.n_closes.get(), 1);
    }

    #[test]
    fn test_default_binding_past_last_column_exports_as_is() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("out.xlsx");

        let mut source = MemorySource::new(
            columns(),
            vec![Row::from_texts([Some("Alice"), Some(r#"[{"x":3}]"#)])],
        );
        let mut exporter = Exporter::new(SpecExportOptions {
            path_output: path_out.clone(),
            ..Default::default()
        });
        let outcome = exporter.run(&mut source, "q").expect("export");

        assert_eq!(outcome.report.cnt_rows, 1);
        assert_eq!(outcome.report.cnt_aggregated, 0);
        assert!(outcome.report.warnings[0].contains("#5"));
        assert_eq!(exporter.state(), &EnumExportState::Done(path_out.clone()));

        let c_strings = read_zip_entry(&path_out, "xl/sharedStrings.xml");
        assert!(c_strings.contains(r#"<t>[{"x":3}]</t>"#));
    }

    #[test]
    fn test_short_row_from_cursor_is_cursor_read() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("out.xlsx");

        let mut source = ScriptedSource {
            rows: vec![
                Row::from_texts([Some("Alice"), Some("[]")]),
                Row::from_texts([Some("Bob")]),
            ],
            ..Default::default()
        };
        let mut exporter = Exporter::new(options_for(path_out.clone()));
        let err = exporter.run(&mut source, "q").unwrap_err();

        assert!(matches!(err, ExportError::CursorRead { row: 1, .. }));
        assert_eq!(
            exporter.state(),
            &EnumExportState::Failed(EnumExportErrorKind::CursorRead)
        );
        assert_eq!(source.n_closes.get(), 1);
        assert!(!path_out.exists());
    }

    #[test]
    fn test_overlong_identity_cell_is_truncated() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let c_payload = "y".repeat(40_000);

        let mut source = MemorySource::new(
            columns(),
            vec![Row::from_texts([Some(c_payload.as_str()), Some("[]")])],
        );
        let mut exporter = Exporter::new(options_for(tmp.path().join("out.xlsx")));
        let outcome = exporter.run(&mut source, "q").expect("export");

        assert_eq!(outcome.report.cnt_truncated, 1);
        assert!(
            outcome
                .report
                .warnings
                .iter()
                .any(|c_warning| c_warning.contains("truncated"))
        );
    }
}
