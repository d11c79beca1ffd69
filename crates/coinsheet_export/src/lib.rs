//! `coinsheet_export` v1:
//! query result -> coin totals -> single-sheet workbook.
//!
//! Modules:
//! - `aggregate` : coin payload aggregator
//! - `cursor`    : row cursor trait and in-memory cursor
//! - `source`    : query sources (polars SQL, in-memory)
//! - `transform` : per-column transforms and their binding
//! - `export`    : orchestrator state machine
//! - `report`    : run-time report model
//! - `spec`      : enums/options/errors

pub mod aggregate;
pub mod conf;
pub mod cursor;
pub mod export;
pub mod report;
pub mod source;
pub mod spec;
pub mod transform;

pub use aggregate::{Aggregation, Degradation, aggregate_total};
pub use cursor::{MemoryCursor, RawCell, Row, RowCursor};
pub use export::Exporter;
pub use report::{ExportOutcome, ExportReport};
pub use source::{FrameCursor, FrameSqlSource, MemorySource, QuerySource};
pub use spec::{
    EnumColumnIdentifier, EnumExportErrorKind, EnumExportState, ExportError, ExportResult,
    SpecExportOptions,
};
pub use transform::{CellOutput, ColumnTransformRegistry, EnumColumnTransform};
