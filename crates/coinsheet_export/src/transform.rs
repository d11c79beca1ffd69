//! Per-column transforms and the static column binding.

use crate::aggregate::{Aggregation, aggregate_total};
use crate::cursor::Row;
use crate::spec::{EnumColumnIdentifier, ExportError, ExportResult};

/// Transform applied to every cell of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumColumnTransform {
    /// Decode raw bytes as text; NULL becomes an empty string.
    #[default]
    Identity,
    /// Replace a non-empty coin payload with its total.
    AggregateTotal,
}

/// Display text for one cell, plus the aggregation when one ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOutput {
    pub text: String,
    pub aggregation: Option<Aggregation>,
}

impl EnumColumnTransform {
    /// Apply to one raw cell.
    ///
    /// NULL and zero-length cells never reach the aggregator and come out empty.
    pub fn apply(&self, cell: Option<&[u8]>) -> CellOutput {
        match (self, cell) {
            (Self::AggregateTotal, Some(raw)) if !raw.is_empty() => {
                let aggregation = aggregate_total(raw);
                CellOutput {
                    text: aggregation.render(),
                    aggregation: Some(aggregation),
                }
            }
            _ => CellOutput {
                text: decode_identity(cell),
                aggregation: None,
            },
        }
    }
}

/// Raw bytes as text, invalid UTF-8 replaced with U+FFFD.
pub fn decode_identity(cell: Option<&[u8]>) -> String {
    cell.map(|v_bytes| String::from_utf8_lossy(v_bytes).into_owned())
        .unwrap_or_default()
}

/// Column position -> transform map, fixed for one result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTransformRegistry {
    l_transforms: Vec<EnumColumnTransform>,
    n_idx_aggregate: Option<usize>,
}

impl ColumnTransformRegistry {
    /// Bind the aggregator to `aggregate_column` among `columns`.
    ///
    /// A position past the last column binds nothing and every column stays
    /// identity. A name that matches no column is an error.
    pub fn resolve(
        columns: &[String],
        aggregate_column: &EnumColumnIdentifier,
    ) -> ExportResult<Self> {
        let n_idx_aggregate = match aggregate_column {
            EnumColumnIdentifier::Index(n_idx) => (*n_idx < columns.len()).then_some(*n_idx),
            EnumColumnIdentifier::Name(c_name) => Some(
                columns
                    .iter()
                    .position(|c_col| c_col == c_name)
                    .ok_or_else(|| ExportError::UnknownColumn(aggregate_column.clone()))?,
            ),
        };

        let mut l_transforms = vec![EnumColumnTransform::Identity; columns.len()];
        if let Some(n_idx) = n_idx_aggregate {
            l_transforms[n_idx] = EnumColumnTransform::AggregateTotal;
        }

        Ok(Self {
            l_transforms,
            n_idx_aggregate,
        })
    }

    /// Transform for column `idx`; identity outside the bound range.
    pub fn transform_at(&self, idx: usize) -> EnumColumnTransform {
        self.l_transforms.get(idx).copied().unwrap_or_default()
    }

    /// Bound aggregate column, if any.
    pub fn aggregate_index(&self) -> Option<usize> {
        self.n_idx_aggregate
    }

    pub fn width(&self) -> usize {
        self.l_transforms.len()
    }

    /// Transform every cell of `row`, in column order.
    pub fn apply_row(&self, row: &Row) -> Vec<CellOutput> {
        (0..row.width())
            .map(|n_idx_col| self.transform_at(n_idx_col).apply(row.cell(n_idx_col)))
            .collect()
    }
}
