//! Coin payload aggregator.
//!
//! A payload is a JSON array of objects. The total is the sum of the number
//! fields sitting directly on each object; values nested any deeper are never
//! visited. Anything that does not fit that shape degrades the total instead
//! of failing the export.

use std::fmt;

use serde_json::{Number, Value};

/// Non-fatal diagnostic raised while reducing one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// Payload could not be decoded; total is 0.
    ///
    /// Besides invalid JSON this covers payloads nested deeper than the
    /// decoder's 128-level limit and numbers outside `f64` range (`1e400`).
    /// The whole payload is rejected, including any valid top-level fields.
    Malformed(String),
    /// Root is not an array; total is 0.
    NotAnArray(&'static str),
    /// Array element `element` is not an object and was skipped.
    NonObjectElement {
        element: usize,
        kind: &'static str,
    },
    /// Field `field` of element `element` is not a number and was skipped.
    NonNumericField {
        element: usize,
        field: String,
        kind: &'static str,
    },
    /// Adding field `field` of element `element` saturated the total.
    Overflow { element: usize, field: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "payload is not valid JSON: {msg}"),
            Self::NotAnArray(kind) => write!(f, "payload root is {kind}, not an array"),
            Self::NonObjectElement { element, kind } => {
                write!(f, "element {element} is {kind}, not an object")
            }
            Self::NonNumericField {
                element,
                field,
                kind,
            } => write!(f, "element {element} field {field:?} is {kind}, not a number"),
            Self::Overflow { element, field } => {
                write!(f, "total saturated at element {element} field {field:?}")
            }
        }
    }
}

/// Total for one payload plus the diagnostics raised on the way.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Aggregation {
    pub total: i64,
    pub degradations: Vec<Degradation>,
}

impl Aggregation {
    /// Base-10 rendering without grouping separators.
    pub fn render(&self) -> String {
        self.total.to_string()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Reduce one non-empty raw payload to its coin total.
pub fn aggregate_total(raw: &[u8]) -> Aggregation {
    let mut aggregation = Aggregation::default();

    let root = match serde_json::from_slice::<Value>(raw) {
        Ok(root) => root,
        Err(err) => {
            aggregation
                .degradations
                .push(Degradation::Malformed(err.to_string()));
            return aggregation;
        }
    };

    let l_elements = match root {
        Value::Array(l_elements) => l_elements,
        other => {
            aggregation
                .degradations
                .push(Degradation::NotAnArray(describe_value_kind(&other)));
            return aggregation;
        }
    };

    for (n_idx_element, element) in l_elements.iter().enumerate() {
        let Value::Object(dict_fields) = element else {
            aggregation.degradations.push(Degradation::NonObjectElement {
                element: n_idx_element,
                kind: describe_value_kind(element),
            });
            continue;
        };

        for (c_field, value) in dict_fields {
            match value {
                Value::Number(number) => {
                    let (n_value, if_clamped) = derive_integer_value(number);
                    let n_total_prev = aggregation.total;
                    let n_total_checked = n_total_prev.checked_add(n_value);
                    if if_clamped || n_total_checked.is_none() {
                        aggregation.degradations.push(Degradation::Overflow {
                            element: n_idx_element,
                            field: c_field.clone(),
                        });
                    }
                    aggregation.total =
                        n_total_checked.unwrap_or_else(|| n_total_prev.saturating_add(n_value));
                }
                Value::Null
                | Value::Bool(_)
                | Value::String(_)
                | Value::Array(_)
                | Value::Object(_) => {
                    aggregation.degradations.push(Degradation::NonNumericField {
                        element: n_idx_element,
                        field: c_field.clone(),
                        kind: describe_value_kind(value),
                    });
                }
            }
        }
    }

    aggregation
}

/// Integer value of a JSON number and whether it had to be clamped.
///
/// Fractions truncate toward zero; magnitudes beyond `i64` saturate.
pub fn derive_integer_value(number: &Number) -> (i64, bool) {
    if let Some(n_value) = number.as_i64() {
        return (n_value, false);
    }
    if number.as_u64().is_some() {
        return (i64::MAX, true);
    }
    let Some(f_value) = number.as_f64() else {
        return (0, true);
    };
    let if_out_of_range = !(i64::MIN as f64..=i64::MAX as f64).contains(&f_value);
    (f_value as i64, if_out_of_range)
}

fn describe_value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
