//! Row queries: equality filters, ordering and free-text search.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A row as returned by the store.
pub type Row = Map<String, Value>;

/// A read against one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub search: Option<TextSearch>,
}

/// `field = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

/// Case-insensitive substring match of `term` against text columns, or
/// against any element of tag-array columns. A row matches if any column does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSearch {
    pub term: String,
    pub text_fields: Vec<String>,
    pub tag_fields: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order.push(Order {
            field: field.into(),
            descending,
        });
        self
    }

    #[must_use]
    pub fn search(mut self, search: TextSearch) -> Self {
        self.search = Some(search);
        self
    }

    /// Whether `row` passes every filter and the text search.
    pub fn matches(&self, row: &Row) -> bool {
        let filters_ok = self
            .filters
            .iter()
            .all(|f| row.get(&f.field).unwrap_or(&Value::Null) == &f.value);
        filters_ok && self.search.as_ref().is_none_or(|s| s.matches(row))
    }

    /// Sorts rows in place by the query's ordering terms.
    pub fn sort(&self, rows: &mut [Row]) {
        rows.sort_by(|a, b| {
            for term in &self.order {
                let ord = compare_values(a.get(&term.field), b.get(&term.field));
                let ord = if term.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}

impl TextSearch {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn text(mut self, field: impl Into<String>) -> Self {
        self.text_fields.push(field.into());
        self
    }

    #[must_use]
    pub fn tags(mut self, field: impl Into<String>) -> Self {
        self.tag_fields.push(field.into());
        self
    }

    /// Whether any searched column contains the term. A blank term matches
    /// every row.
    pub fn matches(&self, row: &Row) -> bool {
        let needle = self.term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let contains = |s: &str| s.to_lowercase().contains(&needle);
        let in_text = self
            .text_fields
            .iter()
            .filter_map(|f| row.get(f).and_then(Value::as_str))
            .any(contains);
        let in_tags = self
            .tag_fields
            .iter()
            .filter_map(|f| row.get(f).and_then(Value::as_array))
            .flatten()
            .filter_map(Value::as_str)
            .any(contains);
        in_text || in_tags
    }
}

/// Orders JSON scalars; missing and null values sort last.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}
