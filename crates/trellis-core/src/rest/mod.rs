//! Table access over PostgREST.
//!
//! Stores talk to the backend through [`DataService`], so they can run
//! against [`RestClient`] in production and an in-memory table set in tests.

mod client;

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

pub use client::RestClient;

/// Row filter, rendered as PostgREST operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `column=eq.value`
    Eq { column: String, value: String },
    /// `column=in.(a,b)`
    In { column: String, values: Vec<String> },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.to_string(),
        }
    }

    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(|value| value.to_string()).collect(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. } | Self::In { column, .. } => column,
        }
    }

    /// Query-string pair for this filter.
    pub fn to_query_pair(&self) -> (String, String) {
        match self {
            Self::Eq { column, value } => (column.clone(), format!("eq.{value}")),
            Self::In { column, values } => {
                let joined = values
                    .iter()
                    .map(|value| quote_list_value(value))
                    .collect::<Vec<_>>()
                    .join(",");
                (column.clone(), format!("in.({joined})"))
            }
        }
    }

    /// Whether a JSON row satisfies this filter.
    pub fn matches(&self, row: &Value) -> bool {
        let cell = row.get(self.column()).and_then(cell_text);
        match (self, cell) {
            (Self::Eq { value, .. }, Some(cell)) => cell == *value,
            (Self::In { values, .. }, Some(cell)) => values.iter().any(|value| *value == cell),
            (_, None) => false,
        }
    }
}

/// Values inside `in.(…)` that carry reserved characters must be quoted.
fn quote_list_value(value: &str) -> String {
    let reserved = value.is_empty()
        || value
            .chars()
            .any(|ch| matches!(ch, ',' | '(' | ')' | '"' | '\\' | ' ' | ':' | '.'));
    if reserved {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    fn to_query_value(&self) -> String {
        let direction = if self.ascending { "asc" } else { "desc" };
        format!("{}.{direction}", self.column)
    }
}

/// A `select` against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    #[must_use]
    pub fn in_list<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.filters.push(Filter::in_list(column, values));
        self
    }

    #[must_use]
    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending: false,
        });
        self
    }

    #[must_use]
    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending: true,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Full query string: columns, filters, order, limit.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];
        pairs.extend(self.filters.iter().map(Filter::to_query_pair));
        if let Some(order) = &self.order {
            pairs.push(("order".to_string(), order.to_query_value()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// Row-level operations against the hosted tables.
pub trait DataService: Send + Sync + 'static {
    fn select(&self, query: &Query) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Insert one row and return the stored representation.
    fn insert(&self, table: &str, row: Value) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Patch every row matching `filters` and return the updated rows.
    fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> impl Future<Output = Result<Vec<Value>>> + Send;

    fn delete(&self, table: &str, filters: &[Filter]) -> impl Future<Output = Result<()>> + Send;
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(Error::from))
        .collect()
}

/// First row of a single-row response, as `.single()` does on the client.
pub fn decode_single<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Result<T> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(format!("{table}: no row returned")))?;
    Ok(serde_json::from_value(row)?)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cmp::Ordering;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value};

    use super::*;

    /// Table set kept in memory. Inserted rows without an `id` get a
    /// sequential integer id.
    #[derive(Clone, Default)]
    pub struct MemoryData {
        tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
        failing: Arc<Mutex<Vec<String>>>,
        next_id: Arc<Mutex<u64>>,
    }

    impl MemoryData {
        pub fn seed(&self, table: &str, rows: Vec<Value>) {
            self.tables
                .lock()
                .unwrap()
                .entry(table.to_string())
                .or_default()
                .extend(rows);
        }

        pub fn rows(&self, table: &str) -> Vec<Value> {
            self.tables
                .lock()
                .unwrap()
                .get(table)
                .cloned()
                .unwrap_or_default()
        }

        /// Every later operation on `table` answers with a 500.
        pub fn fail_table(&self, table: &str) {
            self.failing.lock().unwrap().push(table.to_string());
        }

        fn check(&self, table: &str) -> Result<()> {
            if self.failing.lock().unwrap().iter().any(|name| name == table) {
                return Err(Error::Remote {
                    status: 500,
                    message: format!("{table} unavailable"),
                });
            }
            Ok(())
        }
    }

    fn compare_cells(left: &Value, right: &Value, column: &str) -> Ordering {
        match (left.get(column), right.get(column)) {
            (Some(Value::Number(a)), Some(Value::Number(b))) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
            (Some(a), Some(b)) => cell_text(a).cmp(&cell_text(b)),
            (a, b) => a.is_some().cmp(&b.is_some()),
        }
    }

    impl DataService for MemoryData {
        async fn select(&self, query: &Query) -> Result<Vec<Value>> {
            self.check(&query.table)?;
            let mut rows: Vec<Value> = self
                .rows(&query.table)
                .into_iter()
                .filter(|row| query.filters.iter().all(|filter| filter.matches(row)))
                .collect();
            if let Some(order) = &query.order {
                rows.sort_by(|a, b| {
                    let ordering = compare_cells(a, b, &order.column);
                    if order.ascending {
                        ordering
                    } else {
                        ordering.reverse()
                    }
                });
            }
            if let Some(limit) = query.limit {
                rows.truncate(limit);
            }
            Ok(rows)
        }

        async fn insert(&self, table: &str, mut row: Value) -> Result<Vec<Value>> {
            self.check(table)?;
            if let Some(object) = row.as_object_mut() {
                if !object.contains_key("id") {
                    let mut next_id = self.next_id.lock().unwrap();
                    *next_id += 1;
                    object.insert("id".to_string(), json!(*next_id));
                }
            }
            self.seed(table, vec![row.clone()]);
            Ok(vec![row])
        }

        async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
            self.check(table)?;
            let mut tables = self.tables.lock().unwrap();
            let mut updated = Vec::new();
            for row in tables.entry(table.to_string()).or_default() {
                if !filters.iter().all(|filter| filter.matches(row)) {
                    continue;
                }
                if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                    for (key, value) in fields {
                        target.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
            Ok(updated)
        }

        async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
            self.check(table)?;
            if let Some(rows) = self.tables.lock().unwrap().get_mut(table) {
                rows.retain(|row| !filters.iter().all(|filter| filter.matches(row)));
            }
            Ok(())
        }
    }
}
