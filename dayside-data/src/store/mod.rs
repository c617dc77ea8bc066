//! Datastore boundary
//!
//! The record layer never issues SQL; it talks to a capability object
//! exposing table-scoped query-builder primitives. `RestStore` implements
//! the capability against a PostgREST-style remote (Supabase); `MemoryStore`
//! implements it in memory for tests.

mod memory;
mod postgrest;

pub use memory::{MemoryStore, OpCounts};
pub use postgrest::RestStore;

use async_trait::async_trait;
use dayside_common::Result;

/// A remote row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// One filter clause operator.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Eq(serde_json::Value),
    Neq(serde_json::Value),
    /// Column value must be one of the listed values.
    In(Vec<serde_json::Value>),
    IsNull,
    NotNull,
}

/// Conjunction of column clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, FilterOp)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.clauses.push((column.into(), FilterOp::Eq(value.into())));
        self
    }

    pub fn neq(mut self, column: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.clauses.push((column.into(), FilterOp::Neq(value.into())));
        self
    }

    /// Restrict `column` to a list of permissible values.
    pub fn any_of(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = serde_json::Value>,
    ) -> Self {
        self.clauses
            .push((column.into(), FilterOp::In(values.into_iter().collect())));
        self
    }

    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.clauses.push((column.into(), FilterOp::IsNull));
        self
    }

    pub fn not_null(mut self, column: impl Into<String>) -> Self {
        self.clauses.push((column.into(), FilterOp::NotNull));
        self
    }

    pub fn clauses(&self) -> &[(String, FilterOp)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether `row` satisfies every clause. JSON equality is structural.
    pub fn matches(&self, row: &Row) -> bool {
        self.clauses.iter().all(|(column, op)| {
            let cell = row.get(column.as_str()).unwrap_or(&serde_json::Value::Null);
            match op {
                FilterOp::Eq(v) => cell == v,
                FilterOp::Neq(v) => cell != v,
                FilterOp::In(values) => values.contains(cell),
                FilterOp::IsNull => cell.is_null(),
                FilterOp::NotNull => !cell.is_null(),
            }
        })
    }
}

/// Pagination window for `select`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }

    pub fn window(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }
}

/// Table-scoped query-builder capability.
///
/// Implementations report transport or remote failures as `Error::Api`;
/// "no rows matched" is an empty result, never an error.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Select rows, optionally projecting to `columns` (empty = all).
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Row>>;

    /// Insert rows, returning them as stored.
    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>>;

    /// Apply `patch` to every row matching `filter`, returning updated rows.
    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<Vec<Row>>;

    /// Insert-or-update keyed by `conflict_columns`, returning stored rows.
    async fn upsert(&self, table: &str, rows: Vec<Row>, conflict_columns: &[&str])
        -> Result<Vec<Row>>;

    /// Delete matching rows, returning how many were removed.
    async fn delete(&self, table: &str, filter: &Filter) -> Result<u64>;
}
