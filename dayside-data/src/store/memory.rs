//! In-memory datastore
//!
//! Test double for the PostgREST store: the same capability semantics
//! against a mutex-guarded table map, plus operation counters so tests can
//! assert how many network writes an operation would have issued.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use dayside_common::Result;

use super::{Datastore, Filter, Page, Row};

/// Counts of issued operations, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounts {
    pub selects: u64,
    pub inserts: u64,
    pub updates: u64,
    pub upserts: u64,
    pub deletes: u64,
}

impl OpCounts {
    /// Total mutating operations.
    pub fn writes(&self) -> u64 {
        self.inserts + self.updates + self.upserts + self.deletes
    }
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Vec<Row>>,
    counts: OpCounts,
}

/// In-memory `Datastore` implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pre-populate `table` with rows, bypassing counters.
    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        self.lock().tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn op_counts(&self) -> OpCounts {
        self.lock().counts
    }
}

fn conflict_key(row: &Row, conflict_columns: &[&str]) -> Vec<serde_json::Value> {
    conflict_columns
        .iter()
        .map(|col| row.get(*col).cloned().unwrap_or(serde_json::Value::Null))
        .collect()
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Row>> {
        let mut inner = self.lock();
        inner.counts.selects += 1;
        let matched = inner
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)))
            .into_iter()
            .flatten();

        let offset = page.offset.unwrap_or(0) as usize;
        let limit = page.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let projected = matched
            .skip(offset)
            .take(limit)
            .map(|row| {
                if columns.is_empty() {
                    row.clone()
                } else {
                    columns
                        .iter()
                        .filter_map(|col| row.get(*col).map(|v| ((*col).to_string(), v.clone())))
                        .collect()
                }
            })
            .collect();
        Ok(projected)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut inner = self.lock();
        inner.counts.inserts += 1;
        let stored = inner.tables.entry(table.to_string()).or_default();
        stored.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<Vec<Row>> {
        let mut inner = self.lock();
        inner.counts.updates += 1;
        let mut updated = Vec::new();
        if let Some(rows) = inner.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                for (col, value) in &patch {
                    row.insert(col.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Row>,
        conflict_columns: &[&str],
    ) -> Result<Vec<Row>> {
        let mut inner = self.lock();
        inner.counts.upserts += 1;
        let stored = inner.tables.entry(table.to_string()).or_default();
        let mut result = Vec::with_capacity(rows.len());

        for row in rows {
            let key = conflict_key(&row, conflict_columns);
            let existing = stored
                .iter_mut()
                .find(|r| conflict_key(r, conflict_columns) == key);
            match existing {
                Some(target) => {
                    for (col, value) in row {
                        target.insert(col, value);
                    }
                    result.push(target.clone());
                }
                None => {
                    stored.push(row.clone());
                    result.push(row);
                }
            }
        }
        Ok(result)
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<u64> {
        let mut inner = self.lock();
        inner.counts.deletes += 1;
        let Some(rows) = inner.tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        Ok((before - rows.len()) as u64)
    }
}
