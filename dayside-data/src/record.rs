//! Active-record base
//!
//! A `Record` is a live attribute bag typed by a static `ModelDef`, with
//! dirty tracking, change notifications, and CRUD against an injected
//! `Datastore`. Domain models wrap a `Record` and add typed accessors; the
//! base stays string-keyed so aggregates can operate generically.
//!
//! Lifecycle: a directly constructed record starts dirty (assumed unsaved);
//! a record materialized from a remote row starts clean; `remove` is
//! terminal, so any operation on a removed record is a contract error.

use std::collections::BTreeMap;

use dayside_common::{Error, Notifier, Result};
use uuid::Uuid;

use crate::fields::ModelDef;
use crate::store::{Datastore, Filter, Page, Row};
use crate::value::{self, FieldKind, Value};

static NULL: Value = Value::Null;

/// Payload of an `update_<field>` notification.
///
/// The payload carries the changed field and its new value rather than the
/// emitting record: `set` holds the record exclusively while notifying, so
/// the record cannot also be handed to its own subscribers. Listeners
/// needing the rest of the record already hold a handle to it.
#[derive(Debug, Clone)]
pub struct FieldChange {
    pub field: &'static str,
    pub value: Value,
}

/// Generic record over a declared field set.
#[derive(Debug)]
pub struct Record {
    def: &'static ModelDef,
    attrs: BTreeMap<&'static str, Value>,
    dirty: bool,
    deleted: bool,
    notifier: Notifier<FieldChange>,
}

impl Record {
    /// Construct a new, unsaved record.
    ///
    /// Declared defaults are applied, and every required field of kind
    /// `Uuid` with no value receives a freshly generated v4 UUID. Other
    /// required fields stay unset until assigned; `save` enforces their
    /// presence before anything reaches the remote store.
    pub fn new(def: &'static ModelDef) -> Self {
        let mut attrs = BTreeMap::new();
        for field in def.fields {
            if let Some(default) = &field.default {
                attrs.insert(field.name, default.materialize());
            } else if field.required && field.kind == FieldKind::Uuid {
                attrs.insert(field.name, Value::Uuid(Uuid::new_v4()));
            }
        }
        Self {
            def,
            attrs,
            dirty: true,
            deleted: false,
            notifier: Notifier::new(),
        }
    }

    /// Materialize a clean record from a remote row.
    ///
    /// Columns without a declared field are skipped; the remote is allowed
    /// to carry more than this model declares.
    pub fn from_row(def: &'static ModelDef, row: &Row) -> Result<Self> {
        let mut attrs = BTreeMap::new();
        for (column, raw) in row {
            let Some(field) = def.by_column(column) else {
                tracing::trace!(table = def.table, column, "ignoring undeclared column");
                continue;
            };
            attrs.insert(field.name, value::cast_json(field.kind, raw.clone())?);
        }
        Ok(Self {
            def,
            attrs,
            dirty: false,
            deleted: false,
            notifier: Notifier::new(),
        })
    }

    pub fn def(&self) -> &'static ModelDef {
        self.def
    }

    pub fn table(&self) -> &'static str {
        self.def.table
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Clear the dirty flag without touching the bag.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Change notifications for this record (`update_<field>` events).
    pub fn notifier(&self) -> &Notifier<FieldChange> {
        &self.notifier
    }

    /// Strict attribute read: an undeclared field is a contract error.
    pub fn get(&self, field: &str) -> Result<&Value> {
        let fdef = self
            .def
            .field(field)
            .ok_or_else(|| Error::Contract(format!("{}: no declared field '{field}'", self.def.table)))?;
        Ok(self.attrs.get(fdef.name).unwrap_or(&NULL))
    }

    /// Lenient attribute read: `Null` for unset (or undeclared) fields.
    /// Generated accessors use this; the field name is statically known.
    pub fn peek(&self, field: &str) -> &Value {
        self.attrs.get(field).unwrap_or(&NULL)
    }

    /// Whether the field currently holds a value in the bag.
    pub fn is_set(&self, field: &str) -> bool {
        self.attrs.contains_key(field)
    }

    /// Iterate over set attributes.
    pub fn attrs(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.attrs.iter().map(|(k, v)| (*k, v))
    }

    /// Value of the record's id field, when it is a UUID.
    pub fn id(&self) -> Option<Uuid> {
        let field = self.def.by_column(self.def.id_column)?;
        self.peek(field.name).as_uuid()
    }

    /// Assign an attribute.
    ///
    /// The value is coerced to the field's declared kind; a failed coercion
    /// leaves the bag unchanged. Assigning a deep-equal value is a silent
    /// no-op. Otherwise the record becomes dirty and exactly one
    /// `update_<field>` notification fires.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        self.ensure_live()?;
        let fdef = self
            .def
            .field(field)
            .ok_or_else(|| Error::Contract(format!("{}: no declared field '{field}'", self.def.table)))?;
        let coerced = value::coerce(fdef.kind, value.into())?;

        if self.attrs.get(fdef.name) == Some(&coerced)
            || (coerced.is_null() && !self.attrs.contains_key(fdef.name))
        {
            return Ok(());
        }

        self.attrs.insert(fdef.name, coerced.clone());
        self.dirty = true;
        self.notifier.notify(
            &format!("update_{}", fdef.name),
            &FieldChange {
                field: fdef.name,
                value: coerced,
            },
        );
        Ok(())
    }

    /// Field-wise merge from another record of the same model, then mark
    /// clean. Changed fields fire their notifications, so listeners attached
    /// to this instance survive a refresh.
    pub fn update_from(&mut self, other: &Record) -> Result<()> {
        if !std::ptr::eq(self.def, other.def) {
            return Err(Error::Contract(format!(
                "cannot merge a '{}' record into a '{}' record",
                other.def.table, self.def.table
            )));
        }
        for (name, value) in other.attrs() {
            self.set(name, value.clone())?;
        }
        self.dirty = false;
        Ok(())
    }

    /// Serialize set attributes to remote-column-keyed JSON. Unset fields
    /// are dropped; explicit nulls are kept.
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        for field in self.def.fields {
            if let Some(v) = self.attrs.get(field.name) {
                row.insert(field.column.to_string(), value::to_json(v));
            }
        }
        row
    }

    fn ensure_live(&self) -> Result<()> {
        if self.deleted {
            return Err(Error::Contract(format!(
                "{}: record has been deleted",
                self.def.table
            )));
        }
        Ok(())
    }

    fn ensure_required(&self) -> Result<()> {
        for field in self.def.fields {
            if field.required && self.peek(field.name).is_null() {
                return Err(Error::Validation(format!(
                    "{}: required field '{}' is not set",
                    self.def.table, field.name
                )));
            }
        }
        Ok(())
    }

    /// Equality filter over the given columns, taken from this record's
    /// current values. A missing key value is a contract error.
    pub fn key_filter(&self, columns: &[&str]) -> Result<Filter> {
        let mut filter = Filter::new();
        for col in columns {
            let field = self.def.by_column(col).ok_or_else(|| {
                Error::Contract(format!("{}: no declared column '{col}'", self.def.table))
            })?;
            let value = self.peek(field.name);
            if value.is_null() {
                return Err(Error::Contract(format!(
                    "{}: key field '{}' is not set",
                    self.def.table, field.name
                )));
            }
            filter = filter.eq(*col, value::to_json(value));
        }
        Ok(filter)
    }

    /// Merge a returned remote row into the bag (through `set`, so
    /// server-filled columns notify listeners), then mark clean.
    fn absorb_row(&mut self, row: &Row) -> Result<()> {
        for (column, raw) in row {
            let Some(field) = self.def.by_column(column) else {
                continue;
            };
            let value = value::cast_json(field.kind, raw.clone())?;
            self.set(field.name, value)?;
        }
        self.dirty = false;
        Ok(())
    }

    /// Persist the record if dirty; a clean record is a no-op.
    ///
    /// A single-column conflict key uses the store's native upsert. A
    /// composite key falls back to select-then-update-or-insert, since
    /// PostgREST upserts want a real unique constraint name and join tables
    /// here key on column pairs.
    pub async fn save(&mut self, store: &dyn Datastore) -> Result<()> {
        self.ensure_live()?;
        if !self.dirty {
            tracing::trace!(table = self.def.table, "save skipped, record clean");
            return Ok(());
        }
        self.ensure_required()?;
        let row = self.to_row();

        let returned = if self.def.conflict_columns.len() == 1 {
            store
                .upsert(self.def.table, vec![row], self.def.conflict_columns)
                .await?
        } else {
            let filter = self.key_filter(self.def.conflict_columns)?;
            let existing = store
                .select(self.def.table, &[], &filter, Page::limit(1))
                .await?;
            if existing.is_empty() {
                store.insert(self.def.table, vec![row]).await?
            } else {
                store.update(self.def.table, &filter, row).await?
            }
        };

        match returned.first() {
            Some(row) => self.absorb_row(row)?,
            None => {
                tracing::warn!(table = self.def.table, "save returned no row");
                self.dirty = false;
            }
        }
        Ok(())
    }

    /// Insert this record. Delegates to `save`; the conflict key makes a
    /// re-create of an existing row an update rather than a duplicate.
    pub async fn create(&mut self, store: &dyn Datastore) -> Result<()> {
        self.save(store).await
    }

    /// Re-read this record from the remote by its id field. Returns whether
    /// a row was found; on a hit the bag is replaced and the record is clean.
    pub async fn read(&mut self, store: &dyn Datastore) -> Result<bool> {
        self.ensure_live()?;
        let filter = self.key_filter(&[self.def.id_column])?;
        let rows = store
            .select(self.def.table, &[], &filter, Page::limit(1))
            .await?;
        match rows.first() {
            Some(row) => {
                self.absorb_row(row)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Persist pending changes (alias for `save`).
    pub async fn update(&mut self, store: &dyn Datastore) -> Result<()> {
        self.save(store).await
    }

    /// Delete this record's remote row by its id field and mark the record
    /// deleted. Returns whether a row was removed.
    pub async fn remove(&mut self, store: &dyn Datastore) -> Result<bool> {
        self.ensure_live()?;
        let filter = self.key_filter(&[self.def.id_column])?;
        let removed = store.delete(self.def.table, &filter).await?;
        self.deleted = true;
        Ok(removed > 0)
    }

    /// Fetch the first record matching `filter`.
    pub async fn fetch(
        def: &'static ModelDef,
        store: &dyn Datastore,
        filter: &Filter,
    ) -> Result<Option<Record>> {
        let rows = store.select(def.table, &[], filter, Page::limit(1)).await?;
        rows.first().map(|row| Record::from_row(def, row)).transpose()
    }

    /// Fetch every record matching `filter` within `page`.
    pub async fn fetch_many(
        def: &'static ModelDef,
        store: &dyn Datastore,
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Record>> {
        let rows = store.select(def.table, &[], filter, page).await?;
        rows.iter().map(|row| Record::from_row(def, row)).collect()
    }

    /// Existence probe with minimal projection.
    pub async fn exists(
        def: &'static ModelDef,
        store: &dyn Datastore,
        filter: &Filter,
    ) -> Result<bool> {
        let rows = store
            .select(def.table, &[def.id_column], filter, Page::limit(1))
            .await?;
        Ok(!rows.is_empty())
    }

    /// Delete every row matching `filter`. Returns whether any was removed.
    pub async fn delete_where(
        def: &'static ModelDef,
        store: &dyn Datastore,
        filter: &Filter,
    ) -> Result<bool> {
        Ok(store.delete(def.table, filter).await? > 0)
    }

    /// Batch-save dirty records in one upsert keyed by the model's conflict
    /// columns, distributing returned rows back by id match.
    ///
    /// Every submitted record comes back clean even when the remote echoed
    /// fewer rows than submitted; the mismatch is logged rather than fatal
    /// so one silently-dropped row cannot wedge a whole refresh cycle.
    /// Returns the number of records submitted.
    pub async fn bulk_upsert(
        store: &dyn Datastore,
        records: &mut [&mut Record],
    ) -> Result<usize> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let def = first.def;
        if records.iter().any(|r| !std::ptr::eq(r.def, def)) {
            return Err(Error::Contract(
                "bulk_upsert requires records of a single model".to_string(),
            ));
        }

        let dirty: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.dirty && !r.deleted)
            .map(|(i, _)| i)
            .collect();
        if dirty.is_empty() {
            return Ok(0);
        }

        let rows: Vec<Row> = dirty.iter().map(|i| records[*i].to_row()).collect();
        let id_columns: Vec<&str> = if def.conflict_columns.contains(&def.id_column) {
            def.conflict_columns.to_vec()
        } else {
            vec![def.id_column]
        };
        let returned = store.upsert(def.table, rows, def.conflict_columns).await?;

        for i in &dirty {
            let record = &mut *records[*i];
            let key: Vec<serde_json::Value> = id_columns
                .iter()
                .map(|col| {
                    record
                        .def
                        .by_column(col)
                        .map(|f| value::to_json(record.peek(f.name)))
                        .unwrap_or(serde_json::Value::Null)
                })
                .collect();
            let echoed = returned.iter().find(|row| {
                id_columns
                    .iter()
                    .zip(&key)
                    .all(|(col, v)| row.get(*col).unwrap_or(&serde_json::Value::Null) == v)
            });
            match echoed {
                Some(row) => record.absorb_row(row)?,
                None => {
                    tracing::warn!(
                        table = def.table,
                        "bulk upsert did not echo a submitted record"
                    );
                    record.mark_clean();
                }
            }
        }

        tracing::debug!(table = def.table, submitted = dirty.len(), "bulk upsert");
        Ok(dirty.len())
    }
}

impl Clone for Record {
    /// Clones the attribute bag and flags; listener subscriptions stay with
    /// the original.
    fn clone(&self) -> Self {
        Self {
            def: self.def,
            attrs: self.attrs.clone(),
            dirty: self.dirty,
            deleted: self.deleted,
            notifier: Notifier::new(),
        }
    }
}
