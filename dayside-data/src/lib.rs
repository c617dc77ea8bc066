//! # Dayside Data Library
//!
//! Typed active-record layer for the Dayside content-management backend:
//! - `value` / `fields`: attribute kinds, casting rules, per-table field
//!   declarations
//! - `record`: the record base (attribute bag, dirty tracking, CRUD)
//! - `store`: the datastore boundary (PostgREST client, in-memory double)
//! - `models`: one domain model per remote table
//! - `aggregates`: multi-record views (user data, web sources)
//! - `tasks`: client for the external panel/transcript/audio creation API

pub mod aggregates;
pub mod fields;
pub mod models;
pub mod record;
pub mod store;
pub mod tasks;
pub mod value;

pub use dayside_common::{Error, Result};
pub use fields::{DefaultValue, FieldDef, ModelDef};
pub use record::{FieldChange, Record};
pub use store::{Datastore, Filter, Page};
pub use value::{EnumDef, FieldKind, Value};
