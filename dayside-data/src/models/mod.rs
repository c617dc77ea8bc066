//! Domain models, one per remote table
//!
//! Each model is declared through `domain_model!`: the macro fixes the
//! table name, conflict key, and field set at definition time and generates
//! the wrapper struct, its static `ModelDef`, CRUD plumbing, and typed
//! accessors (the definition-time replacement for proxy-based attribute
//! access). Models deref to the underlying `Record`, so the generic
//! save/read/update/remove entry points are available directly.

mod acl;
mod organizations;
mod panels;
mod profiles;
mod sources;
mod user_data;

pub use acl::{AclGroup, AclGroupUser};
pub use organizations::{
    Organization, OrganizationRole, OrganizationTeam, OrganizationUser, TeamMember,
};
pub use panels::{ContextQuery, PanelAudio, PanelDiscussion, PanelTranscript};
pub use profiles::UserProfile;
pub use sources::{Source, SourceRelationship, RESOLVE_STATE};
pub use user_data::UserDataItem;

/// Declare a domain model: wrapper struct, static `ModelDef`, constructors,
/// filter-based fetch helpers, and a typed getter/setter pair per field.
///
/// Field lines read `getter / setter: Kind => "column", required|optional`
/// with an optional `, default = …` tail. The getter ident doubles as the
/// in-memory field name.
macro_rules! domain_model {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            table: $table:literal,
            conflict: [$($conflict:literal),+ $(,)?],
            id: $id:literal,
            fields: {
                $(
                    $get:ident / $set:ident : $kind:ident $( ( $kpath:path ) )? => $col:literal , $req:ident $(, default = $def:expr)? ;
                )+
            }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            record: $crate::record::Record,
        }

        impl $name {
            /// Static model declaration.
            pub fn def() -> &'static $crate::fields::ModelDef {
                static DEF: $crate::fields::ModelDef = $crate::fields::ModelDef {
                    table: $table,
                    fields: &[
                        $(
                            $crate::fields::FieldDef {
                                name: stringify!($get),
                                column: $col,
                                kind: domain_model!(@kind $kind $( ( $kpath ) )?),
                                required: domain_model!(@required $req),
                                default: domain_model!(@default $($def)?),
                            },
                        )+
                    ],
                    conflict_columns: &[$($conflict),+],
                    id_column: $id,
                };
                &DEF
            }

            /// New unsaved instance with declared defaults applied.
            pub fn new() -> Self {
                Self {
                    record: $crate::record::Record::new(Self::def()),
                }
            }

            /// Wrap an existing record of this model.
            pub fn from_record(record: $crate::record::Record) -> dayside_common::Result<Self> {
                if !std::ptr::eq(record.def(), Self::def()) {
                    return Err(dayside_common::Error::Contract(format!(
                        "expected a '{}' record, got '{}'",
                        Self::def().table,
                        record.table()
                    )));
                }
                Ok(Self { record })
            }

            /// Materialize a clean instance from a remote row.
            pub fn from_row(row: &$crate::store::Row) -> dayside_common::Result<Self> {
                Ok(Self {
                    record: $crate::record::Record::from_row(Self::def(), row)?,
                })
            }

            pub fn record(&self) -> &$crate::record::Record {
                &self.record
            }

            pub fn record_mut(&mut self) -> &mut $crate::record::Record {
                &mut self.record
            }

            pub fn into_record(self) -> $crate::record::Record {
                self.record
            }

            /// First instance matching `filter`.
            pub async fn fetch(
                store: &dyn $crate::store::Datastore,
                filter: &$crate::store::Filter,
            ) -> dayside_common::Result<Option<Self>> {
                Ok($crate::record::Record::fetch(Self::def(), store, filter)
                    .await?
                    .map(|record| Self { record }))
            }

            /// Every instance matching `filter` within `page`.
            pub async fn fetch_many(
                store: &dyn $crate::store::Datastore,
                filter: &$crate::store::Filter,
                page: $crate::store::Page,
            ) -> dayside_common::Result<Vec<Self>> {
                Ok($crate::record::Record::fetch_many(Self::def(), store, filter, page)
                    .await?
                    .into_iter()
                    .map(|record| Self { record })
                    .collect())
            }

            /// Existence probe.
            pub async fn exists(
                store: &dyn $crate::store::Datastore,
                filter: &$crate::store::Filter,
            ) -> dayside_common::Result<bool> {
                $crate::record::Record::exists(Self::def(), store, filter).await
            }

            /// Delete matching rows; returns whether any was removed.
            pub async fn delete_where(
                store: &dyn $crate::store::Datastore,
                filter: &$crate::store::Filter,
            ) -> dayside_common::Result<bool> {
                $crate::record::Record::delete_where(Self::def(), store, filter).await
            }

            $(
                domain_model!(@accessor $get $set $kind $( ( $kpath ) )?);
            )+
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = $crate::record::Record;
            fn deref(&self) -> &Self::Target {
                &self.record
            }
        }

        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.record
            }
        }
    };

    (@required required) => { true };
    (@required optional) => { false };

    (@default $def:expr) => { Some($def) };
    (@default) => { None };

    (@kind Enum ( $p:path )) => { $crate::value::FieldKind::Enum(&$p) };
    (@kind $k:ident) => { $crate::value::FieldKind::$k };

    (@accessor $get:ident $set:ident Enum ( $p:path )) => {
        pub fn $get(&self) -> Option<&str> {
            self.record.peek(stringify!($get)).as_str()
        }
        pub fn $set(&mut self, value: &str) -> dayside_common::Result<()> {
            self.record.set(stringify!($get), value)
        }
    };
    (@accessor $get:ident $set:ident Text) => {
        pub fn $get(&self) -> Option<&str> {
            self.record.peek(stringify!($get)).as_str()
        }
        pub fn $set(&mut self, value: impl Into<String>) -> dayside_common::Result<()> {
            self.record.set(stringify!($get), value.into())
        }
    };
    (@accessor $get:ident $set:ident Integer) => {
        pub fn $get(&self) -> Option<i64> {
            self.record.peek(stringify!($get)).as_i64()
        }
        pub fn $set(&mut self, value: i64) -> dayside_common::Result<()> {
            self.record.set(stringify!($get), value)
        }
    };
    (@accessor $get:ident $set:ident Float) => {
        pub fn $get(&self) -> Option<f64> {
            self.record.peek(stringify!($get)).as_f64()
        }
        pub fn $set(&mut self, value: f64) -> dayside_common::Result<()> {
            self.record.set(stringify!($get), value)
        }
    };
    (@accessor $get:ident $set:ident Bool) => {
        pub fn $get(&self) -> Option<bool> {
            self.record.peek(stringify!($get)).as_bool()
        }
        pub fn $set(&mut self, value: bool) -> dayside_common::Result<()> {
            self.record.set(stringify!($get), value)
        }
    };
    (@accessor $get:ident $set:ident Date) => {
        pub fn $get(&self) -> Option<chrono::NaiveDate> {
            self.record.peek(stringify!($get)).as_date()
        }
        pub fn $set(&mut self, value: chrono::NaiveDate) -> dayside_common::Result<()> {
            self.record.set(stringify!($get), value)
        }
    };
    (@accessor $get:ident $set:ident Timestamp) => {
        pub fn $get(&self) -> Option<chrono::DateTime<chrono::Utc>> {
            self.record.peek(stringify!($get)).as_timestamp()
        }
        pub fn $set(&mut self, value: chrono::DateTime<chrono::Utc>) -> dayside_common::Result<()> {
            self.record.set(stringify!($get), value)
        }
    };
    (@accessor $get:ident $set:ident Uuid) => {
        pub fn $get(&self) -> Option<uuid::Uuid> {
            self.record.peek(stringify!($get)).as_uuid()
        }
        pub fn $set(&mut self, value: uuid::Uuid) -> dayside_common::Result<()> {
            self.record.set(stringify!($get), value)
        }
    };
    (@accessor $get:ident $set:ident Json) => {
        pub fn $get(&self) -> Option<&serde_json::Value> {
            self.record.peek(stringify!($get)).as_json()
        }
        pub fn $set(&mut self, value: serde_json::Value) -> dayside_common::Result<()> {
            self.record.set(stringify!($get), value)
        }
    };
    (@accessor $get:ident $set:ident Array) => {
        pub fn $get(&self) -> Option<&[serde_json::Value]> {
            self.record.peek(stringify!($get)).as_array()
        }
        pub fn $set(&mut self, value: Vec<serde_json::Value>) -> dayside_common::Result<()> {
            self.record.set(stringify!($get), value)
        }
    };
}

pub(crate) use domain_model;
