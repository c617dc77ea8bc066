//! Per-model field declarations
//!
//! Every domain model carries one static `ModelDef`: its remote table name,
//! field set, conflict key, and id column. The field set is fixed at
//! definition time and immutable for the process lifetime.

use crate::value::{FieldKind, Value};
use dayside_common::{Error, Result};
use uuid::Uuid;

/// Const-constructible default for a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(&'static str),
    EmptyArray,
    /// Current UTC time at construction.
    Now,
    /// Fresh v4 UUID at construction.
    NewUuid,
}

impl DefaultValue {
    /// Materialize the default into a value.
    pub fn materialize(&self) -> Value {
        match self {
            DefaultValue::Bool(b) => Value::Bool(*b),
            DefaultValue::Integer(i) => Value::Integer(*i),
            DefaultValue::Float(f) => Value::Float(*f),
            DefaultValue::Text(s) => Value::Text((*s).to_string()),
            DefaultValue::EmptyArray => Value::Array(Vec::new()),
            DefaultValue::Now => Value::Timestamp(chrono::Utc::now()),
            DefaultValue::NewUuid => Value::Uuid(Uuid::new_v4()),
        }
    }
}

/// Declaration of a single attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDef {
    /// In-memory attribute name.
    pub name: &'static str,
    /// Remote column name.
    pub column: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
}

/// Static description of a domain model.
#[derive(Debug, PartialEq)]
pub struct ModelDef {
    /// Remote table name.
    pub table: &'static str,
    pub fields: &'static [FieldDef],
    /// Columns forming the upsert conflict key.
    pub conflict_columns: &'static [&'static str],
    /// Column used by instance-level read/update/remove.
    pub id_column: &'static str,
}

impl ModelDef {
    /// Look up a field by attribute name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by remote column name.
    pub fn by_column(&self, column: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// Map an attribute name to its remote column.
    pub fn column_of(&self, name: &str) -> Result<&'static str> {
        self.field(name)
            .map(|f| f.column)
            .ok_or_else(|| Error::Contract(format!("{}: no declared field '{name}'", self.table)))
    }

    /// Verify the declaration invariants: a non-empty field set and a total
    /// bijection between attribute names and remote columns.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(Error::Contract(format!(
                "{}: model declares no fields",
                self.table
            )));
        }
        for (i, field) in self.fields.iter().enumerate() {
            for other in &self.fields[i + 1..] {
                if field.name == other.name {
                    return Err(Error::Contract(format!(
                        "{}: duplicate field name '{}'",
                        self.table, field.name
                    )));
                }
                if field.column == other.column {
                    return Err(Error::Contract(format!(
                        "{}: fields '{}' and '{}' share column '{}'",
                        self.table, field.name, other.name, field.column
                    )));
                }
            }
        }
        for col in self.conflict_columns {
            if self.by_column(col).is_none() {
                return Err(Error::Contract(format!(
                    "{}: conflict column '{col}' is not declared",
                    self.table
                )));
            }
        }
        if self.by_column(self.id_column).is_none() {
            return Err(Error::Contract(format!(
                "{}: id column '{}' is not declared",
                self.table, self.id_column
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static GOOD: ModelDef = ModelDef {
        table: "things",
        fields: &[
            FieldDef {
                name: "id",
                column: "id",
                kind: FieldKind::Uuid,
                required: true,
                default: None,
            },
            FieldDef {
                name: "label",
                column: "display_label",
                kind: FieldKind::Text,
                required: false,
                default: None,
            },
        ],
        conflict_columns: &["id"],
        id_column: "id",
    };

    static COLLIDING: ModelDef = ModelDef {
        table: "things",
        fields: &[
            FieldDef {
                name: "a",
                column: "shared",
                kind: FieldKind::Text,
                required: false,
                default: None,
            },
            FieldDef {
                name: "b",
                column: "shared",
                kind: FieldKind::Text,
                required: false,
                default: None,
            },
        ],
        conflict_columns: &["shared"],
        id_column: "shared",
    };

    #[test]
    fn lookup_both_directions() {
        GOOD.validate().unwrap();
        assert_eq!(GOOD.field("label").unwrap().column, "display_label");
        assert_eq!(GOOD.by_column("display_label").unwrap().name, "label");
        assert!(GOOD.field("display_label").is_none());
    }

    #[test]
    fn column_collision_is_rejected() {
        assert!(COLLIDING.validate().is_err());
    }

    #[test]
    fn undeclared_field_is_a_contract_error() {
        assert!(matches!(
            GOOD.column_of("missing"),
            Err(Error::Contract(_))
        ));
    }
}
