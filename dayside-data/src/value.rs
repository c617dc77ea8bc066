//! Attribute kinds, typed values, and casting rules
//!
//! Every declared field has a `FieldKind`; values flowing into a record are
//! coerced through `coerce` so the attribute bag only ever holds well-typed
//! data. `Value` equality is structural (JSON payloads compare deeply),
//! which is what dirty-checking relies on.

use chrono::{DateTime, NaiveDate, Utc};
use dayside_common::{Error, Result};
use uuid::Uuid;

/// Closed string enum declaration, e.g. a source's resolve state.
///
/// The canonical form of a variant is the variant string itself, so
/// serializing an enum-kinded attribute to a remote row is a plain string
/// write.
#[derive(Debug, PartialEq, Eq)]
pub struct EnumDef {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

impl EnumDef {
    /// Return the canonical variant string for `raw`, or a validation error.
    pub fn validate(&self, raw: &str) -> Result<&'static str> {
        self.variants
            .iter()
            .find(|v| **v == raw)
            .copied()
            .ok_or_else(|| {
                Error::Validation(format!(
                    "'{raw}' is not a variant of {} (expected one of: {})",
                    self.name,
                    self.variants.join(", ")
                ))
            })
    }
}

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Bool,
    Date,
    Timestamp,
    Uuid,
    Json,
    Array,
    Enum(&'static EnumDef),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::Date => "date",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Uuid => "uuid",
            FieldKind::Json => "json",
            FieldKind::Array => "array",
            FieldKind::Enum(def) => def.name,
        }
    }
}

/// A typed attribute value.
///
/// `PartialEq` recurses through JSON payloads, so comparing two values is a
/// deep structural comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Array(Vec<serde_json::Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[serde_json::Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Vec<serde_json::Value>> for Value {
    fn from(items: Vec<serde_json::Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

fn invalid(kind: FieldKind, value: &Value) -> Error {
    Error::Validation(format!(
        "cannot store {value:?} in a field of kind {}",
        kind.name()
    ))
}

/// Coerce `value` into the representation required by `kind`.
///
/// `Null` passes every kind; presence of required fields is checked at save
/// time, not here.
pub fn coerce(kind: FieldKind, value: Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match kind {
        FieldKind::Text => match value {
            // The literal string "null" is normalized to an absent value.
            Value::Text(s) if s == "null" => Ok(Value::Null),
            Value::Text(s) => Ok(Value::Text(s)),
            other => Err(invalid(kind, &other)),
        },
        FieldKind::Integer => match value {
            Value::Integer(i) => Ok(Value::Integer(i)),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(Value::Integer(f as i64)),
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| Error::Validation(format!("'{s}' is not an integer"))),
            other => Err(invalid(kind, &other)),
        },
        FieldKind::Float => match value {
            Value::Float(f) if f.is_nan() => {
                Err(Error::Validation("NaN is not a valid numeric value".to_string()))
            }
            Value::Float(f) => Ok(Value::Float(f)),
            Value::Integer(i) => Ok(Value::Float(i as f64)),
            Value::Text(s) => match s.trim().parse::<f64>() {
                Ok(f) if !f.is_nan() => Ok(Value::Float(f)),
                _ => Err(Error::Validation(format!("'{s}' is not a number"))),
            },
            other => Err(invalid(kind, &other)),
        },
        FieldKind::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(b)),
            // Anything but the literal "true" coerces to false.
            Value::Text(s) => Ok(Value::Bool(s == "true")),
            other => Err(invalid(kind, &other)),
        },
        FieldKind::Date => match value {
            Value::Date(d) => Ok(Value::Date(d)),
            Value::Timestamp(ts) => Ok(Value::Date(ts.date_naive())),
            Value::Text(s) => parse_date(&s).map(Value::Date),
            other => Err(invalid(kind, &other)),
        },
        FieldKind::Timestamp => match value {
            Value::Timestamp(ts) => Ok(Value::Timestamp(ts)),
            Value::Integer(ms) => DateTime::<Utc>::from_timestamp_millis(ms)
                .map(Value::Timestamp)
                .ok_or_else(|| Error::Validation(format!("{ms} is out of timestamp range"))),
            Value::Text(s) => parse_timestamp(&s).map(Value::Timestamp),
            Value::Date(d) => {
                let midnight = d.and_hms_opt(0, 0, 0).ok_or_else(|| {
                    Error::Validation(format!("cannot convert {d} to a timestamp"))
                })?;
                Ok(Value::Timestamp(midnight.and_utc()))
            }
            other => Err(invalid(kind, &other)),
        },
        FieldKind::Uuid => match value {
            Value::Uuid(u) => Ok(Value::Uuid(u)),
            Value::Text(s) => Uuid::parse_str(&s)
                .map(Value::Uuid)
                .map_err(|_| Error::Validation(format!("'{s}' is not a valid UUID"))),
            other => Err(invalid(kind, &other)),
        },
        // JSON fields accept any structure; ownership gives us the deep copy.
        FieldKind::Json => Ok(Value::Json(to_json(&value))),
        FieldKind::Array => match value {
            Value::Array(items) => Ok(Value::Array(items)),
            Value::Json(serde_json::Value::Array(items)) => Ok(Value::Array(items)),
            other => Err(invalid(kind, &other)),
        },
        FieldKind::Enum(def) => match value {
            Value::Text(s) => def.validate(&s).map(|v| Value::Text(v.to_string())),
            other => Err(invalid(kind, &other)),
        },
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    parse_timestamp(s).map(|ts| ts.date_naive())
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| Error::Validation(format!("'{s}' is not a valid timestamp")))
}

/// Convert a raw JSON value (as read from a remote row) into a typed value.
pub fn cast_json(kind: FieldKind, raw: serde_json::Value) -> Result<Value> {
    let value = match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Array(items) => Value::Array(items),
        obj @ serde_json::Value::Object(_) => Value::Json(obj),
    };
    coerce(kind, value)
}

/// Serialize a typed value to its remote-row JSON form.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        Value::Timestamp(ts) => serde_json::Value::String(ts.to_rfc3339()),
        Value::Uuid(u) => serde_json::Value::String(u.to_string()),
        Value::Json(v) => v.clone(),
        Value::Array(items) => serde_json::Value::Array(items.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_null_string_normalizes() {
        assert_eq!(
            coerce(FieldKind::Text, Value::Text("null".into())).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn integer_is_strict() {
        assert_eq!(
            coerce(FieldKind::Integer, Value::Float(3.0)).unwrap(),
            Value::Integer(3)
        );
        assert!(coerce(FieldKind::Integer, Value::Float(3.5)).is_err());
        assert!(coerce(FieldKind::Integer, Value::Text("abc".into())).is_err());
    }

    #[test]
    fn float_rejects_nan() {
        assert!(coerce(FieldKind::Float, Value::Float(f64::NAN)).is_err());
        assert_eq!(
            coerce(FieldKind::Float, Value::Integer(2)).unwrap(),
            Value::Float(2.0)
        );
    }

    #[test]
    fn bool_coerces_by_equality_to_true() {
        assert_eq!(
            coerce(FieldKind::Bool, Value::Text("true".into())).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            coerce(FieldKind::Bool, Value::Text("yes".into())).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn uuid_rejects_malformed() {
        assert!(coerce(FieldKind::Uuid, Value::Text("not-a-uuid".into())).is_err());
        let u = Uuid::new_v4();
        assert_eq!(
            coerce(FieldKind::Uuid, Value::Text(u.to_string())).unwrap(),
            Value::Uuid(u)
        );
    }

    #[test]
    fn timestamp_accepts_epoch_millis_and_rfc3339() {
        let ts = coerce(FieldKind::Timestamp, Value::Integer(1_700_000_000_000)).unwrap();
        assert!(matches!(ts, Value::Timestamp(_)));
        assert!(coerce(FieldKind::Timestamp, Value::Text("not a time".into())).is_err());
        assert!(coerce(
            FieldKind::Timestamp,
            Value::Text("2024-05-01T10:30:00Z".into())
        )
        .is_ok());
    }

    #[test]
    fn json_equality_is_deep() {
        let a = coerce(FieldKind::Json, Value::Json(json!({"a": [1, 2]}))).unwrap();
        let b = coerce(FieldKind::Json, Value::Json(json!({"a": [1, 2]}))).unwrap();
        let c = coerce(FieldKind::Json, Value::Json(json!({"a": [1, 3]}))).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn enum_validates_membership() {
        static STATE: EnumDef = EnumDef {
            name: "resolve_state",
            variants: &["unresolved", "resolved", "failed"],
        };
        assert_eq!(
            coerce(FieldKind::Enum(&STATE), Value::Text("resolved".into())).unwrap(),
            Value::Text("resolved".into())
        );
        assert!(coerce(FieldKind::Enum(&STATE), Value::Text("done".into())).is_err());
    }

    #[test]
    fn cast_json_round_trips_through_to_json() {
        let v = cast_json(FieldKind::Timestamp, json!("2024-05-01T10:30:00+00:00")).unwrap();
        let back = cast_json(FieldKind::Timestamp, to_json(&v)).unwrap();
        assert_eq!(v, back);
    }
}
