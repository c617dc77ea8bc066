//! Record lifecycle: construction, assignment, dirty tracking, and
//! change notifications, exercised through a small stand-alone model.

use std::sync::{Arc, Mutex};

use dayside_common::Error;
use dayside_data::fields::{DefaultValue, FieldDef, ModelDef};
use dayside_data::record::Record;
use dayside_data::value::{FieldKind, Value};
use serde_json::json;
use uuid::Uuid;

static ACCOUNTS: ModelDef = ModelDef {
    table: "accounts",
    fields: &[
        FieldDef {
            name: "id",
            column: "id",
            kind: FieldKind::Uuid,
            required: true,
            default: None,
        },
        FieldDef {
            name: "email",
            column: "email",
            kind: FieldKind::Text,
            required: false,
            default: None,
        },
        FieldDef {
            name: "disabled",
            column: "disabled",
            kind: FieldKind::Bool,
            required: false,
            default: Some(DefaultValue::Bool(false)),
        },
        FieldDef {
            name: "score",
            column: "score",
            kind: FieldKind::Integer,
            required: false,
            default: None,
        },
    ],
    conflict_columns: &["id"],
    id_column: "id",
};

#[test]
fn new_record_auto_populates_required_uuid_and_defaults() {
    let a = Record::new(&ACCOUNTS);
    let b = Record::new(&ACCOUNTS);

    let id_a = a.id().unwrap();
    let id_b = b.id().unwrap();
    assert_eq!(id_a.get_version_num(), 4);
    assert_ne!(id_a, id_b);

    assert_eq!(a.peek("disabled"), &Value::Bool(false));
    assert!(a.peek("email").is_null());
    assert!(a.dirty());
}

#[test]
fn assignment_marks_dirty_and_notifies_exactly_once() {
    let mut record = Record::new(&ACCOUNTS);
    record.mark_clean();

    let events = Arc::new(Mutex::new(Vec::new()));
    let events_cb = Arc::clone(&events);
    record.notifier().subscribe("update_disabled", move |event, change| {
        events_cb
            .lock()
            .unwrap()
            .push((event.to_string(), change.value.clone()));
        Ok(true)
    });

    record.set("disabled", true).unwrap();
    assert!(record.dirty());

    // A deep-equal re-assignment is a silent no-op.
    record.set("disabled", true).unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0], ("update_disabled".to_string(), Value::Bool(true)));
}

#[test]
fn null_string_normalizes_to_absent() {
    let mut record = Record::new(&ACCOUNTS);
    record.set("email", "panel@example.com").unwrap();
    record.set("email", "null").unwrap();
    assert!(record.peek("email").is_null());

    // Assigning null to a field that never held a value changes nothing.
    let mut fresh = Record::new(&ACCOUNTS);
    fresh.mark_clean();
    fresh.set("email", "null").unwrap();
    assert!(!fresh.dirty());
}

#[test]
fn failed_coercion_leaves_the_bag_unchanged() {
    let mut record = Record::new(&ACCOUNTS);
    record.set("score", 7i64).unwrap();
    record.mark_clean();

    let err = record.set("score", "not a number").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(record.peek("score"), &Value::Integer(7));
    assert!(!record.dirty());
}

#[test]
fn undeclared_field_is_a_contract_error() {
    let mut record = Record::new(&ACCOUNTS);
    assert!(matches!(record.get("nickname"), Err(Error::Contract(_))));
    assert!(matches!(
        record.set("nickname", "x"),
        Err(Error::Contract(_))
    ));
}

#[test]
fn to_row_drops_unset_fields_and_from_row_is_clean() {
    let mut record = Record::new(&ACCOUNTS);
    record.set("email", "panel@example.com").unwrap();

    let row = record.to_row();
    assert_eq!(row.len(), 3); // id, email, disabled; score never set
    assert!(!row.contains_key("score"));

    let restored = Record::from_row(&ACCOUNTS, &row).unwrap();
    assert!(!restored.dirty());
    assert_eq!(restored.id(), record.id());
    assert_eq!(restored.peek("email").as_str(), Some("panel@example.com"));
}

#[test]
fn from_row_ignores_undeclared_columns() {
    let mut row = dayside_data::store::Row::new();
    row.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
    row.insert("legacy_flags".to_string(), json!({"x": 1}));

    let record = Record::from_row(&ACCOUNTS, &row).unwrap();
    assert!(record.id().is_some());
    assert!(matches!(record.get("legacy_flags"), Err(Error::Contract(_))));
}

#[test]
fn update_from_refreshes_in_place_and_keeps_listeners() {
    let mut original = Record::new(&ACCOUNTS);
    original.set("email", "old@example.com").unwrap();
    original.mark_clean();

    let events = Arc::new(Mutex::new(Vec::new()));
    let events_cb = Arc::clone(&events);
    original.notifier().subscribe("update_email", move |_, change| {
        events_cb.lock().unwrap().push(change.value.clone());
        Ok(true)
    });

    let mut fresh = original.clone();
    fresh.set("email", "new@example.com").unwrap();
    original.update_from(&fresh).unwrap();

    assert_eq!(original.peek("email").as_str(), Some("new@example.com"));
    assert!(!original.dirty());
    assert_eq!(
        *events.lock().unwrap(),
        vec![Value::Text("new@example.com".to_string())]
    );
}

#[test]
fn clone_does_not_carry_subscriptions() {
    let record = Record::new(&ACCOUNTS);
    record.notifier().subscribe("any", |_, _| Ok(true));

    let copy = record.clone();
    assert!(record.notifier().has_subscribers());
    assert!(!copy.notifier().has_subscribers());
}
