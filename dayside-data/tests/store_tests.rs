//! Persistence semantics against the in-memory datastore: save
//! idempotence, composite-key upserts, batch saves, and the fetch helpers.

use dayside_data::models::{OrganizationUser, UserDataItem, UserProfile};
use dayside_data::record::Record;
use dayside_data::store::{Filter, MemoryStore, Page, Row};
use serde_json::json;
use uuid::Uuid;

/// Route crate logs through the test harness; `RUST_LOG` controls verbosity.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn user_data_row(id: Uuid, auth_id: Uuid, key: &str) -> Row {
    let mut row = Row::new();
    row.insert("id".to_string(), json!(id.to_string()));
    row.insert("auth_id".to_string(), json!(auth_id.to_string()));
    row.insert("key".to_string(), json!(key));
    row
}

#[tokio::test]
async fn saving_a_clean_record_issues_no_write() {
    init_tracing();
    let store = MemoryStore::new();
    let mut profile = UserProfile::new();
    profile.set_email("panel@example.com").unwrap();

    profile.save(&store).await.unwrap();
    assert_eq!(store.op_counts().writes(), 1);
    assert!(!profile.dirty());

    // Clean record: no further traffic.
    profile.save(&store).await.unwrap();
    assert_eq!(store.op_counts().writes(), 1);

    // Modifying makes the next save a real write again.
    profile.set_display_name("Dayside Host").unwrap();
    profile.save(&store).await.unwrap();
    assert_eq!(store.op_counts().writes(), 2);
    assert_eq!(store.rows("user_profile").len(), 1);
}

#[tokio::test]
async fn missing_required_field_fails_before_any_write() {
    let store = MemoryStore::new();
    let mut org_user = OrganizationUser::new();
    org_user.set_role("editor").unwrap();
    // Blank out a required field; the auto-generated UUID would otherwise
    // satisfy the check.
    org_user
        .record_mut()
        .set("organization_id", dayside_data::value::Value::Null)
        .unwrap();

    assert!(org_user.save(&store).await.is_err());
    assert_eq!(store.op_counts().writes(), 0);
}

#[tokio::test]
async fn composite_key_save_updates_instead_of_duplicating() {
    let store = MemoryStore::new();
    let auth = Uuid::new_v4();
    let org = Uuid::new_v4();

    let mut first = OrganizationUser::new();
    first.set_auth_id(auth).unwrap();
    first.set_organization_id(org).unwrap();
    first.set_role("member").unwrap();
    first.save(&store).await.unwrap();

    // A second instance with the same natural key lands on the same row.
    let mut second = OrganizationUser::new();
    second.set_auth_id(auth).unwrap();
    second.set_organization_id(org).unwrap();
    second.set_role("admin").unwrap();
    second.save(&store).await.unwrap();

    let rows = store.rows("organization_users");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("role"), Some(&json!("admin")));
}

#[tokio::test]
async fn read_absorbs_the_remote_row() {
    let store = MemoryStore::new();
    let auth = Uuid::new_v4();
    let mut row = Row::new();
    row.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
    row.insert("auth_id".to_string(), json!(auth.to_string()));
    row.insert("email".to_string(), json!("host@example.com"));
    store.seed("user_profile", vec![row]);

    let mut profile = UserProfile::new();
    profile.set_auth_id(auth).unwrap();
    assert!(profile.read(&store).await.unwrap());
    assert_eq!(profile.email(), Some("host@example.com"));
    assert!(!profile.dirty());

    // Unknown principal: a miss, not an error.
    let mut missing = UserProfile::new();
    missing.set_auth_id(Uuid::new_v4()).unwrap();
    assert!(!missing.read(&store).await.unwrap());
}

#[tokio::test]
async fn removed_record_rejects_further_operations() {
    let store = MemoryStore::new();
    let mut item = UserDataItem::new();
    item.set_key("theme").unwrap();
    item.save(&store).await.unwrap();
    assert_eq!(store.rows("user_data").len(), 1);

    assert!(item.remove(&store).await.unwrap());
    assert!(store.rows("user_data").is_empty());
    assert!(item.is_deleted());
    assert!(item.set_key("layout").is_err());
    assert!(item.save(&store).await.is_err());
}

#[tokio::test]
async fn fetch_many_applies_filter_and_pagination() {
    let store = MemoryStore::new();
    let auth = Uuid::new_v4();
    let other = Uuid::new_v4();
    for i in 0..5 {
        store.seed(
            "user_data",
            vec![user_data_row(Uuid::new_v4(), auth, &format!("key-{i}"))],
        );
    }
    store.seed("user_data", vec![user_data_row(Uuid::new_v4(), other, "alien")]);

    let all = UserDataItem::fetch_for_auth(&store, auth).await.unwrap();
    assert_eq!(all.len(), 5);
    assert!(all.iter().all(|item| item.auth_id() == Some(auth)));
    assert!(all.iter().all(|item| !item.dirty()));

    let window = UserDataItem::fetch_many(
        &store,
        &Filter::new().eq("auth_id", auth.to_string()),
        Page::window(2, 2),
    )
    .await
    .unwrap();
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].key(), Some("key-2"));
}

#[tokio::test]
async fn membership_helpers_probe_insert_and_delete() {
    let store = MemoryStore::new();
    let auth = Uuid::new_v4();
    let org = Uuid::new_v4();

    assert!(!OrganizationUser::membership_exists(&store, auth, org)
        .await
        .unwrap());

    let mut membership = OrganizationUser::new();
    membership.set_auth_id(auth).unwrap();
    membership.set_organization_id(org).unwrap();
    membership.save(&store).await.unwrap();

    assert!(OrganizationUser::membership_exists(&store, auth, org)
        .await
        .unwrap());
    let fetched = OrganizationUser::fetch_membership(&store, auth, org)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.organization_id(), Some(org));

    assert!(OrganizationUser::delete_membership(&store, auth, org)
        .await
        .unwrap());
    assert!(store.rows("organization_users").is_empty());
}

#[tokio::test]
async fn acl_group_connection_is_idempotent() {
    let store = MemoryStore::new();
    let group = Uuid::new_v4();

    let mut membership = OrganizationUser::new();
    membership.set_role("member").unwrap();
    membership.save(&store).await.unwrap();

    let first = membership.connect_acl_group(&store, group).await.unwrap();
    let second = membership.connect_acl_group(&store, group).await.unwrap();
    assert_eq!(first.id(), second.id());
    assert_eq!(store.rows("acl_group_users").len(), 1);

    assert!(membership.disconnect_acl_group(&store, group).await.unwrap());
    assert!(store.rows("acl_group_users").is_empty());
    assert!(!membership.disconnect_acl_group(&store, group).await.unwrap());
}

#[tokio::test]
async fn bulk_upsert_submits_only_dirty_records_in_one_write() {
    init_tracing();
    let store = MemoryStore::new();
    let auth = Uuid::new_v4();

    let mut clean = UserDataItem::new();
    clean.set_auth_id(auth).unwrap();
    clean.set_key("stale").unwrap();
    clean.save(&store).await.unwrap();
    let baseline = store.op_counts().writes();

    let mut a = UserDataItem::new();
    a.set_auth_id(auth).unwrap();
    a.set_key("alpha").unwrap();
    let mut b = UserDataItem::new();
    b.set_auth_id(auth).unwrap();
    b.set_key("beta").unwrap();

    let mut batch = [clean.record_mut(), a.record_mut(), b.record_mut()];
    let submitted = Record::bulk_upsert(&store, &mut batch).await.unwrap();
    assert_eq!(submitted, 2);
    assert_eq!(store.op_counts().writes(), baseline + 1);
    assert_eq!(store.rows("user_data").len(), 3);
    assert!(!a.dirty());
    assert!(!b.dirty());
}
