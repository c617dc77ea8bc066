//! User-defined data items

use super::domain_model;
use crate::store::{Datastore, Filter, Page};
use dayside_common::Result;
use uuid::Uuid;

domain_model! {
    /// Row in `user_data`: arbitrary per-user key/value payloads.
    pub struct UserDataItem {
        table: "user_data",
        conflict: ["id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            auth_id / set_auth_id: Uuid => "auth_id", required;
            key / set_key: Text => "key", optional;
            value / set_value: Json => "value", optional;
            updated_at / set_updated_at: Timestamp => "updated_at", optional;
        }
    }
}

impl UserDataItem {
    /// Every item belonging to an authentication principal.
    pub async fn fetch_for_auth(store: &dyn Datastore, auth_id: Uuid) -> Result<Vec<Self>> {
        Self::fetch_many(
            store,
            &Filter::new().eq("auth_id", auth_id.to_string()),
            Page::all(),
        )
        .await
    }
}
