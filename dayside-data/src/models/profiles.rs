//! User profile model

use super::domain_model;
use crate::store::{Datastore, Filter};
use dayside_common::Result;
use uuid::Uuid;

domain_model! {
    /// Row in `user_profile`. One per authentication principal; `auth_id`
    /// is the table's natural key.
    pub struct UserProfile {
        table: "user_profile",
        conflict: ["auth_id"],
        id: "auth_id",
        fields: {
            id / set_id: Uuid => "id", required;
            auth_id / set_auth_id: Uuid => "auth_id", required;
            email / set_email: Text => "email", optional;
            display_name / set_display_name: Text => "display_name", optional;
            avatar_url / set_avatar_url: Text => "avatar_url", optional;
            disabled / set_disabled: Bool => "disabled", optional, default = crate::fields::DefaultValue::Bool(false);
            created_at / set_created_at: Timestamp => "created_at", optional;
        }
    }
}

impl UserProfile {
    /// Profile for an authentication principal, if one exists.
    pub async fn fetch_by_auth(store: &dyn Datastore, auth_id: Uuid) -> Result<Option<Self>> {
        Self::fetch(store, &Filter::new().eq("auth_id", auth_id.to_string())).await
    }
}
