//! ACL group models

use super::domain_model;
use crate::store::{Datastore, Filter, Page};
use dayside_common::Result;
use uuid::Uuid;

domain_model! {
    /// Row in `acl_group`.
    pub struct AclGroup {
        table: "acl_group",
        conflict: ["id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            organization_id / set_organization_id: Uuid => "organization_id", optional;
            name / set_name: Text => "name", required;
            description / set_description: Text => "description", optional;
        }
    }
}

domain_model! {
    /// Row in `acl_group_users`, keyed by (user_id, acl_group_id).
    pub struct AclGroupUser {
        table: "acl_group_users",
        conflict: ["user_id", "acl_group_id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            user_id / set_user_id: Uuid => "user_id", required;
            acl_group_id / set_acl_group_id: Uuid => "acl_group_id", required;
        }
    }
}

impl AclGroupUser {
    /// Composite-key filter for one group membership.
    pub fn membership_filter(user_id: Uuid, acl_group_id: Uuid) -> Filter {
        Filter::new()
            .eq("user_id", user_id.to_string())
            .eq("acl_group_id", acl_group_id.to_string())
    }

    /// Every group membership of a user.
    pub async fn fetch_for_user(store: &dyn Datastore, user_id: Uuid) -> Result<Vec<Self>> {
        Self::fetch_many(
            store,
            &Filter::new().eq("user_id", user_id.to_string()),
            Page::all(),
        )
        .await
    }
}

impl AclGroup {
    /// Resolve groups by id list.
    pub async fn fetch_by_ids(store: &dyn Datastore, ids: &[Uuid]) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let values = ids.iter().map(|id| serde_json::Value::String(id.to_string()));
        Self::fetch_many(store, &Filter::new().any_of("id", values), Page::all()).await
    }
}
