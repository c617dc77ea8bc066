//! Organization models: organizations, memberships, teams, roles

use super::domain_model;
use super::AclGroupUser;
use crate::store::{Datastore, Filter, Page};
use dayside_common::{Error, Result};
use uuid::Uuid;

domain_model! {
    /// Row in `organizations`.
    pub struct Organization {
        table: "organizations",
        conflict: ["id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            name / set_name: Text => "name", required;
            description / set_description: Text => "description", optional;
            logo_url / set_logo_url: Text => "logo_url", optional;
            metadata / set_metadata: Json => "metadata", optional;
            created_at / set_created_at: Timestamp => "created_at", optional;
        }
    }
}

domain_model! {
    /// Row in `organization_users`, the membership join table. The natural
    /// key is the (auth_id, organization_id) pair; the composite-key
    /// helpers below normalize an instance into that filter shape.
    pub struct OrganizationUser {
        table: "organization_users",
        conflict: ["auth_id", "organization_id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            auth_id / set_auth_id: Uuid => "auth_id", required;
            organization_id / set_organization_id: Uuid => "organization_id", required;
            role / set_role: Text => "role", optional;
            created_at / set_created_at: Timestamp => "created_at", optional;
        }
    }
}

domain_model! {
    /// Row in `organization_teams`.
    pub struct OrganizationTeam {
        table: "organization_teams",
        conflict: ["id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            organization_id / set_organization_id: Uuid => "organization_id", required;
            name / set_name: Text => "name", optional;
            description / set_description: Text => "description", optional;
        }
    }
}

domain_model! {
    /// Row in `organization_roles`.
    pub struct OrganizationRole {
        table: "organization_roles",
        conflict: ["id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            organization_id / set_organization_id: Uuid => "organization_id", required;
            name / set_name: Text => "name", optional;
            permissions / set_permissions: Array => "permissions", optional, default = crate::fields::DefaultValue::EmptyArray;
        }
    }
}

domain_model! {
    /// Row in `organization_team_members`, keyed by (auth_id, team_id).
    pub struct TeamMember {
        table: "organization_team_members",
        conflict: ["auth_id", "team_id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            auth_id / set_auth_id: Uuid => "auth_id", required;
            team_id / set_team_id: Uuid => "team_id", required;
            role / set_role: Text => "role", optional;
        }
    }
}

impl OrganizationUser {
    /// Composite-key filter for one membership.
    pub fn membership_filter(auth_id: Uuid, organization_id: Uuid) -> Filter {
        Filter::new()
            .eq("auth_id", auth_id.to_string())
            .eq("organization_id", organization_id.to_string())
    }

    pub async fn fetch_membership(
        store: &dyn Datastore,
        auth_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>> {
        Self::fetch(store, &Self::membership_filter(auth_id, organization_id)).await
    }

    pub async fn membership_exists(
        store: &dyn Datastore,
        auth_id: Uuid,
        organization_id: Uuid,
    ) -> Result<bool> {
        Self::exists(store, &Self::membership_filter(auth_id, organization_id)).await
    }

    pub async fn delete_membership(
        store: &dyn Datastore,
        auth_id: Uuid,
        organization_id: Uuid,
    ) -> Result<bool> {
        Self::delete_where(store, &Self::membership_filter(auth_id, organization_id)).await
    }

    /// Attach this member to an ACL group: fetch-or-insert into the
    /// (user_id, acl_group_id) join table. Idempotent.
    pub async fn connect_acl_group(
        &self,
        store: &dyn Datastore,
        acl_group_id: Uuid,
    ) -> Result<AclGroupUser> {
        let auth_id = self
            .auth_id()
            .ok_or_else(|| Error::Contract("membership has no auth_id".to_string()))?;
        let filter = AclGroupUser::membership_filter(auth_id, acl_group_id);

        if let Some(existing) = AclGroupUser::fetch(store, &filter).await? {
            return Ok(existing);
        }
        let mut link = AclGroupUser::new();
        link.set_user_id(auth_id)?;
        link.set_acl_group_id(acl_group_id)?;
        link.save(store).await?;
        Ok(link)
    }

    /// Detach this member from an ACL group. Returns whether a link existed.
    pub async fn disconnect_acl_group(
        &self,
        store: &dyn Datastore,
        acl_group_id: Uuid,
    ) -> Result<bool> {
        let auth_id = self
            .auth_id()
            .ok_or_else(|| Error::Contract("membership has no auth_id".to_string()))?;
        AclGroupUser::delete_where(store, &AclGroupUser::membership_filter(auth_id, acl_group_id))
            .await
    }

    /// Persist the membership and fan out connections to the given ACL
    /// groups. Group connections run after the membership save; a failure
    /// surfaces immediately and does not undo earlier connections.
    pub async fn create_with_groups(
        &mut self,
        store: &dyn Datastore,
        acl_group_ids: &[Uuid],
    ) -> Result<()> {
        self.save(store).await?;
        for group_id in acl_group_ids {
            self.connect_acl_group(store, *group_id).await?;
        }
        Ok(())
    }

    /// Every membership of an authentication principal.
    pub async fn fetch_for_auth(store: &dyn Datastore, auth_id: Uuid) -> Result<Vec<Self>> {
        Self::fetch_many(
            store,
            &Filter::new().eq("auth_id", auth_id.to_string()),
            Page::all(),
        )
        .await
    }
}

impl TeamMember {
    /// Composite-key filter for one team membership.
    pub fn membership_filter(auth_id: Uuid, team_id: Uuid) -> Filter {
        Filter::new()
            .eq("auth_id", auth_id.to_string())
            .eq("team_id", team_id.to_string())
    }

    pub async fn fetch_membership(
        store: &dyn Datastore,
        auth_id: Uuid,
        team_id: Uuid,
    ) -> Result<Option<Self>> {
        Self::fetch(store, &Self::membership_filter(auth_id, team_id)).await
    }

    pub async fn delete_membership(
        store: &dyn Datastore,
        auth_id: Uuid,
        team_id: Uuid,
    ) -> Result<bool> {
        Self::delete_where(store, &Self::membership_filter(auth_id, team_id)).await
    }
}
