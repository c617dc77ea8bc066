//! Per-principal composite aggregate
//!
//! `UserData` owns everything the admin UI shows for one authenticated
//! principal: profile, organizations, per-organization teams/roles/
//! memberships, ACL groups, and user-defined data items. Sub-collections
//! populate lazily on first access; `refresh = true` re-queries and applies
//! an identity-preserving merge so live listeners keep their records.

use std::collections::HashMap;

use dayside_common::Result;
use uuid::Uuid;

use super::merge_keyed;
use crate::models::{
    AclGroup, AclGroupUser, Organization, OrganizationRole, OrganizationTeam, OrganizationUser,
    TeamMember, UserDataItem, UserProfile,
};
use crate::record::Record;
use crate::store::{Datastore, Filter, Page};

/// Everything owned by one authentication principal.
#[derive(Debug, Default)]
pub struct UserData {
    auth_id: Uuid,
    profile: Option<UserProfile>,
    organizations: Option<Vec<Organization>>,
    memberships: HashMap<Uuid, OrganizationUser>,
    teams: HashMap<Uuid, Vec<OrganizationTeam>>,
    roles: HashMap<Uuid, Vec<OrganizationRole>>,
    team_memberships: HashMap<Uuid, Vec<TeamMember>>,
    acl_memberships: Option<Vec<AclGroupUser>>,
    acl_groups: Option<Vec<AclGroup>>,
    items: Option<Vec<UserDataItem>>,
}

impl UserData {
    /// Construct for `auth_id`, optionally seeding a pre-fetched profile.
    pub fn new(auth_id: Uuid, profile: Option<UserProfile>) -> Self {
        Self {
            auth_id,
            profile,
            ..Self::default()
        }
    }

    pub fn auth_id(&self) -> Uuid {
        self.auth_id
    }

    /// The principal's profile; fetched on first access.
    pub async fn fetch_profile(
        &mut self,
        store: &dyn Datastore,
        refresh: bool,
    ) -> Result<Option<&UserProfile>> {
        if self.profile.is_none() || refresh {
            let fresh = UserProfile::fetch_by_auth(store, self.auth_id).await?;
            match (&mut self.profile, fresh) {
                (Some(existing), Some(incoming)) => existing.update_from(&incoming)?,
                (slot, fresh) => *slot = fresh,
            }
        }
        Ok(self.profile.as_ref())
    }

    /// Organizations the principal belongs to, derived from the membership
    /// join table. Also fills the per-organization membership cache.
    pub async fn fetch_organizations(
        &mut self,
        store: &dyn Datastore,
        refresh: bool,
    ) -> Result<&[Organization]> {
        if self.organizations.is_none() || refresh {
            let memberships = OrganizationUser::fetch_for_auth(store, self.auth_id).await?;
            let org_ids: Vec<Uuid> = memberships
                .iter()
                .filter_map(|m| m.organization_id())
                .collect();

            self.memberships.retain(|org_id, _| org_ids.contains(org_id));
            for membership in memberships {
                let Some(org_id) = membership.organization_id() else {
                    continue;
                };
                match self.memberships.get_mut(&org_id) {
                    Some(existing) => existing.update_from(&membership)?,
                    None => {
                        self.memberships.insert(org_id, membership);
                    }
                }
            }

            let fresh = if org_ids.is_empty() {
                Vec::new()
            } else {
                let values = org_ids
                    .iter()
                    .map(|id| serde_json::Value::String(id.to_string()));
                Organization::fetch_many(store, &Filter::new().any_of("id", values), Page::all())
                    .await?
            };
            match &mut self.organizations {
                Some(existing) => merge_keyed(existing, fresh)?,
                None => self.organizations = Some(fresh),
            }
        }
        Ok(self.organizations.as_deref().unwrap_or(&[]))
    }

    /// The principal's membership record in one organization.
    pub async fn fetch_membership(
        &mut self,
        store: &dyn Datastore,
        organization_id: Uuid,
        refresh: bool,
    ) -> Result<Option<&OrganizationUser>> {
        if !self.memberships.contains_key(&organization_id) || refresh {
            let fresh =
                OrganizationUser::fetch_membership(store, self.auth_id, organization_id).await?;
            match (self.memberships.get_mut(&organization_id), fresh) {
                (Some(existing), Some(incoming)) => existing.update_from(&incoming)?,
                (None, Some(incoming)) => {
                    self.memberships.insert(organization_id, incoming);
                }
                (_, None) => {
                    self.memberships.remove(&organization_id);
                }
            }
        }
        Ok(self.memberships.get(&organization_id))
    }

    /// Teams of an organization.
    pub async fn fetch_teams(
        &mut self,
        store: &dyn Datastore,
        organization_id: Uuid,
        refresh: bool,
    ) -> Result<&[OrganizationTeam]> {
        if !self.teams.contains_key(&organization_id) || refresh {
            let fresh = OrganizationTeam::fetch_many(
                store,
                &Filter::new().eq("organization_id", organization_id.to_string()),
                Page::all(),
            )
            .await?;
            merge_keyed(self.teams.entry(organization_id).or_default(), fresh)?;
        }
        Ok(self.teams.get(&organization_id).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Roles of an organization.
    pub async fn fetch_roles(
        &mut self,
        store: &dyn Datastore,
        organization_id: Uuid,
        refresh: bool,
    ) -> Result<&[OrganizationRole]> {
        if !self.roles.contains_key(&organization_id) || refresh {
            let fresh = OrganizationRole::fetch_many(
                store,
                &Filter::new().eq("organization_id", organization_id.to_string()),
                Page::all(),
            )
            .await?;
            merge_keyed(self.roles.entry(organization_id).or_default(), fresh)?;
        }
        Ok(self.roles.get(&organization_id).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// The principal's team memberships within an organization.
    pub async fn fetch_team_memberships(
        &mut self,
        store: &dyn Datastore,
        organization_id: Uuid,
        refresh: bool,
    ) -> Result<&[TeamMember]> {
        if !self.team_memberships.contains_key(&organization_id) || refresh {
            let team_ids: Vec<Uuid> = self
                .fetch_teams(store, organization_id, refresh)
                .await?
                .iter()
                .filter_map(|t| t.id())
                .collect();

            let fresh = if team_ids.is_empty() {
                Vec::new()
            } else {
                let values = team_ids
                    .iter()
                    .map(|id| serde_json::Value::String(id.to_string()));
                TeamMember::fetch_many(
                    store,
                    &Filter::new()
                        .eq("auth_id", self.auth_id.to_string())
                        .any_of("team_id", values),
                    Page::all(),
                )
                .await?
            };
            merge_keyed(self.team_memberships.entry(organization_id).or_default(), fresh)?;
        }
        Ok(self
            .team_memberships
            .get(&organization_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    /// Resolved ACL groups of the principal; also caches the raw group
    /// memberships.
    pub async fn fetch_acl_groups(
        &mut self,
        store: &dyn Datastore,
        refresh: bool,
    ) -> Result<&[AclGroup]> {
        if self.acl_groups.is_none() || refresh {
            let memberships = AclGroupUser::fetch_for_user(store, self.auth_id).await?;
            let group_ids: Vec<Uuid> = memberships
                .iter()
                .filter_map(|m| m.acl_group_id())
                .collect();
            match &mut self.acl_memberships {
                Some(existing) => merge_keyed(existing, memberships)?,
                None => self.acl_memberships = Some(memberships),
            }

            let fresh = AclGroup::fetch_by_ids(store, &group_ids).await?;
            match &mut self.acl_groups {
                Some(existing) => merge_keyed(existing, fresh)?,
                None => self.acl_groups = Some(fresh),
            }
        }
        Ok(self.acl_groups.as_deref().unwrap_or(&[]))
    }

    /// ACL membership rows backing `fetch_acl_groups`.
    pub fn acl_memberships(&self) -> &[AclGroupUser] {
        self.acl_memberships.as_deref().unwrap_or(&[])
    }

    /// The principal's user-data items, deduplicated by id.
    pub async fn fetch_items(
        &mut self,
        store: &dyn Datastore,
        refresh: bool,
    ) -> Result<&[UserDataItem]> {
        if self.items.is_none() || refresh {
            let mut fresh = UserDataItem::fetch_for_auth(store, self.auth_id).await?;
            let mut seen = Vec::new();
            fresh.retain(|item| match item.id() {
                Some(id) if seen.contains(&id) => false,
                Some(id) => {
                    seen.push(id);
                    true
                }
                None => true,
            });
            match &mut self.items {
                Some(existing) => merge_keyed(existing, fresh)?,
                None => self.items = Some(fresh),
            }
        }
        Ok(self.items.as_deref().unwrap_or(&[]))
    }

    /// Mutable access to cached items, for callers editing in place.
    pub fn items_mut(&mut self) -> &mut [UserDataItem] {
        self.items.as_deref_mut().unwrap_or(&mut [])
    }

    /// Persist every dirty owned record, one bulk upsert per table, all
    /// batches awaited jointly. A failed batch does not roll back the
    /// others; the first error is returned once every batch has settled.
    pub async fn save_all(&mut self, store: &dyn Datastore) -> Result<()> {
        let mut profile: Vec<&mut Record> =
            self.profile.iter_mut().map(|p| p.record_mut()).collect();
        let mut organizations: Vec<&mut Record> = self
            .organizations
            .iter_mut()
            .flatten()
            .map(|o| o.record_mut())
            .collect();
        let mut memberships: Vec<&mut Record> = self
            .memberships
            .values_mut()
            .map(|m| m.record_mut())
            .collect();
        let mut teams: Vec<&mut Record> = self
            .teams
            .values_mut()
            .flatten()
            .map(|t| t.record_mut())
            .collect();
        let mut roles: Vec<&mut Record> = self
            .roles
            .values_mut()
            .flatten()
            .map(|r| r.record_mut())
            .collect();
        let mut team_memberships: Vec<&mut Record> = self
            .team_memberships
            .values_mut()
            .flatten()
            .map(|m| m.record_mut())
            .collect();
        let mut items: Vec<&mut Record> =
            self.items.iter_mut().flatten().map(|i| i.record_mut()).collect();

        let batches = vec![
            Record::bulk_upsert(store, &mut profile),
            Record::bulk_upsert(store, &mut organizations),
            Record::bulk_upsert(store, &mut memberships),
            Record::bulk_upsert(store, &mut teams),
            Record::bulk_upsert(store, &mut roles),
            Record::bulk_upsert(store, &mut team_memberships),
            Record::bulk_upsert(store, &mut items),
        ];
        let results = futures::future::join_all(batches).await;

        let mut first_err = None;
        for result in results {
            if let Err(err) = result {
                tracing::error!(error = %err, "bulk save failed for one table");
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
