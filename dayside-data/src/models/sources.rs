//! Web source models: resolved content and source relationships

use super::domain_model;
use crate::store::{Datastore, Filter, Page};
use crate::value::EnumDef;
use dayside_common::Result;
use uuid::Uuid;

/// Resolution lifecycle of a source row.
pub static RESOLVE_STATE: EnumDef = EnumDef {
    name: "resolve_state",
    variants: &["unresolved", "failed", "resolved"],
};

domain_model! {
    /// Row in `source`: a piece of web content referenced by panels.
    pub struct Source {
        table: "source",
        conflict: ["id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            url / set_url: Text => "url", required;
            resolved_url / set_resolved_url: Text => "resolved_url", optional;
            title / set_title: Text => "title", optional;
            image_url / set_image_url: Text => "image_url", optional;
            publisher / set_publisher: Text => "publisher", optional;
            author / set_author: Text => "author", optional;
            published_at / set_published_at: Timestamp => "published_at", optional;
            article / set_article: Text => "article", optional;
            resolve_state / set_resolve_state: Enum(RESOLVE_STATE) => "resolve_state", optional, default = crate::fields::DefaultValue::Text("unresolved");
            data / set_data: Json => "data", optional;
        }
    }
}

domain_model! {
    /// Row in `source_relationship`, linking related sources; keyed by
    /// (source_id, related_source_id).
    pub struct SourceRelationship {
        table: "source_relationship",
        conflict: ["source_id", "related_source_id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            source_id / set_source_id: Uuid => "source_id", required;
            related_source_id / set_related_source_id: Uuid => "related_source_id", required;
            relation / set_relation: Text => "relation", optional;
        }
    }
}

impl Source {
    pub async fn fetch_by_id(store: &dyn Datastore, id: Uuid) -> Result<Option<Self>> {
        Self::fetch(store, &Filter::new().eq("id", id.to_string())).await
    }

    pub async fn fetch_by_ids(store: &dyn Datastore, ids: &[Uuid]) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let values = ids.iter().map(|id| serde_json::Value::String(id.to_string()));
        Self::fetch_many(store, &Filter::new().any_of("id", values), Page::all()).await
    }
}

impl SourceRelationship {
    /// Composite-key filter for one relationship.
    pub fn link_filter(source_id: Uuid, related_source_id: Uuid) -> Filter {
        Filter::new()
            .eq("source_id", source_id.to_string())
            .eq("related_source_id", related_source_id.to_string())
    }

    /// Every relationship originating from `source_id`.
    pub async fn fetch_for_source(store: &dyn Datastore, source_id: Uuid) -> Result<Vec<Self>> {
        Self::fetch_many(
            store,
            &Filter::new().eq("source_id", source_id.to_string()),
            Page::all(),
        )
        .await
    }
}
