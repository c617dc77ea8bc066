//! Panel content models: discussions, transcripts, audio, context queries

use super::domain_model;
use crate::store::{Datastore, Filter, Page};
use dayside_common::Result;
use uuid::Uuid;

domain_model! {
    /// Row in `panel_discussion`: one generated panel conversation.
    pub struct PanelDiscussion {
        table: "panel_discussion",
        conflict: ["id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            organization_id / set_organization_id: Uuid => "organization_id", optional;
            title / set_title: Text => "title", optional;
            topic / set_topic: Text => "topic", optional;
            panelist_count / set_panelist_count: Integer => "panelist_count", optional;
            language / set_language: Text => "language", optional;
            status / set_status: Text => "status", optional;
            metadata / set_metadata: Json => "metadata", optional;
            created_at / set_created_at: Timestamp => "created_at", optional;
        }
    }
}

domain_model! {
    /// Row in `panel_transcript`.
    pub struct PanelTranscript {
        table: "panel_transcript",
        conflict: ["id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            panel_id / set_panel_id: Uuid => "panel_id", required;
            content / set_content: Json => "content", optional;
            language / set_language: Text => "language", optional;
            created_at / set_created_at: Timestamp => "created_at", optional;
        }
    }
}

domain_model! {
    /// Row in `panel_audio`.
    pub struct PanelAudio {
        table: "panel_audio",
        conflict: ["id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            panel_id / set_panel_id: Uuid => "panel_id", required;
            transcript_id / set_transcript_id: Uuid => "transcript_id", optional;
            audio_url / set_audio_url: Text => "audio_url", optional;
            duration_seconds / set_duration_seconds: Float => "duration_seconds", optional;
            created_at / set_created_at: Timestamp => "created_at", optional;
        }
    }
}

domain_model! {
    /// Row in `context_query`: a saved research query feeding a panel.
    pub struct ContextQuery {
        table: "context_query",
        conflict: ["id"],
        id: "id",
        fields: {
            id / set_id: Uuid => "id", required;
            organization_id / set_organization_id: Uuid => "organization_id", optional;
            query / set_query: Text => "query", required;
            results / set_results: Json => "results", optional;
            created_at / set_created_at: Timestamp => "created_at", optional;
        }
    }
}

impl PanelDiscussion {
    /// Panels belonging to an organization, newest-first ordering left to
    /// the caller.
    pub async fn fetch_for_organization(
        store: &dyn Datastore,
        organization_id: Uuid,
        page: Page,
    ) -> Result<Vec<Self>> {
        Self::fetch_many(
            store,
            &Filter::new().eq("organization_id", organization_id.to_string()),
            page,
        )
        .await
    }
}

impl PanelTranscript {
    pub async fn fetch_for_panel(store: &dyn Datastore, panel_id: Uuid) -> Result<Vec<Self>> {
        Self::fetch_many(
            store,
            &Filter::new().eq("panel_id", panel_id.to_string()),
            Page::all(),
        )
        .await
    }
}

impl PanelAudio {
    pub async fn fetch_for_panel(store: &dyn Datastore, panel_id: Uuid) -> Result<Vec<Self>> {
        Self::fetch_many(
            store,
            &Filter::new().eq("panel_id", panel_id.to_string()),
            Page::all(),
        )
        .await
    }
}
