//! Web sources: resolved content and related-source collections
//!
//! A `WebSource` wraps a `Source` record and merges in progressively richer
//! data (URL resolution results, extracted articles, persisted rows) via
//! the `MergeSource` tagged union. Its resolve state only ever advances
//! toward `Resolved`.

use chrono::{DateTime, Utc};
use dayside_common::Result;
use uuid::Uuid;

use crate::models::{Source, SourceRelationship};
use crate::record::Record;
use crate::store::Datastore;

/// Resolution lifecycle. Variant order is the advancement order: merges
/// keep the furthest state reached, so a source never regresses to
/// `Unresolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResolveState {
    Unresolved,
    Failed,
    Resolved,
}

impl ResolveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveState::Unresolved => "unresolved",
            ResolveState::Failed => "failed",
            ResolveState::Resolved => "resolved",
        }
    }

    fn from_column(value: Option<&str>) -> ResolveState {
        match value {
            Some("resolved") => ResolveState::Resolved,
            Some("failed") => ResolveState::Failed,
            _ => ResolveState::Unresolved,
        }
    }
}

/// Outcome of resolving a URL (redirects followed, page metadata scraped).
#[derive(Debug, Clone, Default)]
pub struct UrlResolution {
    pub resolved_url: Option<String>,
    pub title: Option<String>,
    pub image: Option<String>,
    pub publisher: Option<String>,
}

/// Article content extracted from a resolved page.
#[derive(Debug, Clone, Default)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub author: Option<String>,
    pub text: Option<String>,
    pub top_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Tagged union of everything a `WebSource` can merge in. Matching is
/// exhaustive; there is no unrecognized-source case to fail on at runtime.
#[derive(Debug, Clone)]
pub enum MergeSource {
    UrlResolution(UrlResolution),
    Article(ExtractedArticle),
    Row(Source),
}

/// A piece of web content being resolved into a panel source.
#[derive(Debug, Clone)]
pub struct WebSource {
    source: Source,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl WebSource {
    /// Fresh, unresolved source for `url`.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let mut source = Source::new();
        source.set_url(url)?;
        Ok(Self { source })
    }

    /// Wrap an already-materialized source record.
    pub fn from_source(source: Source) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut Source {
        &mut self.source
    }

    pub fn into_source(self) -> Source {
        self.source
    }

    pub fn id(&self) -> Option<Uuid> {
        self.source.record().id()
    }

    pub fn resolve_state(&self) -> ResolveState {
        ResolveState::from_column(self.source.resolve_state())
    }

    fn advance_state(&mut self, target: ResolveState) -> Result<()> {
        if target > self.resolve_state() {
            self.source.set_resolve_state(target.as_str())?;
        }
        Ok(())
    }

    /// Merge richer data into this source.
    ///
    /// Each variant copies its fixed field subset, and only when the
    /// incoming value is non-null and non-empty: a merge can add detail
    /// but never blank out what an earlier merge established. Every merge
    /// advances the resolve state toward `Resolved`.
    pub fn update_from(&mut self, incoming: MergeSource) -> Result<()> {
        match incoming {
            MergeSource::UrlResolution(resolution) => {
                if let Some(v) = non_empty(&resolution.resolved_url) {
                    self.source.set_resolved_url(v)?;
                }
                if let Some(v) = non_empty(&resolution.title) {
                    self.source.set_title(v)?;
                }
                if let Some(v) = non_empty(&resolution.image) {
                    self.source.set_image_url(v)?;
                }
                if let Some(v) = non_empty(&resolution.publisher) {
                    self.source.set_publisher(v)?;
                }
                self.advance_state(ResolveState::Resolved)?;
            }
            MergeSource::Article(article) => {
                if let Some(v) = non_empty(&article.title) {
                    self.source.set_title(v)?;
                }
                if let Some(v) = non_empty(&article.author) {
                    self.source.set_author(v)?;
                }
                if let Some(v) = non_empty(&article.text) {
                    self.source.set_article(v)?;
                }
                if let Some(v) = non_empty(&article.top_image) {
                    self.source.set_image_url(v)?;
                }
                if let Some(ts) = article.published_at {
                    self.source.set_published_at(ts)?;
                }
                self.advance_state(ResolveState::Resolved)?;
            }
            MergeSource::Row(row) => {
                for (name, value) in row.record().attrs() {
                    // Resolve state merges monotonically below; null cells
                    // never overwrite established values.
                    if name == "resolve_state" || value.is_null() {
                        continue;
                    }
                    self.source.record_mut().set(name, value.clone())?;
                }
                self.advance_state(ResolveState::Resolved)?;
            }
        }
        Ok(())
    }

    pub async fn save(&mut self, store: &dyn Datastore) -> Result<()> {
        self.source.save(store).await
    }
}

/// A primary source plus its related sources, linked through the
/// `source_relationship` table.
#[derive(Debug)]
pub struct WebSourceCollection {
    primary: WebSource,
    related: Vec<WebSource>,
}

impl WebSourceCollection {
    pub fn new(primary: WebSource) -> Self {
        Self {
            primary,
            related: Vec::new(),
        }
    }

    pub fn primary(&self) -> &WebSource {
        &self.primary
    }

    pub fn primary_mut(&mut self) -> &mut WebSource {
        &mut self.primary
    }

    pub fn related(&self) -> &[WebSource] {
        &self.related
    }

    pub fn add_related(&mut self, source: WebSource) {
        self.related.push(source);
    }

    /// Load a collection rooted at `source_id`: the source row plus every
    /// related source reachable through the relationship table.
    pub async fn load(store: &dyn Datastore, source_id: Uuid) -> Result<Option<Self>> {
        let Some(primary) = Source::fetch_by_id(store, source_id).await? else {
            return Ok(None);
        };
        let links = SourceRelationship::fetch_for_source(store, source_id).await?;
        let related_ids: Vec<Uuid> = links.iter().filter_map(|l| l.related_source_id()).collect();
        let related = Source::fetch_by_ids(store, &related_ids)
            .await?
            .into_iter()
            .map(WebSource::from_source)
            .collect();
        Ok(Some(Self {
            primary: WebSource::from_source(primary),
            related,
        }))
    }

    /// Persist every dirty source in one bulk upsert, then make sure a
    /// relationship row links the primary to each related source
    /// (fetch-or-insert, so re-saving is idempotent).
    pub async fn save_all(&mut self, store: &dyn Datastore) -> Result<()> {
        let mut records: Vec<&mut Record> = Vec::with_capacity(1 + self.related.len());
        records.push(self.primary.source.record_mut());
        for source in &mut self.related {
            records.push(source.source.record_mut());
        }
        Record::bulk_upsert(store, &mut records).await?;

        let Some(primary_id) = self.primary.id() else {
            return Ok(());
        };
        for source in &self.related {
            let Some(related_id) = source.id() else {
                continue;
            };
            let filter = SourceRelationship::link_filter(primary_id, related_id);
            if SourceRelationship::exists(store, &filter).await? {
                continue;
            }
            let mut link = SourceRelationship::new();
            link.set_source_id(primary_id)?;
            link.set_related_source_id(related_id)?;
            link.save(store).await?;
        }
        Ok(())
    }
}
