//! Composite aggregates
//!
//! Multi-record views sitting between callers and the domain models: they
//! fan out fetches, cache results, and fan in saves as per-table bulk
//! upserts.

mod user_data;
mod web_source;

pub use user_data::UserData;
pub use web_source::{
    ExtractedArticle, MergeSource, ResolveState, UrlResolution, WebSource, WebSourceCollection,
};

use crate::record::Record;
use dayside_common::Result;
use std::ops::DerefMut;

/// Identity-preserving collection refresh: entries whose id survives are
/// merged in place (their listener subscriptions stay attached), new ids
/// are appended, vanished ids removed.
pub(crate) fn merge_keyed<T>(existing: &mut Vec<T>, fresh: Vec<T>) -> Result<()>
where
    T: DerefMut<Target = Record>,
{
    let fresh_ids: Vec<Option<uuid::Uuid>> = fresh.iter().map(|r| r.id()).collect();
    existing.retain(|e| fresh_ids.contains(&e.id()));

    for item in fresh {
        let slot = item
            .id()
            .and_then(|id| existing.iter_mut().find(|e| e.id() == Some(id)));
        match slot {
            Some(target) => target.update_from(&item)?,
            None => existing.push(item),
        }
    }
    Ok(())
}
