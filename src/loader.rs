use std::collections::HashSet;

use anyhow::Result;

use crate::data::FeedSource;
use crate::model::{PostEntity, PresentedPost};

/// Fetches the feed and wraps every entity with collapsed UI state.
pub fn load(source: &dyn FeedSource) -> Result<Vec<PresentedPost>> {
    let events = source.load_events()?;
    Ok(present(events))
}

/// Identifiers must stay unique, so a repeated id keeps its first occurrence.
pub fn present(events: Vec<PostEntity>) -> Vec<PresentedPost> {
    let mut seen = HashSet::with_capacity(events.len());
    let mut out = Vec::with_capacity(events.len());
    for entity in events {
        if !seen.insert(entity.id.clone()) {
            tracing::warn!(id = %entity.id, "dropping duplicate event from feed");
            continue;
        }
        out.push(PresentedPost::new(entity));
    }
    out
}
