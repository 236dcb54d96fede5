//! Conversion of provider records into unresolved tracks.

use tracing::trace;

use crate::providers::RawSearchItem;
use crate::types::{RequestContext, UNKNOWN_TITLE, UnresolvedTrack};

/// Build an [`UnresolvedTrack`] from a provider record.
///
/// Returns `None` when the record has no usable uri; the caller drops it
/// and carries on with the rest of the batch.
pub fn normalize(item: RawSearchItem, ctx: &RequestContext) -> Option<UnresolvedTrack> {
    let RawSearchItem {
        url,
        uri,
        title,
        author,
        artwork_url,
        identifier,
    } = item;

    let Some(uri) = non_empty(url).or_else(|| non_empty(uri)) else {
        trace!("Dropping search item without uri (title: {:?})", title);
        return None;
    };

    let identifier = non_empty(identifier).unwrap_or_else(|| last_segment(&uri).to_string());

    Some(UnresolvedTrack {
        title: title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        author,
        artwork_url,
        identifier,
        request_context: ctx.clone(),
        uri,
    })
}

/// Everything after the final `/`, or the whole string when there is none.
fn last_segment(uri: &str) -> &str {
    uri.split('/').next_back().unwrap_or(uri)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
