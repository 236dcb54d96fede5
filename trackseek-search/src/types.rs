//! Data types for search resolution.

use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::errors::{ErrorKind, ProviderError, SearchError};

/// Title given to tracks whose source supplied none.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Opaque caller metadata threaded through a resolution.
///
/// Cloning shares the underlying value; tracks produced from one call all
/// point at the same allocation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext(Option<Arc<Value>>);

impl RequestContext {
    /// Wraps caller metadata, typically the requester's identity.
    pub fn new(value: Value) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// Context carrying nothing.
    pub fn none() -> Self {
        Self(None)
    }

    /// Borrow the wrapped value.
    pub fn get(&self) -> Option<&Value> {
        self.0.as_deref()
    }

    /// True when both contexts share the same allocation (or are both empty).
    pub fn same_as(&self, other: &RequestContext) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Serialize for RequestContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.get() {
            Some(value) => value.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// Track reference that can later be resolved into playable audio.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedTrack {
    /// Location the track is later resolved from; never empty
    pub uri: String,
    /// Track title, or the placeholder when the source had none
    pub title: String,
    /// Artist or uploader
    pub author: Option<String>,
    /// Cover art location
    pub artwork_url: Option<String>,
    /// Source id, or the last path segment of `uri`
    pub identifier: String,
    /// Caller metadata shared with the originating request
    #[serde(rename = "requester")]
    pub request_context: RequestContext,
}

/// Tag describing what an envelope holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadKind {
    /// Search results
    Search,
    /// A whole playlist
    Playlist,
    /// One directly loaded track
    Track,
    /// Source reachable, nothing matched
    Empty,
    /// Resolution failed; see the exception
    Error,
}

/// How worrying a failure is, in Lavalink's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cause is known and expected, e.g. a bad query.
    Common,
    /// Cause is outside our control, e.g. the source went away.
    Suspicious,
    /// Something broke that should not have.
    Fault,
}

/// Error descriptor carried by a failed envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Exception {
    /// Failure category callers branch on
    pub kind: ErrorKind,
    /// Human-readable description including the cause
    pub message: String,
    /// How worrying the failure is
    pub severity: Severity,
}

impl From<&SearchError> for Exception {
    fn from(error: &SearchError) -> Self {
        let severity = match error {
            SearchError::InvalidQuery { .. } | SearchError::UnknownSource { .. } => {
                Severity::Common
            }
            SearchError::Provider { error, .. } => match error {
                ProviderError::Cancelled => Severity::Common,
                ProviderError::Panicked { .. } => Severity::Fault,
                ProviderError::Network { .. }
                | ProviderError::HttpStatus { .. }
                | ProviderError::Parse { .. } => Severity::Suspicious,
            },
        };

        Self {
            kind: error.kind(),
            message: error.to_string(),
            severity,
        }
    }
}

/// Playlist header for playlist-kind envelopes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    /// Playlist name
    pub name: String,
    /// Index of the track the source pointed at, if any
    pub selected_track: Option<usize>,
}

/// Uniform success-or-failure container returned by every resolution.
///
/// Fields are private so an envelope can never carry both an exception and
/// tracks; build one through the constructors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResult {
    load_type: LoadKind,
    exception: Option<Exception>,
    plugin_info: Map<String, Value>,
    playlist_info: Option<PlaylistInfo>,
    tracks: Vec<UnresolvedTrack>,
}

impl LoadResult {
    /// Search envelope; collapses to `empty` when no tracks survived.
    pub fn search(tracks: Vec<UnresolvedTrack>, plugin_info: Map<String, Value>) -> Self {
        let load_type = if tracks.is_empty() {
            LoadKind::Empty
        } else {
            LoadKind::Search
        };
        Self {
            load_type,
            exception: None,
            plugin_info,
            playlist_info: None,
            tracks,
        }
    }

    /// Playlist envelope.
    pub fn playlist(info: PlaylistInfo, tracks: Vec<UnresolvedTrack>) -> Self {
        Self {
            load_type: LoadKind::Playlist,
            exception: None,
            plugin_info: Map::new(),
            playlist_info: Some(info),
            tracks,
        }
    }

    /// Single-track envelope.
    pub fn track(track: UnresolvedTrack) -> Self {
        Self {
            load_type: LoadKind::Track,
            exception: None,
            plugin_info: Map::new(),
            playlist_info: None,
            tracks: vec![track],
        }
    }

    /// Failed envelope; never carries tracks.
    pub fn error(error: &SearchError) -> Self {
        Self {
            load_type: LoadKind::Error,
            exception: Some(Exception::from(error)),
            plugin_info: Map::new(),
            playlist_info: None,
            tracks: Vec::new(),
        }
    }

    /// What this envelope holds.
    pub fn load_type(&self) -> LoadKind {
        self.load_type
    }

    /// Failure descriptor; present only for error envelopes.
    pub fn exception(&self) -> Option<&Exception> {
        self.exception.as_ref()
    }

    /// Provider-specific metadata, possibly empty.
    pub fn plugin_info(&self) -> &Map<String, Value> {
        &self.plugin_info
    }

    /// Playlist header for playlist envelopes.
    pub fn playlist_info(&self) -> Option<&PlaylistInfo> {
        self.playlist_info.as_ref()
    }

    /// Tracks in source order.
    pub fn tracks(&self) -> &[UnresolvedTrack] {
        &self.tracks
    }

    /// Hand the tracks over to the caller.
    pub fn into_tracks(self) -> Vec<UnresolvedTrack> {
        self.tracks
    }

    /// Callers must branch on this, not on track emptiness.
    pub fn is_error(&self) -> bool {
        self.exception.is_some()
    }
}
