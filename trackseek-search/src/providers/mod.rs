//! Provider implementations for external search sources.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::ProviderError;
use crate::validator::QueryRules;

pub mod bandcamp;
pub mod mock;

pub use bandcamp::BandcampProvider;
#[cfg(test)]
pub use mock::MockProvider;

/// Provider-local record, typed but with every field optional.
///
/// Each provider fills in whichever aliases its source uses; the
/// normalizer decides what survives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSearchItem {
    /// Preferred location field
    pub url: Option<String>,
    /// Fallback location field
    pub uri: Option<String>,
    /// Track title
    pub title: Option<String>,
    /// Artist or uploader
    pub author: Option<String>,
    /// Cover art location
    pub artwork_url: Option<String>,
    /// Source-assigned id
    pub identifier: Option<String>,
}

/// Trait for external search sources.
///
/// One implementation per source; instances are registered with the
/// dispatcher at startup and shared across concurrent resolutions.
#[async_trait]
pub trait SearchProvider: Send + Sync + std::fmt::Debug {
    /// Human-readable source name for logs.
    fn name(&self) -> &str;

    /// Syntactic constraints checked before [`SearchProvider::search`] runs.
    fn query_rules(&self) -> QueryRules {
        QueryRules::default()
    }

    /// Metadata copied into the envelope's `pluginInfo` on success.
    fn plugin_info(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Look up `query`, issuing exactly one outbound request.
    ///
    /// A reachable source with no matches yields an empty vector.
    ///
    /// # Errors
    /// - `ProviderError::Network` - Request never produced a response
    /// - `ProviderError::HttpStatus` - Source answered with a non-2xx status
    /// - `ProviderError::Parse` - Response body had an unexpected shape
    async fn search(&self, query: &str) -> Result<Vec<RawSearchItem>, ProviderError>;
}
