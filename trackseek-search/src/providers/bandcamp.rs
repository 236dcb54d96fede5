//! Bandcamp autocomplete search provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use super::{RawSearchItem, SearchProvider};
use crate::config::BandcampConfig;
use crate::errors::ProviderError;
use crate::transport::{HttpRequest, HttpTransport};

const ENDPOINT_AUTOCOMPLETE: &str = "/api/nusearch/2/autocomplete";

/// Discriminator Bandcamp uses for track entries.
const TRACK_TYPE: &str = "t";

/// Bandcamp search provider.
///
/// Queries the public autocomplete endpoint used by the Android app and
/// keeps only track entries; albums, bands and labels are filtered out.
#[derive(Debug)]
pub struct BandcampProvider {
    transport: Arc<dyn HttpTransport>,
    config: BandcampConfig,
}

/// Top-level autocomplete body.
#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    results: Option<Vec<Value>>,
}

/// Single autocomplete entry; any kind (track, album, band).
#[derive(Debug, Deserialize)]
struct AutocompleteEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    name: Option<String>,
    band_name: Option<String>,
    img: Option<String>,
    url: Option<String>,
    uri: Option<String>,
}

impl BandcampProvider {
    /// Create provider with default configuration.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_config(transport, BandcampConfig::default())
    }

    /// Create provider with custom configuration.
    pub fn with_config(transport: Arc<dyn HttpTransport>, config: BandcampConfig) -> Self {
        Self { transport, config }
    }

    fn build_request(&self, query: &str) -> Result<HttpRequest, ProviderError> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{ENDPOINT_AUTOCOMPLETE}")).map_err(|e| {
            ProviderError::Parse {
                reason: format!("Invalid Bandcamp endpoint '{base}': {e}"),
            }
        })?;
        url.query_pairs_mut().append_pair("q", query);

        Ok(HttpRequest::get(url)
            .header("User-Agent", &self.config.user_agent)
            .header("Cookie", "$Version=1"))
    }

    /// Parse an autocomplete body into track items.
    fn parse_tracks(body: &[u8]) -> Result<Vec<RawSearchItem>, ProviderError> {
        let response: AutocompleteResponse =
            serde_json::from_slice(body).map_err(|e| ProviderError::Parse {
                reason: format!("Bandcamp JSON parsing failed: {e}"),
            })?;

        let entries = response.results.unwrap_or_default();
        let total = entries.len();

        let tracks: Vec<RawSearchItem> = entries
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|entry| match serde_json::from_value::<AutocompleteEntry>(entry) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    trace!("Skipping malformed Bandcamp entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.kind.as_deref() == Some(TRACK_TYPE))
            .map(Self::to_raw_item)
            .collect();

        debug!("Bandcamp returned {} entries, {} tracks", total, tracks.len());
        Ok(tracks)
    }

    fn to_raw_item(entry: AutocompleteEntry) -> RawSearchItem {
        RawSearchItem {
            url: entry.url,
            uri: entry.uri,
            title: entry.name,
            author: entry.band_name,
            artwork_url: entry.img,
            identifier: entry.id.as_ref().and_then(render_id),
        }
    }
}

/// Render an id the way it appears in track urls; zero and "" count as absent.
fn render_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl SearchProvider for BandcampProvider {
    fn name(&self) -> &str {
        "bandcamp"
    }

    async fn search(&self, query: &str) -> Result<Vec<RawSearchItem>, ProviderError> {
        let request = self.build_request(query)?;
        let response = self.transport.get(request).await?;

        if !response.is_success() {
            return Err(ProviderError::HttpStatus {
                status: response.status,
            });
        }

        let mut tracks = Self::parse_tracks(&response.body)?;
        if let Some(limit) = self.config.search_limit {
            tracks.truncate(limit);
        }

        Ok(tracks)
    }
}
