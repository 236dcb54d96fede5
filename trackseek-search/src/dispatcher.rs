//! Provider registry and resolution entry point.
//!
//! The dispatcher maps source keys to providers, validates queries, calls
//! the provider under a uniform error boundary and packs whatever happened
//! into a [`LoadResult`]. It never returns an error and never panics
//! outward: provider failures, cancellation and provider panics all become
//! error envelopes.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::debug::{DebugEvent, DebugReporter};
use crate::errors::{ProviderError, SearchError};
use crate::normalizer::normalize;
use crate::providers::{BandcampProvider, RawSearchItem, SearchProvider};
use crate::transport::HttpTransport;
use crate::types::{LoadResult, RequestContext};
use crate::validator::QueryRules;

/// Key the Bandcamp provider is registered under by [`SearchDispatcher::with_defaults`].
pub const BANDCAMP_SOURCE: &str = "bcsearch";

/// One entry of a batch lookup.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Source key or alias
    pub source_key: String,
    /// Query handed to the provider
    pub query: String,
    /// Caller metadata attached to every track
    pub context: RequestContext,
}

impl ResolveRequest {
    /// Creates a batch entry.
    pub fn new(source_key: &str, query: &str, context: RequestContext) -> Self {
        Self {
            source_key: source_key.to_string(),
            query: query.to_string(),
            context,
        }
    }
}

#[derive(Debug)]
struct Registration {
    provider: Arc<dyn SearchProvider>,
    rules: QueryRules,
}

/// Immutable registry of search providers.
///
/// Built once with [`SearchDispatcherBuilder`]; safe to share across tasks
/// and to resolve on concurrently without locking.
#[derive(Debug)]
pub struct SearchDispatcher {
    registry: HashMap<String, Registration>,
    aliases: HashMap<String, String>,
    default_source: Option<String>,
    reporter: DebugReporter,
}

/// Collects registrations before the dispatcher is frozen.
#[derive(Debug)]
pub struct SearchDispatcherBuilder {
    max_query_length: usize,
    registry: HashMap<String, Registration>,
    aliases: HashMap<String, String>,
    default_source: Option<String>,
    reporter: DebugReporter,
}

impl SearchDispatcherBuilder {
    fn new(config: &SearchConfig) -> Self {
        Self {
            max_query_length: config.max_query_length,
            registry: HashMap::new(),
            aliases: HashMap::new(),
            default_source: None,
            reporter: DebugReporter::new(config.debug),
        }
    }

    /// Register `provider` under `source_key`, replacing any previous one.
    pub fn register(mut self, source_key: &str, provider: Arc<dyn SearchProvider>) -> Self {
        let rules = provider.query_rules().capped_at(self.max_query_length);
        let key = normalize_key(source_key);
        debug!("Registering search provider '{}' as '{}'", provider.name(), key);
        self.registry.insert(key, Registration { provider, rules });
        self
    }

    /// Make `alias` resolve to whatever `target` is registered as.
    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        self.aliases
            .insert(normalize_key(alias), normalize_key(target));
        self
    }

    /// Source used by [`SearchDispatcher::resolve_prefixed`] for unprefixed queries.
    pub fn default_source(mut self, source_key: &str) -> Self {
        self.default_source = Some(normalize_key(source_key));
        self
    }

    /// Replace the reporter derived from the config's debug flag.
    pub fn reporter(mut self, reporter: DebugReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> SearchDispatcher {
        SearchDispatcher {
            registry: self.registry,
            aliases: self.aliases,
            default_source: self.default_source,
            reporter: self.reporter,
        }
    }
}

impl SearchDispatcher {
    /// Start building a dispatcher.
    pub fn builder(config: &SearchConfig) -> SearchDispatcherBuilder {
        SearchDispatcherBuilder::new(config)
    }

    /// Dispatcher with the built-in sources wired to `transport`.
    ///
    /// Bandcamp answers to `bcsearch`, `bc` and `bandcamp`, and is the
    /// default source for unprefixed queries.
    pub fn with_defaults(config: &SearchConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let bandcamp = BandcampProvider::with_config(transport, config.bandcamp.clone());

        Self::builder(config)
            .register(BANDCAMP_SOURCE, Arc::new(bandcamp))
            .alias("bc", BANDCAMP_SOURCE)
            .alias("bandcamp", BANDCAMP_SOURCE)
            .default_source(BANDCAMP_SOURCE)
            .build()
    }

    /// Registered source keys, sorted. Aliases are not included.
    pub fn sources(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// True when `source_key` (or an alias of it) is registered.
    pub fn has_source(&self, source_key: &str) -> bool {
        self.lookup(source_key).is_some()
    }

    /// Resolve `query` against the provider registered as `source_key`.
    pub async fn resolve(
        &self,
        source_key: &str,
        query: &str,
        context: RequestContext,
    ) -> LoadResult {
        self.resolve_inner(source_key, query, context, None).await
    }

    /// Like [`SearchDispatcher::resolve`], abandoning the provider call when
    /// `cancel` fires. A cancelled call yields a provider-error envelope.
    pub async fn resolve_cancellable(
        &self,
        source_key: &str,
        query: &str,
        context: RequestContext,
        cancel: &CancellationToken,
    ) -> LoadResult {
        self.resolve_inner(source_key, query, context, Some(cancel))
            .await
    }

    /// Resolve a `source:query` string.
    ///
    /// The text before the first `:` selects the source when it names a
    /// registered one; otherwise the whole string goes to the default source.
    pub async fn resolve_prefixed(&self, query: &str, context: RequestContext) -> LoadResult {
        self.resolve_prefixed_inner(query, context, None).await
    }

    /// Like [`SearchDispatcher::resolve_prefixed`], abandoning the provider
    /// call when `cancel` fires.
    pub async fn resolve_prefixed_cancellable(
        &self,
        query: &str,
        context: RequestContext,
        cancel: &CancellationToken,
    ) -> LoadResult {
        self.resolve_prefixed_inner(query, context, Some(cancel))
            .await
    }

    /// Resolve several lookups concurrently; results keep the input order.
    pub async fn resolve_many(&self, requests: Vec<ResolveRequest>) -> Vec<LoadResult> {
        join_all(requests.into_iter().map(|request| async move {
            self.resolve(&request.source_key, &request.query, request.context)
                .await
        }))
        .await
    }

    async fn resolve_prefixed_inner(
        &self,
        query: &str,
        context: RequestContext,
        cancel: Option<&CancellationToken>,
    ) -> LoadResult {
        let prefix = query.split_once(':');
        if let Some((source_key, rest)) = prefix {
            if self.has_source(source_key) {
                return self
                    .resolve_inner(source_key, rest.trim_start(), context, cancel)
                    .await;
            }
        }

        // Without a default source, the unmatched prefix is what gets reported.
        let source_key = match &self.default_source {
            Some(source_key) => source_key.as_str(),
            None => prefix.map_or("", |(source_key, _)| source_key),
        };
        self.resolve_inner(source_key, query, context, cancel).await
    }

    async fn resolve_inner(
        &self,
        source_key: &str,
        query: &str,
        context: RequestContext,
        cancel: Option<&CancellationToken>,
    ) -> LoadResult {
        let result = match self.try_resolve(source_key, query, &context, cancel).await {
            Ok(result) => result,
            Err(error) => {
                match &error {
                    SearchError::Provider { .. } => warn!("{error}"),
                    _ => debug!("{error}"),
                }
                LoadResult::error(&error)
            }
        };

        self.reporter.report(DebugEvent::Outcome {
            source_key: source_key.to_string(),
            load_type: result.load_type(),
            track_count: result.tracks().len(),
        });

        result
    }

    async fn try_resolve(
        &self,
        source_key: &str,
        query: &str,
        context: &RequestContext,
        cancel: Option<&CancellationToken>,
    ) -> crate::Result<LoadResult> {
        let (key, registration) =
            self.lookup(source_key)
                .ok_or_else(|| SearchError::UnknownSource {
                    source_key: source_key.to_string(),
                })?;

        registration.rules.validate(key, query)?;

        self.reporter.report(DebugEvent::Dispatch {
            source_key: key.to_string(),
            query: query.to_string(),
        });

        let (items, plugin_info) =
            search_contained(registration.provider.as_ref(), query, cancel)
                .await
                .map_err(|error| SearchError::Provider {
                    source_key: key.to_string(),
                    error,
                })?;

        let tracks = items
            .into_iter()
            .filter_map(|item| normalize(item, context))
            .collect();

        Ok(LoadResult::search(tracks, plugin_info))
    }

    fn lookup(&self, source_key: &str) -> Option<(&str, &Registration)> {
        let key = normalize_key(source_key);
        let key = self.aliases.get(&key).cloned().unwrap_or(key);
        self.registry
            .get_key_value(&key)
            .map(|(key, registration)| (key.as_str(), registration))
    }
}

/// Run a provider search and collect its metadata, turning panics and
/// cancellation into errors.
async fn search_contained(
    provider: &dyn SearchProvider,
    query: &str,
    cancel: Option<&CancellationToken>,
) -> Result<(Vec<RawSearchItem>, Map<String, Value>), ProviderError> {
    let search = AssertUnwindSafe(async {
        let items = provider.search(query).await?;
        Ok::<_, ProviderError>((items, provider.plugin_info()))
    })
    .catch_unwind();

    let outcome = match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ProviderError::Cancelled),
                outcome = search => outcome,
            }
        }
        None => search.await,
    };

    outcome.unwrap_or_else(|payload| {
        Err(ProviderError::Panicked {
            reason: panic_reason(payload.as_ref()),
        })
    })
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

fn normalize_key(source_key: &str) -> String {
    source_key.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;
    use regex::Regex;
    use serde_json::{Map, Value, json};

    use super::*;
    use crate::debug::DebugSink;
    use crate::errors::ErrorKind;
    use crate::providers::MockProvider;
    use crate::providers::mock::MockBehavior;
    use crate::types::LoadKind;

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<DebugEvent>>);

    impl DebugSink for Recorder {
        fn emit(&self, event: &DebugEvent) {
            self.0.lock().push(event.clone());
        }
    }

    fn raw(url: Option<&str>, title: &str) -> RawSearchItem {
        RawSearchItem {
            url: url.map(String::from),
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn dispatcher_with(provider: Arc<MockProvider>) -> SearchDispatcher {
        SearchDispatcher::builder(&SearchConfig::default())
            .register("mock", provider)
            .build()
    }

    fn assert_envelope_invariant(result: &LoadResult) {
        assert!(!(result.exception().is_some() && !result.tracks().is_empty()));
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let provider = Arc::new(MockProvider::returning(Vec::new()));
        let dispatcher = dispatcher_with(provider.clone());

        let result = dispatcher
            .resolve("nope", "query", RequestContext::none())
            .await;

        assert_eq!(result.load_type(), LoadKind::Error);
        assert_eq!(result.exception().unwrap().kind, ErrorKind::UnknownSource);
        assert!(result.tracks().is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_query_skips_provider() {
        let rules = QueryRules::default().with_pattern(Regex::new(r"^\d+$").unwrap());
        let provider = Arc::new(MockProvider::returning(Vec::new()).with_rules(rules));
        let dispatcher = dispatcher_with(provider.clone());

        let empty = dispatcher.resolve("mock", "", RequestContext::none()).await;
        let wrong = dispatcher
            .resolve("mock", "not an id", RequestContext::none())
            .await;

        assert_eq!(empty.exception().unwrap().kind, ErrorKind::InvalidQuery);
        assert_eq!(wrong.exception().unwrap().kind, ErrorKind::InvalidQuery);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_config_caps_query_length() {
        let config = SearchConfig {
            max_query_length: 5,
            ..Default::default()
        };
        let provider = Arc::new(MockProvider::returning(Vec::new()));
        let dispatcher = SearchDispatcher::builder(&config)
            .register("mock", provider.clone())
            .build();

        let result = dispatcher
            .resolve("mock", "too long", RequestContext::none())
            .await;

        assert_eq!(result.exception().unwrap().kind, ErrorKind::InvalidQuery);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_contained() {
        let provider = Arc::new(MockProvider::new(MockBehavior::NetworkFailure(
            "connection reset".to_string(),
        )));
        let dispatcher = dispatcher_with(provider.clone());

        let result = dispatcher.resolve("mock", "q", RequestContext::none()).await;

        assert_eq!(result.load_type(), LoadKind::Error);
        let exception = result.exception().unwrap();
        assert_eq!(exception.kind, ErrorKind::ProviderError);
        assert!(exception.message.contains("connection reset"));
        assert!(result.tracks().is_empty());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_panic_is_contained() {
        let provider = Arc::new(MockProvider::new(MockBehavior::Panic));
        let dispatcher = dispatcher_with(provider);

        let result = dispatcher.resolve("mock", "q", RequestContext::none()).await;

        let exception = result.exception().unwrap();
        assert_eq!(exception.kind, ErrorKind::ProviderError);
        assert!(exception.message.contains("mock provider exploded"));
    }

    #[tokio::test]
    async fn test_plugin_info_panic_is_contained() {
        let provider = Arc::new(
            MockProvider::returning(vec![raw(Some("https://x.example/t/1"), "one")])
                .with_panicking_plugin_info(),
        );
        let dispatcher = dispatcher_with(provider.clone());

        let results = dispatcher
            .resolve_many(vec![
                ResolveRequest::new("mock", "q", RequestContext::none()),
                ResolveRequest::new("mock", "again", RequestContext::none()),
            ])
            .await;

        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(result.load_type(), LoadKind::Error);
            let exception = result.exception().unwrap();
            assert_eq!(exception.kind, ErrorKind::ProviderError);
            assert!(exception.message.contains("mock plugin info exploded"));
            assert_envelope_invariant(result);
        }
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_drops_uriless_items_in_order() {
        let provider = Arc::new(MockProvider::returning(vec![
            raw(Some("https://x.example/track/1"), "one"),
            raw(None, "broken"),
            raw(Some("https://x.example/track/3"), "three"),
        ]));
        let dispatcher = dispatcher_with(provider);
        let ctx = RequestContext::new(json!({"id": 7}));

        let result = dispatcher.resolve("mock", "q", ctx.clone()).await;

        assert_eq!(result.load_type(), LoadKind::Search);
        assert!(result.exception().is_none());
        let titles: Vec<_> = result.tracks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "three"]);
        assert!(result.tracks().iter().all(|t| t.request_context.same_as(&ctx)));
        assert_eq!(result.tracks()[1].identifier, "3");
    }

    #[tokio::test]
    async fn test_zero_items_is_empty() {
        let provider = Arc::new(MockProvider::returning(Vec::new()));
        let dispatcher = dispatcher_with(provider);

        let result = dispatcher.resolve("mock", "q", RequestContext::none()).await;

        assert_eq!(result.load_type(), LoadKind::Empty);
        assert!(result.exception().is_none());
        assert!(result.tracks().is_empty());
    }

    #[tokio::test]
    async fn test_plugin_info_carried_on_success() {
        let mut info = Map::new();
        info.insert("provider".to_string(), Value::from("mock"));
        let provider = Arc::new(
            MockProvider::returning(vec![raw(Some("https://x.example/t/1"), "one")])
                .with_plugin_info(info),
        );
        let dispatcher = dispatcher_with(provider);

        let result = dispatcher.resolve("mock", "q", RequestContext::none()).await;

        assert_eq!(result.plugin_info()["provider"], "mock");
    }

    #[tokio::test]
    async fn test_cancellation_yields_provider_error() {
        let provider = Arc::new(MockProvider::new(MockBehavior::Pending));
        let dispatcher = dispatcher_with(provider.clone());
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = dispatcher
            .resolve_cancellable("mock", "q", RequestContext::none(), &token)
            .await;

        let exception = result.exception().unwrap();
        assert_eq!(exception.kind, ErrorKind::ProviderError);
        assert_eq!(exception.message, "Provider 'mock' failed: Request cancelled");
    }

    #[tokio::test]
    async fn test_aliases_and_key_normalization() {
        let provider = Arc::new(MockProvider::returning(vec![raw(
            Some("https://x.example/t/1"),
            "one",
        )]));
        let dispatcher = SearchDispatcher::builder(&SearchConfig::default())
            .register("MockSearch", provider.clone())
            .alias("ms", "mocksearch")
            .build();

        let direct = dispatcher
            .resolve(" mocksearch ", "q", RequestContext::none())
            .await;
        let aliased = dispatcher.resolve("MS", "q", RequestContext::none()).await;

        assert_eq!(direct.load_type(), LoadKind::Search);
        assert_eq!(aliased.load_type(), LoadKind::Search);
        assert_eq!(provider.calls(), 2);
        assert_eq!(dispatcher.sources(), vec!["mocksearch"]);
    }

    #[tokio::test]
    async fn test_resolve_prefixed() {
        let mock = Arc::new(MockProvider::returning(vec![raw(
            Some("https://x.example/t/1"),
            "one",
        )]));
        let fallback = Arc::new(MockProvider::returning(Vec::new()));
        let dispatcher = SearchDispatcher::builder(&SearchConfig::default())
            .register("mock", mock.clone())
            .register("fallback", fallback.clone())
            .default_source("fallback")
            .build();

        let prefixed = dispatcher
            .resolve_prefixed("mock: roygbiv", RequestContext::none())
            .await;
        let url = dispatcher
            .resolve_prefixed("https://x.example/t/1", RequestContext::none())
            .await;

        assert_eq!(prefixed.load_type(), LoadKind::Search);
        assert_eq!(url.load_type(), LoadKind::Empty);
        assert_eq!(mock.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_resolve_prefixed_without_default() {
        let provider = Arc::new(MockProvider::returning(Vec::new()));
        let dispatcher = dispatcher_with(provider.clone());

        let result = dispatcher
            .resolve_prefixed("spsearch:daft punk", RequestContext::none())
            .await;

        let exception = result.exception().unwrap();
        assert_eq!(exception.kind, ErrorKind::UnknownSource);
        assert_eq!(exception.message, "Unknown source: spsearch");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_resolve_prefixed_without_default_reports_outcome() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = SearchDispatcher::builder(&SearchConfig::default())
            .register("mock", Arc::new(MockProvider::returning(Vec::new())))
            .reporter(DebugReporter::with_sink(recorder.clone()))
            .build();

        dispatcher
            .resolve_prefixed("spsearch:daft punk", RequestContext::none())
            .await;

        let events = recorder.0.lock();
        assert_eq!(
            *events,
            vec![DebugEvent::Outcome {
                source_key: "spsearch".to_string(),
                load_type: LoadKind::Error,
                track_count: 0,
            }]
        );
    }

    #[tokio::test]
    async fn test_resolve_prefixed_cancellable() {
        let pending = Arc::new(MockProvider::new(MockBehavior::Pending));
        let dispatcher = SearchDispatcher::builder(&SearchConfig::default())
            .register("slow", pending.clone())
            .default_source("slow")
            .build();
        let token = CancellationToken::new();
        token.cancel();

        let prefixed = dispatcher
            .resolve_prefixed_cancellable("slow:q", RequestContext::none(), &token)
            .await;
        let bare = dispatcher
            .resolve_prefixed_cancellable("q", RequestContext::none(), &token)
            .await;

        for result in [&prefixed, &bare] {
            let exception = result.exception().unwrap();
            assert_eq!(exception.kind, ErrorKind::ProviderError);
            assert_eq!(exception.message, "Provider 'slow' failed: Request cancelled");
        }
    }

    #[tokio::test]
    async fn test_resolve_many_isolates_failures() {
        let good = Arc::new(MockProvider::returning(vec![raw(
            Some("https://x.example/t/1"),
            "one",
        )]));
        let bad = Arc::new(MockProvider::new(MockBehavior::NetworkFailure(
            "down".to_string(),
        )));
        let dispatcher = SearchDispatcher::builder(&SearchConfig::default())
            .register("good", good)
            .register("bad", bad)
            .build();

        let results = dispatcher
            .resolve_many(vec![
                ResolveRequest::new("bad", "q", RequestContext::none()),
                ResolveRequest::new("good", "q", RequestContext::none()),
                ResolveRequest::new("missing", "q", RequestContext::none()),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].exception().unwrap().kind, ErrorKind::ProviderError);
        assert_eq!(results[1].load_type(), LoadKind::Search);
        assert_eq!(results[2].exception().unwrap().kind, ErrorKind::UnknownSource);
        results.iter().for_each(assert_envelope_invariant);
    }

    #[tokio::test]
    async fn test_debug_reporter_sees_dispatch_before_outcome() {
        let recorder = Arc::new(Recorder::default());
        let provider = Arc::new(MockProvider::returning(Vec::new()));
        let dispatcher = SearchDispatcher::builder(&SearchConfig::default())
            .register("mock", provider)
            .reporter(DebugReporter::with_sink(recorder.clone()))
            .build();

        dispatcher
            .resolve("mock", "roygbiv", RequestContext::none())
            .await;
        dispatcher.resolve("nope", "q", RequestContext::none()).await;

        let events = recorder.0.lock();
        assert_eq!(
            events[0],
            DebugEvent::Dispatch {
                source_key: "mock".to_string(),
                query: "roygbiv".to_string(),
            }
        );
        assert!(matches!(
            events[1],
            DebugEvent::Outcome {
                load_type: LoadKind::Empty,
                ..
            }
        ));
        // Unknown sources never reach a provider, so only the outcome is reported.
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[2],
            DebugEvent::Outcome {
                load_type: LoadKind::Error,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_debug_disabled_by_default() {
        let provider = Arc::new(MockProvider::returning(Vec::new()));
        let dispatcher = dispatcher_with(provider);

        assert!(!dispatcher.reporter.is_enabled());
    }
}
