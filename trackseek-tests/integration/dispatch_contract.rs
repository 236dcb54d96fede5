//! Failure-containment contract of the dispatcher.

use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use trackseek_search::{ErrorKind, LoadKind, RequestContext, ResolveRequest};

use crate::support::{Reply, SpyTransport, assert_never_both, dispatcher};

#[tokio::test]
async fn unknown_source_makes_no_request() {
    let transport = SpyTransport::new(Reply::Json(200, json!({"results": []})));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .resolve("spsearch", "daft punk", RequestContext::none())
        .await;

    assert_eq!(result.load_type(), LoadKind::Error);
    assert_eq!(result.exception().unwrap().kind, ErrorKind::UnknownSource);
    assert!(result.tracks().is_empty());
    assert_eq!(transport.calls(), 0);
    assert_never_both(&result);
}

#[tokio::test]
async fn invalid_query_makes_no_request() {
    let transport = SpyTransport::new(Reply::Json(200, json!({"results": []})));
    let dispatcher = dispatcher(&transport);
    let too_long = "x".repeat(1001);

    for query in ["", "   ", too_long.as_str()] {
        let result = dispatcher
            .resolve("bcsearch", query, RequestContext::none())
            .await;

        assert_eq!(result.exception().unwrap().kind, ErrorKind::InvalidQuery);
        assert_never_both(&result);
    }
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn transport_failure_becomes_error_envelope() {
    let transport = SpyTransport::new(Reply::Refused);
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .resolve("bcsearch", "roygbiv", RequestContext::none())
        .await;

    assert_eq!(result.load_type(), LoadKind::Error);
    assert_eq!(result.exception().unwrap().kind, ErrorKind::ProviderError);
    assert_eq!(transport.calls(), 1);
    assert_never_both(&result);
}

#[tokio::test]
async fn malformed_body_becomes_error_envelope() {
    let transport = SpyTransport::new(Reply::Raw(200, "<html>rate limited</html>"));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .resolve("bcsearch", "roygbiv", RequestContext::none())
        .await;

    assert_eq!(result.exception().unwrap().kind, ErrorKind::ProviderError);
    assert!(result.exception().unwrap().message.contains("Parse error"));
    assert_never_both(&result);
}

#[tokio::test]
async fn server_error_status_becomes_error_envelope() {
    let transport = SpyTransport::new(Reply::Json(500, json!({"error": true})));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .resolve("bcsearch", "roygbiv", RequestContext::none())
        .await;

    assert_eq!(result.exception().unwrap().kind, ErrorKind::ProviderError);
    assert!(result.exception().unwrap().message.contains("HTTP status 500"));
    assert_never_both(&result);
}

#[tokio::test]
async fn reachable_but_empty_is_empty_not_error() {
    let transport = SpyTransport::new(Reply::Json(200, json!({"results": []})));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .resolve("bcsearch", "zzzzzz", RequestContext::none())
        .await;

    assert_eq!(result.load_type(), LoadKind::Empty);
    assert!(result.exception().is_none());
    assert!(result.tracks().is_empty());
    assert_never_both(&result);
}

#[tokio::test]
async fn cancellation_abandons_in_flight_request() {
    let transport = SpyTransport::new(Reply::Hang);
    let dispatcher = dispatcher(&transport);
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = dispatcher
        .resolve_cancellable("bcsearch", "roygbiv", RequestContext::none(), &token)
        .await;

    assert_eq!(result.exception().unwrap().kind, ErrorKind::ProviderError);
    assert_eq!(transport.calls(), 1);
    assert_never_both(&result);
}

#[tokio::test]
async fn caller_deadline_drops_pending_call() {
    let transport = SpyTransport::new(Reply::Hang);
    let dispatcher = dispatcher(&transport);

    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        dispatcher.resolve("bcsearch", "roygbiv", RequestContext::none()),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn batch_keeps_order_and_isolates_failures() {
    let transport = SpyTransport::new(Reply::Refused);
    let dispatcher = dispatcher(&transport);

    let results = dispatcher
        .resolve_many(vec![
            ResolveRequest::new("bcsearch", "roygbiv", RequestContext::none()),
            ResolveRequest::new("nope", "roygbiv", RequestContext::none()),
            ResolveRequest::new("bc", "", RequestContext::none()),
        ])
        .await;

    let kinds: Vec<_> = results
        .iter()
        .map(|r| r.exception().map(|e| e.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            Some(ErrorKind::ProviderError),
            Some(ErrorKind::UnknownSource),
            Some(ErrorKind::InvalidQuery),
        ]
    );
    assert_eq!(transport.calls(), 1);
    results.iter().for_each(assert_never_both);
}

#[tokio::test]
async fn concurrent_resolves_share_one_dispatcher() {
    let transport = SpyTransport::new(Reply::Json(
        200,
        json!({"results": [{"type": "t", "name": "A", "url": "https://a.bandcamp.com/track/a"}]}),
    ));
    let dispatcher = std::sync::Arc::new(dispatcher(&transport));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .resolve("bcsearch", &format!("query {i}"), RequestContext::none())
                    .await
            })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.load_type(), LoadKind::Search);
        assert_never_both(&result);
    }
    assert_eq!(transport.calls(), 8);
}
