//! Shared fixtures: a transport that counts requests and replays a script.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use trackseek_search::{
    HttpRequest, HttpResponse, HttpTransport, LoadResult, ProviderError, SearchConfig,
    SearchDispatcher,
};

/// What the spy answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    Raw(u16, &'static str),
    Refused,
    Hang,
}

/// Transport that records every request and answers from a fixed reply.
#[derive(Debug)]
pub struct SpyTransport {
    reply: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
}

impl SpyTransport {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for SpyTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);

        match &self.reply {
            Reply::Json(status, body) => Ok(HttpResponse {
                status: *status,
                body: Bytes::from(body.to_string()),
            }),
            Reply::Raw(status, body) => Ok(HttpResponse {
                status: *status,
                body: Bytes::from_static(body.as_bytes()),
            }),
            Reply::Refused => Err(ProviderError::Network {
                reason: "connection refused".to_string(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Fails when an envelope carries both an exception and tracks.
pub fn assert_never_both(result: &LoadResult) {
    assert!(
        !(result.exception().is_some() && !result.tracks().is_empty()),
        "envelope carries both an exception and tracks: {result:?}"
    );
}

/// Dispatcher with the default sources wired to `transport`.
pub fn dispatcher(transport: &Arc<SpyTransport>) -> SearchDispatcher {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    SearchDispatcher::with_defaults(&SearchConfig::for_testing(), transport.clone())
}
