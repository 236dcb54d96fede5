//! CLI command implementations

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Subcommand;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use trackseek_search::{
    LoadResult, RequestContext, ReqwestTransport, SearchConfig, SearchDispatcher,
};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Search one source
    Search {
        /// Source key or alias (e.g. bcsearch, bandcamp)
        source: String,
        /// Free-text query
        query: String,
        /// Requester identity attached to every track
        #[arg(long)]
        requester: Option<String>,
        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Resolve a `source:query` string, falling back to the default source
    Lookup {
        /// Prefixed query, e.g. "bcsearch:roygbiv"
        query: String,
        /// Requester identity attached to every track
        #[arg(long)]
        requester: Option<String>,
        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// List registered sources
    Sources,
}

/// Handle the CLI command
///
/// # Errors
/// Returns an error when the result cannot be printed; search failures are
/// printed as error envelopes, not returned.
pub async fn handle_command(command: Commands, debug: bool) -> anyhow::Result<()> {
    let mut config = SearchConfig::from_env();
    config.debug |= debug;
    let dispatcher = SearchDispatcher::with_defaults(&config, Arc::new(ReqwestTransport::new()));

    match command {
        Commands::Search {
            source,
            query,
            requester,
            timeout_secs,
        } => {
            let context = request_context(requester);
            let cancel = cancel_token(timeout_secs.map(Duration::from_secs));
            let result = dispatcher
                .resolve_cancellable(&source, &query, context, &cancel)
                .await;
            print_result(&result)
        }
        Commands::Lookup {
            query,
            requester,
            timeout_secs,
        } => {
            let context = request_context(requester);
            let cancel = cancel_token(timeout_secs.map(Duration::from_secs));
            let result = dispatcher
                .resolve_prefixed_cancellable(&query, context, &cancel)
                .await;
            print_result(&result)
        }
        Commands::Sources => {
            for source in dispatcher.sources() {
                println!("{source}");
            }
            Ok(())
        }
    }
}

fn request_context(requester: Option<String>) -> RequestContext {
    requester
        .map(|id| RequestContext::new(Value::String(id)))
        .unwrap_or_default()
}

/// Token cancelled on Ctrl-C or when `timeout` elapses.
fn cancel_token(timeout: Option<Duration>) -> CancellationToken {
    let token = CancellationToken::new();

    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    if let Some(timeout) = timeout {
        let on_timeout = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!("Search timed out after {:?}", timeout);
            on_timeout.cancel();
        });
    }

    token
}

fn print_result(result: &LoadResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(result).context("Failed to serialize load result")?;
    println!("{json}");
    Ok(())
}
