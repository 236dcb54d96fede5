//! Mock provider implementation for testing.

#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use serde_json::{Map, Value};

#[cfg(test)]
use super::{RawSearchItem, SearchProvider};
#[cfg(test)]
use crate::errors::ProviderError;
#[cfg(test)]
use crate::validator::QueryRules;

/// What a [`MockProvider`] does when searched.
#[cfg(test)]
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return these items.
    Items(Vec<RawSearchItem>),
    /// Fail with a network error carrying this reason.
    NetworkFailure(String),
    /// Panic inside the search future.
    Panic,
    /// Never settle.
    Pending,
}

/// Scripted provider that counts its calls.
#[cfg(test)]
#[derive(Debug)]
pub struct MockProvider {
    behavior: MockBehavior,
    rules: QueryRules,
    plugin_info: Map<String, Value>,
    panic_in_plugin_info: bool,
    calls: AtomicUsize,
}

#[cfg(test)]
impl MockProvider {
    /// Creates a mock with the given behavior and default query rules.
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            rules: QueryRules::default(),
            plugin_info: Map::new(),
            panic_in_plugin_info: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Mock returning `items`.
    pub fn returning(items: Vec<RawSearchItem>) -> Self {
        Self::new(MockBehavior::Items(items))
    }

    /// Replace the query rules.
    pub fn with_rules(mut self, rules: QueryRules) -> Self {
        self.rules = rules;
        self
    }

    /// Report this metadata in `pluginInfo`.
    pub fn with_plugin_info(mut self, plugin_info: Map<String, Value>) -> Self {
        self.plugin_info = plugin_info;
        self
    }

    /// Panic when asked for `pluginInfo`.
    pub fn with_panicking_plugin_info(mut self) -> Self {
        self.panic_in_plugin_info = true;
        self
    }

    /// Number of times `search` was entered.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SearchProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn query_rules(&self) -> QueryRules {
        self.rules.clone()
    }

    fn plugin_info(&self) -> Map<String, Value> {
        if self.panic_in_plugin_info {
            panic!("mock plugin info exploded");
        }
        self.plugin_info.clone()
    }

    async fn search(&self, _query: &str) -> Result<Vec<RawSearchItem>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Items(items) => Ok(items.clone()),
            MockBehavior::NetworkFailure(reason) => Err(ProviderError::Network {
                reason: reason.clone(),
            }),
            MockBehavior::Panic => panic!("mock provider exploded"),
            MockBehavior::Pending => std::future::pending().await,
        }
    }
}
