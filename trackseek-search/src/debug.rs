//! Opt-in reporting of dispatch attempts.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::types::LoadKind;

/// Something the dispatcher did that is worth a debug line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    /// About to call a provider.
    Dispatch {
        /// Canonical key of the source being called
        source_key: String,
        /// Query handed to the provider
        query: String,
    },
    /// A resolution finished.
    Outcome {
        /// Key as the caller supplied it
        source_key: String,
        /// Kind of envelope produced
        load_type: LoadKind,
        /// Number of tracks in the envelope
        track_count: usize,
    },
}

impl fmt::Display for DebugEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugEvent::Dispatch { source_key, query } => {
                write!(f, "dispatching search to '{source_key}' with query {query:?}")
            }
            DebugEvent::Outcome {
                source_key,
                load_type,
                track_count,
            } => write!(
                f,
                "search on '{source_key}' finished as {load_type:?} with {track_count} tracks"
            ),
        }
    }
}

/// Destination for debug lines.
pub trait DebugSink: Send + Sync + fmt::Debug {
    /// Record one event. Must not panic.
    fn emit(&self, event: &DebugEvent);
}

/// Sink writing to `tracing` at DEBUG level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn emit(&self, event: &DebugEvent) {
        debug!(target: "trackseek::dispatch", "{event}");
    }
}

/// Reports dispatch events when enabled; does nothing otherwise.
#[derive(Debug, Clone)]
pub struct DebugReporter {
    sink: Option<Arc<dyn DebugSink>>,
}

impl DebugReporter {
    /// Reporter writing to `tracing` when `enabled`.
    pub fn new(enabled: bool) -> Self {
        if enabled {
            Self::with_sink(Arc::new(TracingSink))
        } else {
            Self::disabled()
        }
    }

    /// Reporter that drops every event.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Enabled reporter writing to `sink`.
    pub fn with_sink(sink: Arc<dyn DebugSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// True when events reach a sink.
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Forward `event` to the sink, if any. A panicking sink is contained.
    pub fn report(&self, event: DebugEvent) {
        if let Some(sink) = &self.sink {
            if catch_unwind(AssertUnwindSafe(|| sink.emit(&event))).is_err() {
                warn!("Debug sink panicked while reporting: {event}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl DebugSink for Recorder {
        fn emit(&self, event: &DebugEvent) {
            self.0.lock().push(event.to_string());
        }
    }

    fn dispatch_event() -> DebugEvent {
        DebugEvent::Dispatch {
            source_key: "bcsearch".to_string(),
            query: "roygbiv".to_string(),
        }
    }

    #[test]
    fn test_enabled_reporter_emits_one_line() {
        let recorder = Arc::new(Recorder::default());
        let reporter = DebugReporter::with_sink(recorder.clone());

        reporter.report(dispatch_event());

        let lines = recorder.0.lock();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            "dispatching search to 'bcsearch' with query \"roygbiv\""
        );
    }

    #[test]
    fn test_disabled_reporter_is_noop() {
        let reporter = DebugReporter::new(false);

        assert!(!reporter.is_enabled());
        reporter.report(dispatch_event());
    }

    #[derive(Debug)]
    struct Exploding;

    impl DebugSink for Exploding {
        fn emit(&self, _event: &DebugEvent) {
            panic!("sink is broken");
        }
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        let reporter = DebugReporter::with_sink(Arc::new(Exploding));

        reporter.report(dispatch_event());
        assert!(reporter.is_enabled());
    }

    #[test]
    fn test_outcome_line() {
        let event = DebugEvent::Outcome {
            source_key: "bcsearch".to_string(),
            load_type: LoadKind::Empty,
            track_count: 0,
        };

        assert_eq!(
            event.to_string(),
            "search on 'bcsearch' finished as Empty with 0 tracks"
        );
    }
}
