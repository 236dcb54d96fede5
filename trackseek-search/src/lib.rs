//! Trackseek Search - External search-source resolution

#![deny(missing_docs)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Turns a raw query aimed at a named source into a normalized, loadable
//! collection of unresolved tracks, or into a normalized failure. Every
//! outcome is reported as a [`LoadResult`]; nothing is raised to the caller.

pub mod config;
pub mod debug;
pub mod dispatcher;
pub mod errors;
pub mod normalizer;
pub mod providers;
pub mod tracing_setup;
pub mod transport;
pub mod types;
pub mod validator;

// Re-export main types
pub use config::{BandcampConfig, SearchConfig};
pub use debug::{DebugEvent, DebugReporter, DebugSink};
pub use dispatcher::{ResolveRequest, SearchDispatcher, SearchDispatcherBuilder};
pub use errors::{ErrorKind, ProviderError, SearchError};
pub use normalizer::normalize;
pub use providers::{BandcampProvider, RawSearchItem, SearchProvider};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{
    Exception, LoadKind, LoadResult, PlaylistInfo, RequestContext, Severity, UnresolvedTrack,
};
pub use validator::QueryRules;

/// Convenience type alias for Results with SearchError.
pub type Result<T> = std::result::Result<T, SearchError>;
