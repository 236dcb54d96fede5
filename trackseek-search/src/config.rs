//! Centralized configuration for Trackseek search.
//!
//! Tunable parameters live here instead of being scattered as literals
//! through the providers and the dispatcher.

/// Default ceiling on query length, in characters.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 1000;

/// Central configuration for search resolution.
///
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Emit a debug line per dispatch attempt
    pub debug: bool,
    /// Longest accepted query, in characters
    pub max_query_length: usize,
    /// Bandcamp provider settings
    pub bandcamp: BandcampConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debug: false,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            bandcamp: BandcampConfig::default(),
        }
    }
}

/// Bandcamp search endpoint configuration.
///
/// The autocomplete endpoint rejects browser and library default user
/// agents, so the Android app's agent string is sent instead.
#[derive(Debug, Clone)]
pub struct BandcampConfig {
    /// Scheme and host of the search API
    pub base_url: String,
    /// User agent accepted by the autocomplete endpoint
    pub user_agent: String,
    /// Keep at most this many tracks (None = everything returned)
    pub search_limit: Option<usize>,
}

impl Default for BandcampConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bandcamp.com".to_string(),
            user_agent: "android-async-http/1.4.1 (http://loopj.com/android-async-http)"
                .to_string(),
            search_limit: None,
        }
    }
}

impl SearchConfig {
    /// Creates configuration with environment variable overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(debug) = std::env::var("TRACKSEEK_DEBUG") {
            config.debug = parse_flag(&debug);
        }

        if let Ok(max_len) = std::env::var("TRACKSEEK_MAX_QUERY_LENGTH") {
            if let Ok(value) = max_len.parse::<usize>() {
                config.max_query_length = value;
            }
        }

        if let Ok(url) = std::env::var("TRACKSEEK_BANDCAMP_URL") {
            config.bandcamp.base_url = url;
        }

        if let Ok(limit) = std::env::var("TRACKSEEK_BANDCAMP_LIMIT") {
            if let Ok(value) = limit.parse::<usize>() {
                config.bandcamp.search_limit = Some(value);
            }
        }

        config
    }

    /// Creates a configuration for tests: debug reporting on, local endpoint.
    pub fn for_testing() -> Self {
        Self {
            debug: true,
            bandcamp: BandcampConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = SearchConfig::default();

        assert!(!config.debug);
        assert_eq!(config.max_query_length, 1000);
        assert_eq!(config.bandcamp.base_url, "https://bandcamp.com");
        assert!(config.bandcamp.user_agent.starts_with("android-async-http"));
        assert_eq!(config.bandcamp.search_limit, None);
    }

    #[test]
    fn test_testing_preset() {
        let config = SearchConfig::for_testing();

        assert!(config.debug);
        assert_eq!(config.max_query_length, DEFAULT_MAX_QUERY_LENGTH);
        assert_eq!(config.bandcamp.base_url, "http://127.0.0.1:9");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("on"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }
}
