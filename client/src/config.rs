//! Configuration management for the client.

use crate::sync::OverlapPolicy;
use feedsync_engine::MergePolicy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Snapshot endpoint of the remote record store
    pub feed_url: String,
    /// Bearer token; when present the session is considered established at startup
    pub feed_token: Option<String>,
    /// Period of the automatic refresh trigger, `None` when disabled
    pub refresh_interval: Option<Duration>,
    /// Timeout for a single feed request
    pub request_timeout: Duration,
    /// How fetched snapshots are merged into the view
    pub merge_policy: MergePolicy,
    /// What to do with a trigger that arrives during a refresh
    pub overlap_policy: OverlapPolicy,
    /// Where the view is cached between runs
    pub view_cache_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let feed_url = lookup("FEED_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingFeedUrl)?;

        let feed_token = lookup("FEED_TOKEN").filter(|token| !token.is_empty());

        let refresh_secs: u64 = lookup("REFRESH_INTERVAL_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidRefreshInterval)?;
        let refresh_interval = (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs));

        let timeout_secs: u64 = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidRequestTimeout)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout);
        }

        let merge_policy = match lookup("MERGE_POLICY").as_deref() {
            None | Some("watermark") => MergePolicy::Watermark,
            Some("identity") => MergePolicy::Identity,
            Some(other) => return Err(ConfigError::InvalidMergePolicy(other.to_string())),
        };

        let overlap_policy = match lookup("OVERLAP_POLICY").as_deref() {
            None | Some("queue") => OverlapPolicy::Queue,
            Some("coalesce") => OverlapPolicy::Coalesce,
            Some(other) => return Err(ConfigError::InvalidOverlapPolicy(other.to_string())),
        };

        let view_cache_path = lookup("VIEW_CACHE_PATH")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            feed_url,
            feed_token,
            refresh_interval,
            request_timeout: Duration::from_secs(timeout_secs),
            merge_policy,
            overlap_policy,
            view_cache_path,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FEED_URL environment variable is required")]
    MissingFeedUrl,

    #[error("Invalid REFRESH_INTERVAL_SECS value")]
    InvalidRefreshInterval,

    #[error("Invalid REQUEST_TIMEOUT_SECS value")]
    InvalidRequestTimeout,

    #[error("Invalid MERGE_POLICY value: {0} (expected watermark or identity)")]
    InvalidMergePolicy(String),

    #[error("Invalid OVERLAP_POLICY value: {0} (expected queue or coalesce)")]
    InvalidOverlapPolicy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[("FEED_URL", "http://localhost:3000/feed")]).unwrap();

        assert_eq!(config.feed_url, "http://localhost:3000/feed");
        assert_eq!(config.feed_token, None);
        assert_eq!(config.refresh_interval, Some(Duration::from_secs(30)));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.merge_policy, MergePolicy::Watermark);
        assert_eq!(config.overlap_policy, OverlapPolicy::Queue);
        assert_eq!(config.view_cache_path, None);
    }

    #[test]
    fn all_values() {
        let config = config_from(&[
            ("FEED_URL", "https://photos.example/feed"),
            ("FEED_TOKEN", "secret"),
            ("REFRESH_INTERVAL_SECS", "0"),
            ("REQUEST_TIMEOUT_SECS", "3"),
            ("MERGE_POLICY", "identity"),
            ("OVERLAP_POLICY", "coalesce"),
            ("VIEW_CACHE_PATH", "/tmp/feed.json"),
        ])
        .unwrap();

        assert_eq!(config.feed_token.as_deref(), Some("secret"));
        assert_eq!(config.refresh_interval, None);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.merge_policy, MergePolicy::Identity);
        assert_eq!(config.overlap_policy, OverlapPolicy::Coalesce);
        assert_eq!(config.view_cache_path, Some(PathBuf::from("/tmp/feed.json")));
    }

    #[test]
    fn missing_feed_url() {
        assert!(matches!(config_from(&[]), Err(ConfigError::MissingFeedUrl)));
        assert!(matches!(
            config_from(&[("FEED_URL", "  ")]),
            Err(ConfigError::MissingFeedUrl)
        ));
    }

    #[test]
    fn invalid_values() {
        let url = ("FEED_URL", "http://localhost/feed");

        assert!(matches!(
            config_from(&[url, ("REFRESH_INTERVAL_SECS", "soon")]),
            Err(ConfigError::InvalidRefreshInterval)
        ));
        assert!(matches!(
            config_from(&[url, ("REQUEST_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidRequestTimeout)
        ));
        assert!(matches!(
            config_from(&[url, ("MERGE_POLICY", "newest")]),
            Err(ConfigError::InvalidMergePolicy(v)) if v == "newest"
        ));
        assert!(matches!(
            config_from(&[url, ("OVERLAP_POLICY", "race")]),
            Err(ConfigError::InvalidOverlapPolicy(v)) if v == "race"
        ));
    }
}
