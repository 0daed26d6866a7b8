//! Runtime configuration gathered from the environment and command-line overrides.
//!
//! Values are read after `.env` has been loaded, so a project-local `.env` works the
//! same as exported variables:
//!
//! - `NCLI_URL`: base URL of nagios-api (required unless `--url` is given)
//! - `NCLI_AUTHOR`: author recorded on acknowledgements and downtime (default `$USER`)
//! - `NCLI_CACHE_TTL`: cache lifetime, e.g. `60`, `5m` (default 60 seconds)
//! - `NCLI_CACHE_PATH`: location of the status cache file

use crate::cache::StatusCache;
use crate::cli::parse_duration;
use crate::error::{AppError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
const DEFAULT_AUTHOR: &str = "ncli";

/// Settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url: String,
    pub author: String,
    pub cache_ttl: Duration,
    pub cache_path: PathBuf,
}

impl Config {
    /// Loads configuration from the process environment. `url` and `cache_ttl`
    /// take precedence over their environment counterparts when given.
    pub fn load(url: Option<&str>, cache_ttl: Option<Duration>) -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok(), url, cache_ttl)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        url: Option<&str>,
        cache_ttl: Option<Duration>,
    ) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = match url.map(str::to_string).or_else(|| get("NCLI_URL")) {
            Some(url) => url,
            None => {
                error!("NCLI_URL environment variable not set and no --url given");
                return Err(AppError::Config(
                    "no nagios-api URL configured (set NCLI_URL or pass --url)".to_string(),
                ));
            },
        };

        let author = get("NCLI_AUTHOR")
            .or_else(|| get("USER"))
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        let cache_ttl = match cache_ttl {
            Some(ttl) => ttl,
            None => match get("NCLI_CACHE_TTL") {
                Some(raw) => parse_duration(&raw).map_err(|e| {
                    AppError::Config(format!("invalid NCLI_CACHE_TTL '{}': {}", raw, e))
                })?,
                None => DEFAULT_CACHE_TTL,
            },
        };

        let cache_path = get("NCLI_CACHE_PATH")
            .map(PathBuf::from)
            .or_else(StatusCache::default_path)
            .unwrap_or_else(|| env::temp_dir().join("ncli").join("status.json"));

        let config = Self {
            url,
            author,
            cache_ttl,
            cache_path,
        };
        debug!("Loaded config: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_environment_values_are_used() {
        let lookup = lookup_from(&[
            ("NCLI_URL", "http://nagios:6315"),
            ("NCLI_AUTHOR", "alice"),
            ("NCLI_CACHE_TTL", "5m"),
            ("NCLI_CACHE_PATH", "/tmp/ncli-status.json"),
        ]);

        let config = Config::from_lookup(lookup, None, None).unwrap();

        assert_eq!(config.url, "http://nagios:6315");
        assert_eq!(config.author, "alice");
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_path, PathBuf::from("/tmp/ncli-status.json"));
    }

    #[test]
    fn test_overrides_win_over_environment() {
        let lookup = lookup_from(&[("NCLI_URL", "http://env"), ("NCLI_CACHE_TTL", "5m")]);

        let config =
            Config::from_lookup(lookup, Some("http://flag"), Some(Duration::from_secs(1))).unwrap();

        assert_eq!(config.url, "http://flag");
        assert_eq!(config.cache_ttl, Duration::from_secs(1));
    }

    #[test]
    fn test_defaults() {
        let lookup = lookup_from(&[("NCLI_URL", "http://nagios"), ("USER", "bob")]);

        let config = Config::from_lookup(lookup, None, None).unwrap();

        assert_eq!(config.author, "bob");
        assert_eq!(config.cache_ttl, DEFAULT_CACHE_TTL);
    }

    #[test]
    fn test_missing_url_is_config_error() {
        let result = Config::from_lookup(lookup_from(&[("NCLI_URL", "  ")]), None, None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_invalid_ttl_is_config_error() {
        let lookup = lookup_from(&[("NCLI_URL", "http://nagios"), ("NCLI_CACHE_TTL", "soon")]);
        let result = Config::from_lookup(lookup, None, None);
        match result {
            Err(AppError::Config(msg)) => assert!(msg.contains("NCLI_CACHE_TTL")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_load_reads_process_environment() {
        env::set_var("NCLI_URL", "http://from-env:6315");
        env::set_var("NCLI_AUTHOR", "carol");

        let config = Config::load(None, None).unwrap();

        env::remove_var("NCLI_URL");
        env::remove_var("NCLI_AUTHOR");

        assert_eq!(config.url, "http://from-env:6315");
        assert_eq!(config.author, "carol");
    }
}
