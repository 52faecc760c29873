use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::FartMapError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Shared secrets
    pub api_secret: String,
    pub admin_key: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Storage
    pub events_path: PathBuf,

    // Hot zones
    pub hot_zone_threshold: f64,
    pub hot_zone_min_size: usize,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, FartMapError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FartMapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            api_secret: required(&lookup, "API_SECRET")?,
            admin_key: required(&lookup, "ADMIN_KEY")?,
            web_host: lookup("WEB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port: parsed(&lookup, "WEB_PORT", 3000)?,
            events_path: lookup("EVENTS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp/farts.json")),
            hot_zone_threshold: parsed(&lookup, "HOT_ZONE_THRESHOLD", 0.01)?,
            hot_zone_min_size: parsed(&lookup, "HOT_ZONE_MIN_SIZE", 3)?,
        };

        if config.api_secret == config.admin_key {
            return Err(FartMapError::Config(
                "ADMIN_KEY must differ from API_SECRET".to_string(),
            ));
        }
        if !(config.hot_zone_threshold.is_finite() && config.hot_zone_threshold > 0.0) {
            return Err(FartMapError::Config(
                "HOT_ZONE_THRESHOLD must be a positive number of degrees".to_string(),
            ));
        }
        if config.hot_zone_min_size == 0 {
            return Err(FartMapError::Config(
                "HOT_ZONE_MIN_SIZE must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, FartMapError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| FartMapError::Config(format!("{key} environment variable is required")))
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T, FartMapError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| FartMapError::Config(format!("{key} has an invalid value: {raw:?}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config =
            Config::from_lookup(lookup(&[("API_SECRET", "s3cret"), ("ADMIN_KEY", "adm1n")])).unwrap();
        assert_eq!(config.web_host, "0.0.0.0");
        assert_eq!(config.web_port, 3000);
        assert_eq!(config.events_path, PathBuf::from("/tmp/farts.json"));
        assert_eq!(config.hot_zone_threshold, 0.01);
        assert_eq!(config.hot_zone_min_size, 3);
    }

    #[test]
    fn secrets_are_required() {
        assert!(Config::from_lookup(lookup(&[("ADMIN_KEY", "adm1n")])).is_err());
        assert!(Config::from_lookup(lookup(&[("API_SECRET", "s3cret"), ("ADMIN_KEY", " ")])).is_err());
    }

    #[test]
    fn secrets_must_differ() {
        assert!(Config::from_lookup(lookup(&[("API_SECRET", "same"), ("ADMIN_KEY", "same")])).is_err());
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let vars = [("API_SECRET", "a"), ("ADMIN_KEY", "b"), ("WEB_PORT", "http")];
        assert!(Config::from_lookup(lookup(&vars)).is_err());
        let vars = [("API_SECRET", "a"), ("ADMIN_KEY", "b"), ("HOT_ZONE_THRESHOLD", "-1")];
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }
}
