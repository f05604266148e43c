//! Gateway configuration loading.
//!
//! Order of precedence: defaults, then the JSON file, then `SWITCHYARD_*`
//! environment variables. The result is validated once at startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use validator::Validate;

use switchyard_types::models::LimitSpec;
use switchyard_types::{ConfigError, GatewayConfig};

use crate::error::AppResult;

pub const ENV_HOST: &str = "SWITCHYARD_HOST";
pub const ENV_PORT: &str = "SWITCHYARD_PORT";
pub const ENV_CACHE_TTL: &str = "SWITCHYARD_CACHE_TTL";
pub const ENV_RATE_LIMIT_PER_MINUTE: &str = "SWITCHYARD_RATE_LIMIT_PER_MINUTE";
pub const ENV_RATE_LIMIT_BURST: &str = "SWITCHYARD_RATE_LIMIT_BURST";
pub const ENV_LOG_LEVEL: &str = "SWITCHYARD_LOG_LEVEL";
pub const ENV_KEYS_FILE: &str = "SWITCHYARD_KEYS_FILE";

/// Load configuration from `path` (a missing file yields defaults), apply
/// environment overrides and validate.
pub fn load_config(path: Option<&Path>) -> AppResult<GatewayConfig> {
    load_config_with_env(path, |name| std::env::var(name).ok())
}

pub fn load_config_with_env<F>(path: Option<&Path>, env: F) -> AppResult<GatewayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) if path.exists() => {
            let content = fs::read_to_string(path)?;
            if content.trim().is_empty() {
                GatewayConfig::default()
            } else {
                serde_json::from_str(&content)
                    .map_err(|e| ConfigError::ParseError { message: format!("{}: {}", path.display(), e) })?
            }
        },
        Some(path) => {
            tracing::info!("Config file {} not found, using defaults", path.display());
            GatewayConfig::default()
        },
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, env)?;
    validate_config(&config)?;
    Ok(config)
}

fn parse_env<T, F>(env: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnv { name: name.to_string(), message: e.to_string() }),
        None => Ok(None),
    }
}

pub fn apply_env_overrides<F>(config: &mut GatewayConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = parse_env::<String, _>(&env, ENV_HOST)? {
        config.server.host = host;
    }
    if let Some(port) = parse_env::<u16, _>(&env, ENV_PORT)? {
        config.server.port = port;
    }
    if let Some(ttl) = parse_env::<u64, _>(&env, ENV_CACHE_TTL)? {
        config.cache.ttl_secs = ttl;
    }

    // Client and model default buckets move together
    let per_minute = parse_env::<u32, _>(&env, ENV_RATE_LIMIT_PER_MINUTE)?;
    let burst = parse_env::<u32, _>(&env, ENV_RATE_LIMIT_BURST)?;
    if per_minute.is_some() || burst.is_some() {
        for spec in [&mut config.rate_limits.client, &mut config.rate_limits.model] {
            let rpm = per_minute.unwrap_or_else(|| (spec.refill_per_second * 60.0).round() as u32);
            *spec = LimitSpec::per_minute(rpm, burst.unwrap_or(spec.capacity));
        }
    }

    if let Some(level) = parse_env::<String, _>(&env, ENV_LOG_LEVEL)? {
        config.logging.level = level;
    }
    if let Some(path) = parse_env::<PathBuf, _>(&env, ENV_KEYS_FILE)? {
        config.keys.store_path = Some(path);
    }
    Ok(())
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), ConfigError> {
    config.validate().map_err(|errors| {
        let field = errors.errors().keys().next().map(|k| k.to_string()).unwrap_or_else(|| "config".to_string());
        ConfigError::ValidationError { field, message: errors.to_string() }
    })
}

/// Write the configuration as pretty JSON via a temp file and rename.
pub fn save_config(config: &GatewayConfig, path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;

    // Atomic write
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_no_file_yields_defaults() {
        let config = load_config_with_env(None, env_from(&[])).unwrap();
        assert_eq!(config, GatewayConfig::default());

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let config = load_config_with_env(Some(&missing), env_from(&[])).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_file_then_env_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchyard.json");
        fs::write(&path, r#"{"server": {"port": 9000, "host": "0.0.0.0"}, "cache": {"ttl_secs": 10}}"#).unwrap();

        let config = load_config_with_env(
            Some(&path),
            env_from(&[(ENV_PORT, "9100"), (ENV_KEYS_FILE, "/tmp/keys.json")]),
        )
        .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.cache.ttl_secs, 10);
        assert_eq!(config.keys.store_path, Some(PathBuf::from("/tmp/keys.json")));
    }

    #[test]
    fn test_rate_limit_env_overrides_both_defaults() {
        let config = load_config_with_env(
            None,
            env_from(&[(ENV_RATE_LIMIT_PER_MINUTE, "120"), (ENV_RATE_LIMIT_BURST, "20")]),
        )
        .unwrap();

        for spec in [config.rate_limits.client, config.rate_limits.model] {
            assert_eq!(spec.capacity, 20);
            assert!((spec.refill_per_second - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bad_env_value_is_reported() {
        let err = load_config_with_env(None, env_from(&[(ENV_PORT, "eighty")])).unwrap_err();
        match err {
            AppError::Config(ConfigError::InvalidEnv { name, .. }) => assert_eq!(name, ENV_PORT),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchyard.json");
        fs::write(&path, r#"{"cache": {"ttl_secs": 0}}"#).unwrap();

        let err = load_config_with_env(Some(&path), env_from(&[])).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchyard.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config_with_env(Some(&path), env_from(&[])).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("switchyard.json");

        let mut config = GatewayConfig::default();
        config.server.port = 7000;
        config.normalizer.default_system_message = Some("Be concise.".to_string());
        save_config(&config, &path).unwrap();

        let loaded = load_config_with_env(Some(&path), env_from(&[])).unwrap();
        assert_eq!(loaded, config);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
