//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::CatalogConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, apply environment overrides, then validate.
pub fn load_config(path: &Path) -> Result<CatalogConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: CatalogConfig = toml::from_str(&content)?;
    finalize(config)
}

/// Defaults plus environment overrides, validated.
pub fn default_config() -> Result<CatalogConfig, ConfigError> {
    finalize(CatalogConfig::default())
}

fn finalize(mut config: CatalogConfig) -> Result<CatalogConfig, ConfigError> {
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// `CATALOG_BIND_ADDRESS` wins over `PORT`; `PORT` only replaces the port.
pub fn apply_env_overrides<F>(config: &mut CatalogConfig, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = var("CATALOG_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    } else if let Some(port) = var("PORT") {
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{host}:{port}");
    }

    if let Some(level) = var("CATALOG_LOG_LEVEL") {
        config.observability.log_level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_port_override_keeps_host() {
        let mut config = CatalogConfig::default();
        config.listener.bind_address = "127.0.0.1:4001".into();
        apply_env_overrides(&mut config, env(&[("PORT", "8080")]));
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
    }

    #[test]
    fn test_bind_address_override_wins() {
        let mut config = CatalogConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[("PORT", "8080"), ("CATALOG_BIND_ADDRESS", "127.0.0.1:9000"), ("CATALOG_LOG_LEVEL", "debug")]),
        );
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_load_reports_validation_errors() {
        let path = std::env::temp_dir().join(format!("catalog-config-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[breaker]\nfailure_threshold = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("breaker.failure_threshold"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/catalog.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
