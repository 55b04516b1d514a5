//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables that override file values.
pub const ENV_ENDPOINT: &str = "MEMEVOTE_ENDPOINT";
pub const ENV_CONTRACT_ADDRESS: &str = "MEMEVOTE_CONTRACT_ADDRESS";
pub const ENV_SIGNER_URL: &str = "MEMEVOTE_SIGNER_URL";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load a TOML file, apply environment overrides, and validate.
///
/// A missing file is not an error when `path` is `None`: defaults plus
/// environment are used.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => ClientConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(
        endpoint = %config.chain.endpoint,
        contract = %config.contract.address,
        signer = ?config.signer.provider_url,
        "Configuration loaded"
    );
    Ok(config)
}

/// Override file values from `lookup` (the process environment in production).
pub fn apply_env_overrides(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(endpoint) = lookup(ENV_ENDPOINT) {
        config.chain.endpoint = endpoint;
    }
    if let Some(address) = lookup(ENV_CONTRACT_ADDRESS) {
        config.contract.address = address;
    }
    if let Some(url) = lookup(ENV_SIGNER_URL) {
        config.signer.provider_url = Some(url).filter(|u| !u.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [chain]
            endpoint = "wss://rpc.example.org"

            [contract]
            address = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty"

            [feed]
            top_count = 5
            "#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.feed.top_count, 5);
        assert_eq!(config.feed.page_limit, 100);
    }

    #[test]
    fn test_invalid_file_reports_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[feed]\npage_limit = 0").unwrap();

        match load_config(Some(file.path())) {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.field == "feed.page_limit"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ClientConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            ENV_ENDPOINT => Some("ws://node:9944".to_string()),
            ENV_CONTRACT_ADDRESS => Some("5Contract".to_string()),
            ENV_SIGNER_URL => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.chain.endpoint, "ws://node:9944");
        assert_eq!(config.contract.address, "5Contract");
        assert!(config.signer.provider_url.is_none());
    }
}
