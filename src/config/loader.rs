//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `upstream.api_key`.
pub const API_KEY_ENV: &str = "API_KEY";

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

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content, std::env::var(API_KEY_ENV).ok())
}

/// Built-in defaults with the environment override applied, for running without a file.
pub fn default_config() -> Result<RelayConfig, ConfigError> {
    let mut config = RelayConfig::default();
    apply_api_key(&mut config, std::env::var(API_KEY_ENV).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse TOML content, apply the credential override and validate.
pub fn parse_config(content: &str, api_key: Option<String>) -> Result<RelayConfig, ConfigError> {
    let mut config: RelayConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    apply_api_key(&mut config, api_key);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn apply_api_key(config: &mut RelayConfig, api_key: Option<String>) {
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        config.upstream.api_key = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [listener]
        bind_address = "127.0.0.1:9000"

        [upstream]
        api_url = "https://customs.example.com/upload"
        api_key = "from-file"
        api_client = "workflow"
        chunk_size = 8192
    "#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE, None).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.upstream.api_key, "from-file");
        assert_eq!(config.upstream.chunk_size, 8192);
    }

    #[test]
    fn test_env_key_overrides_file() {
        let config = parse_config(SAMPLE, Some("from-env".into())).unwrap();
        assert_eq!(config.upstream.api_key, "from-env");

        let config = parse_config(SAMPLE, Some(String::new())).unwrap();
        assert_eq!(config.upstream.api_key, "from-file");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[upstream]\nchunk_size = 1\n", None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("upstream.chunk_size"));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = parse_config("[upstream\n", None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.upstream.api_client, "workflow");

        let missing = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
