//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Build the downstream HTTP client and relay orchestrator
//! - Check the configured API client resolves before accepting traffic
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::client::{ClientResolver, ConfigurationError};
use crate::config::loader::{default_config, load_config, ConfigError};
use crate::config::RelayConfig;
use crate::relay::RelayOrchestrator;

/// Anything that stops the relay from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API client check failed: {0}")]
    Client(#[from] ConfigurationError),

    #[error("failed to build downstream HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Load from `path`, or fall back to defaults when no file is given.
pub fn load_configuration(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => default_config(),
    }
}

/// Build the orchestrator and make sure the configured client exists.
pub fn build_orchestrator(
    config: &RelayConfig,
    resolver: ClientResolver,
) -> Result<RelayOrchestrator, StartupError> {
    let http = RelayOrchestrator::build_http_client(&config.timeouts)?;
    let orchestrator = RelayOrchestrator::new(resolver, http);

    orchestrator.resolve(config)?;
    tracing::info!(
        api_client = %config.upstream.api_client,
        registered = ?orchestrator.resolver().identifiers(),
        "API client resolved"
    );

    Ok(orchestrator)
}

pub async fn bind(config: &RelayConfig) -> Result<TcpListener, StartupError> {
    let address = config.listener.bind_address.clone();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_client_fails_startup() {
        let mut config = RelayConfig::default();
        config.upstream.api_client = "missing".into();

        let err = build_orchestrator(&config, ClientResolver::builtin()).unwrap_err();
        assert!(matches!(err, StartupError::Client(_)));
    }

    #[test]
    fn test_builtin_clients_pass_startup() {
        let mut config = RelayConfig::default();
        for id in ["mock", "workflow"] {
            config.upstream.api_client = id.into();
            assert!(build_orchestrator(&config, ClientResolver::builtin()).is_ok());
        }
    }

    #[tokio::test]
    async fn test_bind_error_names_address() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();

        let mut config = RelayConfig::default();
        config.listener.bind_address = address.clone();
        let err = bind(&config).await.unwrap_err();
        assert!(err.to_string().contains(&address));
    }
}
