//! Submission pipeline: validate → resolve client → send → interpret.
//!
//! ```text
//! Received → Validating ─┬─ Validated → Sending ─┬─ Completed
//!                        │                       └─ TransportFailure
//!                        └─ Rejected(errors)
//! ```
//!
//! Each submission runs once through this pipeline; nothing is retried or
//! queued.

use std::time::Instant;

use crate::client::{ClientContext, ClientResolver, ConfigurationError, RelayError, RelayResponse};
use crate::client::ApiClient;
use crate::config::{RelayConfig, TimeoutConfig};
use crate::observability::metrics;
use crate::relay::streaming::{RelaySettings, StreamingRelay};
use crate::submission::{validate, FieldErrors, RawSubmission};

/// How a single relay attempt ended.
#[derive(Debug)]
pub enum RelayOutcome {
    /// The downstream API accepted the submission.
    Completed {
        transaction_number: u64,
        response: RelayResponse,
    },
    /// One or more fields failed validation; nothing was sent.
    Rejected(FieldErrors),
    /// The downstream call failed or answered with a non-success status.
    TransportFailure(RelayError),
}

impl RelayOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RelayOutcome::Completed { .. } => "completed",
            RelayOutcome::Rejected(_) => "rejected",
            RelayOutcome::TransportFailure(_) => "transport_failure",
        }
    }
}

/// Drives submissions through validation and the configured client.
#[derive(Debug, Clone)]
pub struct RelayOrchestrator {
    resolver: ClientResolver,
    http: reqwest::Client,
}

impl RelayOrchestrator {
    pub fn new(resolver: ClientResolver, http: reqwest::Client) -> Self {
        Self { resolver, http }
    }

    /// Shared downstream HTTP client. Per-request timeouts come from the
    /// current config; the connect timeout is fixed when this is built.
    pub fn build_http_client(timeouts: &TimeoutConfig) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(timeouts.connect())
            .build()
    }

    pub fn resolver(&self) -> &ClientResolver {
        &self.resolver
    }

    /// Build the client the given configuration names.
    pub fn resolve(&self, config: &RelayConfig) -> Result<Box<dyn ApiClient>, ConfigurationError> {
        let context = ClientContext {
            api_key: config.upstream.api_key.clone(),
            relay: StreamingRelay::new(self.http.clone(), RelaySettings::from_config(config)),
        };
        self.resolver.resolve(&config.upstream.api_client, context)
    }

    /// Run one submission to completion.
    ///
    /// Validation always finishes before a client is resolved, so a rejected
    /// submission never reaches the network. A configuration error is
    /// returned as `Err` rather than folded into an outcome.
    pub async fn relay(
        &self,
        config: &RelayConfig,
        raw: RawSubmission,
    ) -> Result<RelayOutcome, ConfigurationError> {
        let start = Instant::now();

        let submission = match validate(raw) {
            Ok(submission) => submission,
            Err(errors) => {
                tracing::info!(errors = %errors, "Submission rejected");
                let outcome = RelayOutcome::Rejected(errors);
                metrics::record_relay(outcome.label(), start);
                return Ok(outcome);
            }
        };
        let transaction_number = submission.transaction_number();

        let client = match self.resolve(config) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "API client could not be resolved");
                metrics::record_relay("configuration_error", start);
                return Err(e);
            }
        };

        let outcome = match client.send_data(submission).await {
            Ok(response) if response.is_success() => RelayOutcome::Completed {
                transaction_number,
                response,
            },
            Ok(response) => RelayOutcome::TransportFailure(RelayError::UpstreamStatus {
                status: response.status_code,
                body: response.body,
            }),
            Err(e) => RelayOutcome::TransportFailure(e),
        };

        match &outcome {
            RelayOutcome::Completed { response, .. } => tracing::info!(
                transaction_number,
                api_client = %config.upstream.api_client,
                status = response.status_code,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Submission relayed"
            ),
            RelayOutcome::TransportFailure(e) => tracing::warn!(
                transaction_number,
                api_client = %config.upstream.api_client,
                error = %e,
                "Submission relay failed"
            ),
            RelayOutcome::Rejected(_) => {}
        }
        metrics::record_relay(outcome.label(), start);

        Ok(outcome)
    }
}

impl Default for RelayOrchestrator {
    fn default() -> Self {
        Self::new(ClientResolver::builtin(), reqwest::Client::new())
    }
}
