//! Client resolution from configuration.
//!
//! # Responsibilities
//! - Map configured identifiers to client constructors
//! - Build a fresh client per submission from the current credential and relay
//! - Fail loudly on identifiers nothing is registered under
//!
//! # Design Decisions
//! - Explicit registry instead of loading implementations by name at runtime
//! - Constructors are cached; clients are not
//! - An unknown identifier is a configuration defect, never retried

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::client::mock::MockApiClient;
use crate::client::workflow::WorkflowApiClient;
use crate::client::ApiClient;
use crate::relay::streaming::StreamingRelay;

pub const MOCK_CLIENT: &str = "mock";
pub const WORKFLOW_CLIENT: &str = "workflow";

/// Everything a constructor gets to build a client.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub api_key: String,
    pub relay: StreamingRelay,
}

pub type ClientConstructor = Arc<dyn Fn(ClientContext) -> Box<dyn ApiClient> + Send + Sync>;

/// The configured client identifier is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unknown API client '{identifier}' (registered: {known})")]
    UnknownClient { identifier: String, known: String },
}

/// Registry of client implementations, keyed by identifier.
#[derive(Clone)]
pub struct ClientResolver {
    constructors: HashMap<String, ClientConstructor>,
}

impl ClientResolver {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry with the `mock` and `workflow` clients.
    pub fn builtin() -> Self {
        let mut resolver = Self::empty();
        resolver.register(MOCK_CLIENT, |ctx| Box::new(MockApiClient::new(ctx.api_key)));
        resolver.register(WORKFLOW_CLIENT, |ctx| {
            Box::new(WorkflowApiClient::new(ctx.api_key, ctx.relay))
        });
        resolver
    }

    /// Register a constructor, replacing any previous one for `identifier`.
    pub fn register<F>(&mut self, identifier: impl Into<String>, constructor: F)
    where
        F: Fn(ClientContext) -> Box<dyn ApiClient> + Send + Sync + 'static,
    {
        self.constructors.insert(identifier.into(), Arc::new(constructor));
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.constructors.contains_key(identifier)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.constructors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Build the client registered under `identifier`.
    pub fn resolve(
        &self,
        identifier: &str,
        context: ClientContext,
    ) -> Result<Box<dyn ApiClient>, ConfigurationError> {
        let constructor = self
            .constructors
            .get(identifier.trim())
            .ok_or_else(|| ConfigurationError::UnknownClient {
                identifier: identifier.to_string(),
                known: self.identifiers().join(", "),
            })?;
        Ok(constructor(context))
    }
}

impl Default for ClientResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for ClientResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientResolver")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}
