//! API client subsystem.
//!
//! # Data Flow
//! ```text
//! RelayConfig (api_client, api_key)
//!     → registry.rs (identifier → constructor)
//!     → Box<dyn ApiClient>
//!     → prepare_data (submission → Payload)
//!     → send_data (Payload + file → StreamingRelay → RelayResponse)
//! ```
//!
//! # Design Decisions
//! - `send_data` takes the submission by value: the file is read once
//! - `send_data` owns the full request lifecycle, including `prepare_data`
//! - Clients are built per submission so config reloads apply immediately

pub mod field_data;
pub mod mock;
pub mod registry;
pub mod types;
pub mod workflow;

use async_trait::async_trait;

use crate::submission::ValidatedSubmission;

pub use mock::MockApiClient;
pub use registry::{ClientContext, ClientResolver, ConfigurationError};
pub use types::{Payload, RelayError, RelayResponse, RelayResult};
pub use workflow::WorkflowApiClient;

/// A downstream API the relay can hand submissions to.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Turn a validated submission into the downstream's form fields.
    fn prepare_data(&self, submission: &ValidatedSubmission) -> Payload;

    /// Prepare and transfer the submission, file included.
    async fn send_data(&self, submission: ValidatedSubmission) -> RelayResult<RelayResponse>;
}
