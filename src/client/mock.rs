//! Demonstration client.
//!
//! Builds the same payload a real workflow client would, then answers 200
//! without contacting anything. Useful for trying out the upload form and for
//! proving the client abstraction can be swapped through configuration.

use async_trait::async_trait;

use crate::client::field_data::{field_data_payload, WORKFLOW_ID};
use crate::client::types::{Payload, RelayResponse, RelayResult};
use crate::client::ApiClient;
use crate::submission::ValidatedSubmission;

#[derive(Debug, Clone)]
pub struct MockApiClient {
    api_key: String,
}

impl MockApiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    fn prepare_data(&self, submission: &ValidatedSubmission) -> Payload {
        field_data_payload(&self.api_key, WORKFLOW_ID, submission)
    }

    async fn send_data(&self, submission: ValidatedSubmission) -> RelayResult<RelayResponse> {
        let payload = self.prepare_data(&submission);
        tracing::debug!(
            transaction_number = submission.transaction_number(),
            fields = payload.len(),
            "Mock client accepted submission"
        );
        Ok(RelayResponse::new(200, "OK"))
    }
}
