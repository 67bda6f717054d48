//! Workflow client: the field-data payload relayed for real.

use async_trait::async_trait;

use crate::client::field_data::{field_data_payload, WORKFLOW_ID};
use crate::client::types::{Payload, RelayResponse, RelayResult};
use crate::client::ApiClient;
use crate::relay::streaming::StreamingRelay;
use crate::submission::ValidatedSubmission;

/// Posts the field-data payload and the upload to the configured API URL.
///
/// The credential travels as the `api_key` form field, not as a header.
#[derive(Debug, Clone)]
pub struct WorkflowApiClient {
    api_key: String,
    workflow: u32,
    relay: StreamingRelay,
}

impl WorkflowApiClient {
    pub fn new(api_key: impl Into<String>, relay: StreamingRelay) -> Self {
        Self {
            api_key: api_key.into(),
            workflow: WORKFLOW_ID,
            relay,
        }
    }

    pub fn with_workflow(mut self, workflow: u32) -> Self {
        self.workflow = workflow;
        self
    }
}

#[async_trait]
impl ApiClient for WorkflowApiClient {
    fn prepare_data(&self, submission: &ValidatedSubmission) -> Payload {
        field_data_payload(&self.api_key, self.workflow, submission)
    }

    async fn send_data(&self, submission: ValidatedSubmission) -> RelayResult<RelayResponse> {
        let payload = self.prepare_data(&submission);
        tracing::info!(
            transaction_number = submission.transaction_number(),
            api_url = %self.relay.settings().api_url,
            workflow = self.workflow,
            "Relaying submission"
        );
        self.relay.send(payload, submission.into_file()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::streaming::RelaySettings;
    use crate::submission::{fields, validate, FileUpload, RawSubmission};

    #[test]
    fn test_custom_workflow_in_payload() {
        let relay = StreamingRelay::new(reqwest::Client::new(), RelaySettings::new("http://127.0.0.1:1/"));
        let client = WorkflowApiClient::new("k", relay).with_workflow(202);
        let submission = validate(
            RawSubmission::new()
                .with_field(fields::TRANS_NUM, "10827900900900")
                .with_field(fields::PORT_OF_ENTRY, "440")
                .with_field(fields::CCD_NUM, "1234567890")
                .with_file(FileUpload::from_bytes(&b"x"[..])),
        )
        .unwrap();

        let payload = client.prepare_data(&submission);
        assert_eq!(payload.get("workflow"), Some("202"));
        assert_eq!(payload.get("api_key"), Some("k"));
    }
}
