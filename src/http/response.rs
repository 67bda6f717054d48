//! Outcome rendering.
//!
//! # Responsibilities
//! - Map a RelayOutcome to the HTTP response the submitter sees
//! - Keep downstream detail out of client-facing bodies
//!
//! # Design Decisions
//! - Rejections are 400 with a field → errors map, so forms can re-render
//! - Downstream failures are 502; the cause is logged, not returned
//! - A misconfigured client is 500

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::client::ConfigurationError;
use crate::relay::RelayOutcome;

pub const TRANSPORT_FAILURE_DETAIL: &str = "Upload to the downstream API failed.";
pub const CONFIGURATION_ERROR_DETAIL: &str = "The upload relay is misconfigured.";

pub fn success_message(transaction_number: u64) -> String {
    format!("Success! {} uploaded.", transaction_number)
}

pub fn outcome_response(outcome: RelayOutcome) -> Response {
    match outcome {
        RelayOutcome::Completed {
            transaction_number, ..
        } => (StatusCode::OK, success_message(transaction_number)).into_response(),
        RelayOutcome::Rejected(errors) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
        }
        RelayOutcome::TransportFailure(_) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "errors": {}, "detail": TRANSPORT_FAILURE_DETAIL })),
        )
            .into_response(),
    }
}

pub fn configuration_error_response(_error: &ConfigurationError) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, CONFIGURATION_ERROR_DETAIL).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{RelayError, RelayResponse};
    use crate::submission::{validate, RawSubmission};

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_completed_is_success_message() {
        let response = outcome_response(RelayOutcome::Completed {
            transaction_number: 10827900900900,
            response: RelayResponse::new(200, "OK"),
        });
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Success! 10827900900900 uploaded.");
    }

    #[tokio::test]
    async fn test_rejected_lists_field_errors() {
        let errors = validate(RawSubmission::new()).unwrap_err();
        let response = outcome_response(RelayOutcome::Rejected(errors));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["errors"]["trans_num"][0]["code"], "required");
        assert_eq!(body["errors"]["userfile"][0]["code"], "required");
    }

    #[tokio::test]
    async fn test_transport_failure_hides_cause() {
        let response = outcome_response(RelayOutcome::TransportFailure(
            RelayError::UpstreamStatus {
                status: 500,
                body: "stack trace".into(),
            },
        ));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_string(response).await;
        assert!(body.contains(TRANSPORT_FAILURE_DETAIL));
        assert!(!body.contains("stack trace"));
    }
}
