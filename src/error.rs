//! Error types and the JSON error document.
//!
//! Application failures are expressed as HTTP responses carrying an
//! [`ErrorBody`]. Whatever the client asked for in `Accept`, the body is
//! always served as `application/json`.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::transaction::TransactionContext;

/// Machine-readable error document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    pub transaction_id: String,
}

impl ErrorBody {
    pub fn new(ctx: &TransactionContext, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transaction_id: ctx.id().to_string(),
        }
    }

    /// Render as a JSON response with `status`.
    pub fn into_response(self, status: StatusCode) -> Response {
        let (status, body) = match serde_json::to_vec(&self) {
            Ok(bytes) => (status, bytes),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize error body");
                (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
            }
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// Request-level failures raised by the pipeline itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The response body was not fully produced within the budget.
    #[error("response entity was not materialized within {0:?}")]
    EntityTimeout(Duration),

    /// The response body stream failed.
    #[error("response entity failed: {0}")]
    Entity(#[source] axum::Error),
}

impl PipelineError {
    /// Response sent to the client for this failure.
    pub fn to_response(&self, ctx: &TransactionContext) -> Response {
        let message = match self {
            Self::EntityTimeout(_) => {
                "The server was not able to produce a timely response to your request."
            }
            Self::Entity(_) => "There was an internal server error.",
        };
        ErrorBody::new(ctx, message).into_response(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[tokio::test]
    async fn timeout_renders_json_with_transaction_id() {
        let ctx = TransactionContext::from_headers(&HeaderMap::new());
        let response = PipelineError::EntityTimeout(Duration::from_secs(30)).to_response(&ctx);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.transaction_id, ctx.id().to_string());
        assert!(body.message.contains("timely response"));
    }

    #[test]
    fn body_uses_camel_case_keys() {
        let ctx = TransactionContext::from_headers(&HeaderMap::new());
        let json = serde_json::to_value(ErrorBody::new(&ctx, "nope")).unwrap();
        assert_eq!(json["message"], "nope");
        assert_eq!(json["transactionId"], ctx.id().to_string());
    }
}
