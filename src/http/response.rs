//! Response entity materialization.
//!
//! # Responsibilities
//! - Fully buffer the response body before it is instrumented
//! - Bound the wait; a body that is still streaming past the budget fails
//!   the request instead of hanging the pipeline
//!
//! # Design Decisions
//! - Status and headers are kept as produced by the handler
//! - Timed-out requests surface as `PipelineError::EntityTimeout`

use std::time::Duration;

use axum::body::Body;
use axum::response::Response;

use crate::error::PipelineError;

/// Buffer `response`'s body within `budget`.
pub async fn materialize(response: Response, budget: Duration) -> Result<Response, PipelineError> {
    let (parts, body) = response.into_parts();

    let bytes = tokio::time::timeout(budget, axum::body::to_bytes(body, usize::MAX))
        .await
        .map_err(|_| PipelineError::EntityTimeout(budget))?
        .map_err(PipelineError::Entity)?;

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::StatusCode;
    use futures_util::stream;

    #[tokio::test]
    async fn buffers_streaming_body() {
        let chunks = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]);
        let mut response = Response::new(Body::from_stream(chunks));
        *response.status_mut() = StatusCode::ACCEPTED;

        let strict = materialize(response, Duration::from_secs(1)).await.unwrap();

        assert_eq!(strict.status(), StatusCode::ACCEPTED);
        let bytes = axum::body::to_bytes(strict.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello world");
    }

    #[tokio::test]
    async fn stalled_body_times_out() {
        let stalled = stream::pending::<Result<Bytes, std::io::Error>>();
        let response = Response::new(Body::from_stream(stalled));

        let err = materialize(response, Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, PipelineError::EntityTimeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn body_error_is_surfaced() {
        let failing = stream::iter(vec![Err::<Bytes, _>(std::io::Error::other("reset"))]);
        let response = Response::new(Body::from_stream(failing));

        let err = materialize(response, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Entity(_)));
    }
}
