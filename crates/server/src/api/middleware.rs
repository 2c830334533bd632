//! Session and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Instant;

use crate::api::job::JobErrorResponse;
use crate::metrics::{
    AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
///
/// Paths are labelled by route template so unknown paths share one label.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Session middleware that binds the request to the caller's job controller.
///
/// Reads `Authorization: Bearer <token>`, looks up (or creates) the
/// controller for that token and inserts it into the request extensions.
/// Requests without a bearer token get 401 before any controller is touched.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Ok(token) => token.to_string(),
        Err(reason) => {
            AUTH_FAILURES_TOTAL.with_label_values(&[reason]).inc();
            return (
                StatusCode::UNAUTHORIZED,
                Json(JobErrorResponse {
                    error: "Missing bearer token".to_string(),
                    kind: "auth".to_string(),
                }),
            )
                .into_response();
        }
    };

    let controller = state.controller_for(&token).await;
    request.extensions_mut().insert(controller);
    next.run(request).await
}

/// Extract the bearer token, or the reason it is unusable.
fn bearer_token(request: &Request<Body>) -> Result<&str, &'static str> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or("missing_header")?
        .to_str()
        .map_err(|_| "malformed_header")?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or("not_bearer")?
        .trim();

    if token.is_empty() {
        return Err("empty_token");
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/v1/job");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&request_with(Some("Bearer abc"))), Ok("abc"));
        assert_eq!(bearer_token(&request_with(Some("bearer  abc "))), Ok("abc"));
    }

    #[test]
    fn test_bearer_token_rejections() {
        assert_eq!(bearer_token(&request_with(None)), Err("missing_header"));
        assert_eq!(
            bearer_token(&request_with(Some("Basic dXNlcjpwdw=="))),
            Err("not_bearer")
        );
        assert_eq!(bearer_token(&request_with(Some("Bearer   "))), Err("empty_token"));
    }
}
