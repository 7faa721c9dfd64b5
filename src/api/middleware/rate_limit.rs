//! Per-client request volume limiting
//!
//! Fails open: if the backend errors or does not answer in time the request
//! is let through and a warning is logged.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::rate_limit::RateLimitDecision;

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(limit) = state.rate_limit.as_ref() else {
        return next.run(request).await;
    };

    let client = client_identity(&request);
    let client_id = format!("{}:{}", client, request.uri().path());
    let backend = limit.limiter.backend_name();

    let decision = match tokio::time::timeout(limit.timeout, limit.limiter.check(&client_id)).await
    {
        Ok(Ok(decision)) => decision,
        Ok(Err(e)) => {
            warn!(backend, client = %client, error = %e, "Rate limiter unavailable, allowing request");
            return next.run(request).await;
        }
        Err(_) => {
            warn!(backend, client = %client, "Rate limiter timed out, allowing request");
            return next.run(request).await;
        }
    };

    if !decision.allowed {
        warn!(backend, client = %client, limit = decision.limit, "Rate limit exceeded");

        let mut response = ApiError::rate_limited(format!(
            "Rate limit exceeded: {} requests per window. Retry in {} seconds",
            decision.limit, decision.reset_in_seconds
        ))
        .with_code("rate_limit_exceeded")
        .into_response();

        apply_headers(response.headers_mut(), &decision);
        response
            .headers_mut()
            .insert("retry-after", HeaderValue::from(decision.reset_in_seconds));
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), &decision);
    response
}

/// First `X-Forwarded-For` hop, else the peer address
fn client_identity(request: &Request<Body>) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_in_seconds));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(forwarded: Option<&str>, peer: Option<SocketAddr>) -> Request<Body> {
        let mut builder = Request::builder().uri("/generate-blog");
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(addr) = peer {
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    #[test]
    fn test_forwarded_first_hop_wins() {
        let peer: SocketAddr = "10.0.0.9:5000".parse().unwrap();
        let request = request_with(Some("203.0.113.7, 10.0.0.1"), Some(peer));

        assert_eq!(client_identity(&request), "203.0.113.7");
    }

    #[test]
    fn test_peer_address_fallback() {
        let peer: SocketAddr = "192.0.2.4:43210".parse().unwrap();
        let request = request_with(None, Some(peer));

        assert_eq!(client_identity(&request), "192.0.2.4");
    }

    #[test]
    fn test_unknown_client() {
        assert_eq!(client_identity(&request_with(Some(" "), None)), "unknown");
    }

    #[test]
    fn test_headers() {
        let mut headers = HeaderMap::new();
        apply_headers(
            &mut headers,
            &RateLimitDecision {
                allowed: true,
                remaining: 3,
                limit: 5,
                reset_in_seconds: 42,
            },
        );

        assert_eq!(headers["x-ratelimit-limit"], "5");
        assert_eq!(headers["x-ratelimit-remaining"], "3");
        assert_eq!(headers["x-ratelimit-reset"], "42");
    }
}
