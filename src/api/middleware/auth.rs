//! API key extraction

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::api::types::ApiError;

/// The raw key presented by the caller, not yet authorized
///
/// Read from `Authorization: Bearer <key>` or `X-API-Key: <key>`.
/// Handlers authorize it explicitly once the request body has been
/// validated, so a malformed request never consumes trial quota.
#[derive(Clone)]
pub struct PresentedKey(pub String);

impl PresentedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PresentedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "PresentedKey({}…)", prefix)
    }
}

impl<S> FromRequestParts<S> for PresentedKey
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_api_key_from_headers(&parts.headers).map(PresentedKey)
    }
}

fn extract_api_key_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid Authorization header encoding"))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return non_empty(token);
        }
    }

    if let Some(api_key_header) = headers.get("x-api-key") {
        let key = api_key_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid X-API-Key header encoding"))?;

        return non_empty(key);
    }

    Err(missing_key())
}

/// Returned verbatim so the admin secret is compared exactly
fn non_empty(raw: &str) -> Result<String, ApiError> {
    if raw.trim().is_empty() {
        return Err(missing_key());
    }
    Ok(raw.to_string())
}

fn missing_key() -> ApiError {
    ApiError::unauthorized(
        "API key required. Provide via 'X-API-Key: <key>' or 'Authorization: Bearer <key>' header",
    )
    .with_code("missing_api_key")
}
