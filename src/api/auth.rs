//! Caller identity resolution.
//!
//! Authentication happens upstream; the gateway forwards the verified user
//! ID in the `x-user-id` header. [`resolve_caller`] lifts that header into
//! a typed [`CallerId`] request extension for everything downstream (the
//! request logger, the failure capture, and the handlers). Handlers on the
//! authenticated surface take the [`Caller`] extractor, which rejects with
//! a 401 when no identity was resolved; the public error-reporting handler
//! takes [`MaybeCaller`] instead.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::TelemetryError;

/// Header carrying the verified caller identity.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller ID, present in request extensions when the
/// request carried a non-empty identity header.
#[derive(Debug, Clone)]
pub struct CallerId(pub String);

/// Inserts a [`CallerId`] extension when the request carries an identity.
pub async fn resolve_caller(mut request: Request, next: Next) -> Response {
    if let Some(caller) = caller_from_headers(request.headers()) {
        request.extensions_mut().insert(caller);
    }
    next.run(request).await
}

/// Extractor for handlers that require an authenticated caller.
#[derive(Debug, Clone)]
pub struct Caller(pub String);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = TelemetryError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerId>()
            .map(|caller| Self(caller.0.clone()))
            .ok_or(TelemetryError::Unauthorized)
    }
}

/// Extractor for handlers that accept anonymous requests. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<String>);

impl<S> FromRequestParts<S> for MaybeCaller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<CallerId>()
                .map(|caller| caller.0.clone()),
        ))
    }
}

fn caller_from_headers(headers: &HeaderMap) -> Option<CallerId> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| CallerId(value.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn parts_with_caller(caller: Option<&str>) -> Parts {
        let mut request = axum::http::Request::builder()
            .uri("/metrics/events")
            .body(())
            .unwrap();
        if let Some(id) = caller {
            request.extensions_mut().insert(CallerId(id.to_string()));
        }
        request.into_parts().0
    }

    #[test]
    fn resolves_trimmed_header_value() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  user-42  "));
        let Some(caller) = caller_from_headers(&headers) else {
            panic!("expected a caller");
        };
        assert_eq!(caller.0, "user-42");
    }

    #[test]
    fn empty_or_missing_header_resolves_to_none() {
        assert!(caller_from_headers(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        assert!(caller_from_headers(&headers).is_none());
    }

    #[tokio::test]
    async fn caller_extractor_rejects_anonymous_requests() {
        let mut parts = parts_with_caller(None);
        let result = Caller::from_request_parts(&mut parts, &()).await;
        let Err(TelemetryError::Unauthorized) = result else {
            panic!("expected Unauthorized");
        };
    }

    #[tokio::test]
    async fn caller_extractor_returns_the_resolved_identity() {
        let mut parts = parts_with_caller(Some("user-7"));
        let Ok(Caller(id)) = Caller::from_request_parts(&mut parts, &()).await else {
            panic!("expected a caller");
        };
        assert_eq!(id, "user-7");
    }

    #[tokio::test]
    async fn maybe_caller_never_rejects() {
        let mut parts = parts_with_caller(None);
        let Ok(MaybeCaller(id)) = MaybeCaller::from_request_parts(&mut parts, &()).await;
        assert!(id.is_none());
    }
}
