//! Request extractors.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use glossa_core::defaults::SLUG_HEADER;
use glossa_core::protocol::parse_slug_hint;
use glossa_core::RequestContext;

/// The request context identifiers are minted from.
///
/// The scheme honours `X-Forwarded-Proto` so IRIs stay correct behind a TLS
/// terminating proxy.
#[derive(Debug, Clone)]
pub struct Ctx(pub RequestContext);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Ctx {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let host = header_str(&parts.headers, header::HOST.as_str())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()))
            .unwrap_or_else(|| "localhost".to_string());
        let scheme = header_str(&parts.headers, "x-forwarded-proto")
            .or_else(|| parts.uri.scheme_str())
            .unwrap_or("http")
            .to_string();

        Ok(Ctx(RequestContext::from_parts(
            &scheme,
            &host,
            parts.uri.path(),
            parts.uri.query(),
        )))
    }
}

/// The decoded `Slug` header, when present and usable.
#[derive(Debug, Clone, Default)]
pub struct SlugHint(pub Option<String>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SlugHint {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SlugHint(
            parts
                .headers
                .get(SLUG_HEADER)
                .and_then(|v| parse_slug_hint(v.as_bytes())),
        ))
    }
}

/// A header value as text, if present and visible ASCII.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
