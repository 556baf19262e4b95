//! JSON-LD responses and conditional request handling.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use glossa_core::Representation;

use crate::error::ApiError;
use crate::extract::header_str;

/// Response headers varied on by container reads.
const CONTAINER_VARY: &str = "Accept, Prefer";

/// A rendered representation plus the status and headers it travels with.
#[derive(Debug)]
pub struct LdResponse {
    status: StatusCode,
    representation: Representation,
    location: Option<String>,
    vary: bool,
}

impl LdResponse {
    fn new(status: StatusCode, representation: Representation) -> Self {
        Self {
            status,
            representation,
            location: None,
            vary: false,
        }
    }

    /// 200 with the representation.
    pub fn ok(representation: Representation) -> Self {
        Self::new(StatusCode::OK, representation)
    }

    /// 201 with `Location` set to the minted `id`.
    pub fn created(representation: Representation) -> Self {
        let location = representation.id().map(str::to_string);
        Self {
            location,
            ..Self::new(StatusCode::CREATED, representation)
        }
    }

    /// 204 with no body.
    pub fn no_content(representation: Representation) -> Self {
        Self::new(StatusCode::NO_CONTENT, representation)
    }

    /// 304 carrying only the validator.
    pub fn not_modified(representation: Representation) -> Self {
        Self::new(StatusCode::NOT_MODIFIED, representation)
    }

    /// Mark as a container read (`Vary: Accept, Prefer`).
    pub fn container(mut self) -> Self {
        self.vary = true;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn has_body(&self) -> bool {
        !matches!(self.status, StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED)
    }
}

fn append_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.append(name, v);
        }
        Err(e) => tracing::warn!(header = %name, error = %e, "Dropping unrepresentable header"),
    }
}

impl IntoResponse for LdResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(etag) = &self.representation.etag {
            append_header(&mut headers, header::ETAG, etag);
        }
        if self.vary {
            append_header(&mut headers, header::VARY, CONTAINER_VARY);
        }

        if !self.has_body() {
            return (self.status, headers).into_response();
        }

        let body = match self.representation.to_bytes() {
            Ok(body) => body,
            Err(e) => return ApiError::from(e).into_response(),
        };

        append_header(&mut headers, header::CONTENT_TYPE, self.representation.content_type());
        for link in &self.representation.links {
            append_header(&mut headers, header::LINK, link);
        }
        if let Some(location) = &self.location {
            append_header(&mut headers, header::LOCATION, location);
        }

        (self.status, headers, Body::from(body)).into_response()
    }
}

/// Answer a read with 304 when `If-None-Match` matches the current tag.
pub fn read_response(headers: &HeaderMap, representation: Representation) -> LdResponse {
    match header_str(headers, header::IF_NONE_MATCH.as_str()) {
        Some(candidates) if representation.matches(candidates) => {
            tracing::debug!(subsystem = "api", "Conditional read matched, 304");
            LdResponse::not_modified(representation)
        }
        _ => LdResponse::ok(representation),
    }
}

/// Refuse a mutation whose `If-Match` does not strongly match the current tag.
///
/// `current` must be the representation a `GET` of the resource would return.
pub fn check_if_match(headers: &HeaderMap, current: &Representation) -> Result<(), ApiError> {
    match header_str(headers, header::IF_MATCH.as_str()) {
        Some(candidates) if !current.matches_strong(candidates) => Err(ApiError::PreconditionFailed(
            "The resource has changed since it was last retrieved".to_string(),
        )),
        _ => Ok(()),
    }
}
