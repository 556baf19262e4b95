//! Mapping of core errors onto HTTP responses.

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::AppState;

/// Error returned by every handler.
///
/// Bodies are `{"code": <status>, "message": <text>}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Gone(String),
    PreconditionFailed(String),
    Internal(String),
}

/// Original text of an internal error, carried as a response extension so
/// [`reveal_internal_errors`] can expose it in debug mode.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

const INTERNAL_MESSAGE: &str = "The server encountered an internal error";

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn error_body(status: StatusCode, message: String) -> Response {
    let body = Json(serde_json::json!({
        "code": status.as_u16(),
        "message": message,
    }));
    (status, body).into_response()
}

impl From<glossa_core::Error> for ApiError {
    fn from(err: glossa_core::Error) -> Self {
        use glossa_core::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Gone(msg) => ApiError::Gone(msg),
            Error::Validation(msg) => ApiError::BadRequest(msg),
            err @ (Error::Constraint(_) | Error::InvalidInput(_)) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Gone(msg)
            | ApiError::PreconditionFailed(msg) => error_body(status, msg),
            ApiError::Internal(detail) => {
                tracing::error!(
                    subsystem = "api",
                    status = status.as_u16(),
                    error = %detail,
                    "Request failed"
                );
                let mut response = error_body(status, INTERNAL_MESSAGE.to_string());
                response.extensions_mut().insert(InternalErrorDetail(detail));
                response
            }
        }
    }
}

/// Middleware replacing the generic 500 message with the original error text
/// when `DEBUG` is enabled.
pub async fn reveal_internal_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !state.config.debug {
        return response;
    }
    match response.extensions().get::<InternalErrorDetail>().cloned() {
        Some(InternalErrorDetail(detail)) => error_body(response.status(), detail),
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_statuses() {
        use glossa_core::Error;
        let cases = [
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::Gone("x".into()), StatusCode::GONE),
            (Error::Validation("x".into()), StatusCode::BAD_REQUEST),
            (Error::Constraint("x".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err = ApiError::from(glossa_core::Error::Validation(
            "\"target\" is a required property".into(),
        ));
        match err {
            ApiError::BadRequest(msg) => assert_eq!(msg, "\"target\" is a required property"),
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let response = ApiError::Internal("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<InternalErrorDetail>().unwrap();
        assert_eq!(detail.0, "connection refused");
    }
}
