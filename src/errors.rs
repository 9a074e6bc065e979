use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors raised while talking to the platform (auth server, Connect API,
/// core API). Data access functions return these as-is; callers decide
/// whether to surface them or fall back to an empty result.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("API request failed: {status_text}")]
    Api { status: u16, status_text: String },

    #[error("no active project key selected")]
    NoActiveTenant,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// Build an `Api` error from a non-2xx status.
    pub fn api(status: reqwest::StatusCode) -> Self {
        ClientError::Api {
            status: status.as_u16(),
            status_text: status_text(status),
        }
    }

    /// Short machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Configuration(_) => "configuration_error",
            ClientError::Authentication(_) => "authentication_error",
            ClientError::Api { .. } => "api_error",
            ClientError::NoActiveTenant => "no_active_tenant",
            ClientError::Transport(_) => "transport_error",
            ClientError::Decode(_) => "decode_error",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for ClientError {
    fn from(e: reqwest_middleware::Error) -> Self {
        match e {
            reqwest_middleware::Error::Reqwest(inner) => inner.into(),
            other => ClientError::Transport(other.to_string()),
        }
    }
}

/// Reason phrase for a status, e.g. "Unauthorized". Falls back to the
/// numeric code for non-standard statuses.
pub fn status_text(status: reqwest::StatusCode) -> String {
    status
        .canonical_reason()
        .map(String::from)
        .unwrap_or_else(|| status.as_u16().to_string())
}

/// Errors returned by the dashboard server.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "unauthorized",
                "unauthorized".to_string(),
            ),
            AppError::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "bad_request",
                reason.clone(),
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "invalid_request_error",
                "not_found",
                format!("{} not found", what),
            ),
            AppError::Client(e) => {
                let status = match e {
                    ClientError::NoActiveTenant => StatusCode::CONFLICT,
                    ClientError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    ClientError::Authentication(_)
                    | ClientError::Api { .. }
                    | ClientError::Transport(_)
                    | ClientError::Decode(_) => StatusCode::BAD_GATEWAY,
                };
                (status, "upstream_error", e.code(), e.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        let mut response = (status, body).into_response();

        if matches!(self, AppError::Unauthorized) {
            response.headers_mut().insert(
                "www-authenticate",
                axum::http::HeaderValue::from_static("Basic realm=\"Secure Area\""),
            );
        }

        response
    }
}
