use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use subtle::ConstantTimeEq;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use zeroize::Zeroizing;

use crate::config::BasicAuth;
use crate::errors::AppError;
use crate::AppState;

pub mod handlers;

/// Build the dashboard router: `/healthz` plus the JSON API under `/api`.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/tenants", get(handlers::list_tenants))
        .route("/tenant", post(handlers::switch_tenant))
        .route("/deployments", get(handlers::list_deployments))
        .route("/deployments/:key", get(handlers::get_deployment))
        .route("/deployments/:key/logs", get(handlers::deployment_logs))
        .route("/stats", get(handlers::log_stats))
        .route("/custom-objects", get(handlers::list_custom_objects))
        .route(
            "/custom-objects/:container/:key",
            get(handlers::get_custom_object),
        )
        .fallback(fallback_404)
        .layer(middleware::from_fn_with_state(state.clone(), basic_auth_gate));

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Middleware: HTTP Basic gate, active only in production mode.
/// Responds 401 with a `WWW-Authenticate` challenge when credentials are
/// missing or wrong.
async fn basic_auth_gate(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let config = &state.console.config;
    if !config.production {
        return Ok(next.run(req).await);
    }
    let Some(expected) = config.basic_auth.as_ref() else {
        tracing::error!("production mode without BASIC_AUTH_USER/BASIC_AUTH_PASSWORD");
        return Err(AppError::Unauthorized);
    };

    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
        .and_then(|raw| String::from_utf8(raw).ok())
        .map(Zeroizing::new);

    match provided {
        Some(credentials) => {
            let (user, password) = credentials
                .split_once(':')
                .unwrap_or((credentials.as_str(), ""));
            if credentials_match(expected, user, password) {
                Ok(next.run(req).await)
            } else {
                tracing::warn!(user = %mask_user(user), "dashboard: invalid basic credentials");
                Err(AppError::Unauthorized)
            }
        }
        None => {
            tracing::debug!("dashboard: missing basic credentials");
            Err(AppError::Unauthorized)
        }
    }
}

fn credentials_match(expected: &BasicAuth, user: &str, password: &str) -> bool {
    let user_ok = expected.user.as_bytes().ct_eq(user.as_bytes());
    let password_ok = expected.password.as_bytes().ct_eq(password.as_bytes());
    (user_ok & password_ok).into()
}

fn mask_user(user: &str) -> String {
    match user.chars().next() {
        Some(first) => format!("{}***", first),
        None => "<empty>".to_string(),
    }
}

/// Local dashboard origins only.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| {
            let origin = origin.to_str().unwrap_or("");
            origin.starts_with("http://localhost:") || origin.starts_with("http://127.0.0.1:")
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
}

async fn request_id_middleware(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    resp
}
