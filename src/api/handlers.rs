use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::{CookieMarker, TenantId, TenantResolver};
use crate::errors::{AppError, ClientError};
use crate::logs::{build_view, collect_pages, LogFilter, LogGroup, ViewOptions};
use crate::models::{CustomObject, Deployment, DeploymentsResponse, LogPage, LogStats, PagedResponse};
use crate::platform::{
    CustomObjectQuery, DeploymentQuery, Fallback, LoadError, Loaded, LogQuery, Queries,
};
use crate::AppState;

/// Upper bound for `pages=` on the logs endpoint.
const MAX_LOG_PAGES: usize = 20;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchTenantRequest {
    pub project_key: String,
}

#[derive(Serialize)]
pub struct TenantsResponse {
    pub tenants: Vec<TenantId>,
    pub active: Option<TenantId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDetail {
    pub deployment: Deployment,
    pub application_names: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsParams {
    pub application_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page_token: Option<String>,
    #[serde(rename = "type")]
    pub log_type: Option<String>,
    pub severity: Option<String>,
    pub q: Option<String>,
    pub group: Option<bool>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub pages: Option<usize>,
}

#[derive(Serialize)]
pub struct LogsResponse {
    pub groups: Vec<LogGroup>,
    pub matched: usize,
    pub next: Option<String>,
    pub total: u64,
    pub stats: LogStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LoadError>,
}

// ── Helpers ──────────────────────────────────────────────────

fn resolver(state: &AppState, headers: &HeaderMap) -> (TenantResolver, Arc<CookieMarker>) {
    let marker = Arc::new(CookieMarker::from_headers(headers));
    (state.console.resolver(marker.clone()), marker)
}

fn queries(state: &AppState, headers: &HeaderMap) -> Result<Queries, AppError> {
    let (resolver, _) = resolver(state, headers);
    Ok(state.console.queries(&resolver)?)
}

/// Attach `Set-Cookie` when the handler changed the active tenant.
fn with_cookie(mut resp: Response, marker: &CookieMarker) -> Response {
    if let Some(cookie) = marker.set_cookie() {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                resp.headers_mut().insert(SET_COOKIE, value);
            }
            Err(_) => tracing::warn!("tenant cookie is not a valid header value"),
        }
    }
    resp
}

fn parse_param<T>(value: Option<&str>, field: &str) -> Result<T, AppError>
where
    T: FromStr<Err = String> + Default,
{
    match value {
        Some(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|e| AppError::BadRequest(format!("{}: {}", field, e))),
        _ => Ok(T::default()),
    }
}

// ── Tenants ──────────────────────────────────────────────────

pub async fn list_tenants(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (resolver, marker) = resolver(&state, &headers);
    let active = resolver.active_or_default().ok();
    let body = TenantsResponse {
        tenants: resolver.tenants(),
        active,
    };
    with_cookie(Json(body).into_response(), &marker)
}

pub async fn switch_tenant(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SwitchTenantRequest>,
) -> Result<Response, AppError> {
    let (resolver, marker) = resolver(&state, &headers);
    let switch = resolver.set_active_tenant(TenantId::from(req.project_key))?;
    Ok(with_cookie(Json(switch).into_response(), &marker))
}

// ── Deployments ──────────────────────────────────────────────

pub async fn list_deployments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<DeploymentQuery>,
) -> Result<Json<Loaded<DeploymentsResponse>>, AppError> {
    let queries = queries(&state, &headers)?;
    Ok(Json(Loaded::from_result(
        queries.fetch_deployments(&params).await,
    )))
}

pub async fn get_deployment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<DeploymentDetail>, AppError> {
    let queries = queries(&state, &headers)?;
    let deployment = queries.fetch_deployment(&key).await?;
    Ok(Json(DeploymentDetail {
        application_names: deployment.application_names(),
        deployment,
    }))
}

/// Load up to `pages` pages of logs, then filter, normalize, sort and group.
/// Upstream failures degrade to whatever was loaded plus an `error` field.
pub async fn deployment_logs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Query(params): Query<LogsParams>,
) -> Result<Json<LogsResponse>, AppError> {
    let options = ViewOptions {
        filter: LogFilter {
            log_type: parse_param(params.log_type.as_deref(), "type")?,
            severity: parse_param(params.severity.as_deref(), "severity")?,
            search: params.q.clone(),
        },
        sort: parse_param(params.sort.as_deref(), "sort")?,
        direction: parse_param(params.direction.as_deref(), "direction")?,
        group: params.group.unwrap_or(false),
    };
    let max_pages = params.pages.unwrap_or(1).clamp(1, MAX_LOG_PAGES);

    let queries = queries(&state, &headers)?;
    let query = LogQuery {
        key,
        application_name: params.application_name,
        start_date: params.start_date,
        end_date: params.end_date,
        page_token: params.page_token,
    };
    let (feed, error) = collect_pages(&queries, query, max_pages).await;

    let fallback = LogPage::fallback();
    let page = feed.page().unwrap_or(&fallback);
    let view = build_view(&page.data, &options);

    Ok(Json(LogsResponse {
        groups: view.groups,
        matched: view.matched,
        next: page.next.clone(),
        total: page.total.unwrap_or(page.data.len() as u64),
        stats: view.stats,
        error: error.as_ref().map(LoadError::from),
    }))
}

pub async fn log_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Loaded<LogStats>>, AppError> {
    let queries = queries(&state, &headers)?;
    Ok(Json(Loaded::from_result(
        queries.fetch_deployment_log_stats().await,
    )))
}

// ── Custom objects ───────────────────────────────────────────

pub async fn list_custom_objects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CustomObjectQuery>,
) -> Result<Json<Loaded<PagedResponse<CustomObject>>>, AppError> {
    let queries = queries(&state, &headers)?;
    Ok(Json(Loaded::from_result(
        queries.fetch_custom_objects(&params).await,
    )))
}

pub async fn get_custom_object(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((container, key)): Path<(String, String)>,
) -> Result<Json<CustomObject>, AppError> {
    let queries = queries(&state, &headers)?;
    let object = queries
        .fetch_custom_object(&container, &key)
        .await
        .map_err(|e| match e {
            ClientError::Api { status: 404, .. } => {
                AppError::NotFound(format!("custom object {}/{}", container, key))
            }
            other => other.into(),
        })?;
    Ok(Json(object))
}
