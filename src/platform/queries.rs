use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{PlatformClient, Service};
use crate::auth::TenantId;
use crate::errors::ClientError;
use crate::models::{CustomObject, Deployment, DeploymentsResponse, LogPage, LogStats, PagedResponse};

// ── Query parameters ───────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentQuery {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters of one deployment-logs request. `page_token` is the opaque
/// cursor from the previous page's `next`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub key: String,
    #[serde(default)]
    pub application_name: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub page_token: Option<String>,
}

impl LogQuery {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Same filters, continuing from `cursor`.
    pub fn with_page_token(&self, cursor: impl Into<String>) -> Self {
        Self {
            page_token: Some(cursor.into()),
            ..self.clone()
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let fields = [
            ("applicationName", &self.application_name),
            ("startDate", &self.start_date),
            ("endDate", &self.end_date),
            ("pageToken", &self.page_token),
        ];
        for (name, value) in fields {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((name, v.to_string()));
            }
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomObjectQuery {
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

// ── Data access ────────────────────────────────────────────────

/// Data access bound to one tenant. Every call returns the upstream body
/// decoded, or the error that prevented it.
#[derive(Clone)]
pub struct Queries {
    client: Arc<PlatformClient>,
    tenant: TenantId,
}

impl Queries {
    pub fn new(client: Arc<PlatformClient>, tenant: TenantId) -> Self {
        Self { client, tenant }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// List deployments, or look one up by key. A keyed lookup answers with
    /// the bare deployment, which is wrapped into a one-element page.
    pub async fn fetch_deployments(
        &self,
        query: &DeploymentQuery,
    ) -> Result<DeploymentsResponse, ClientError> {
        let mut params = Vec::new();
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        let endpoint = match query.key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => format!("deployments/key={}", urlencoding::encode(key)),
            None => "deployments".to_string(),
        };

        let body: Value = self
            .client
            .get(&self.tenant, Service::Connect, &endpoint, &params)
            .await?;
        normalize_page(body)
    }

    pub async fn fetch_deployment(&self, key: &str) -> Result<Deployment, ClientError> {
        let endpoint = format!("deployments/key={}", urlencoding::encode(key));
        self.client
            .get(&self.tenant, Service::Connect, &endpoint, &[])
            .await
    }

    pub async fn fetch_deployment_logs(&self, query: &LogQuery) -> Result<LogPage, ClientError> {
        let endpoint = format!("deployments/key={}/logs", urlencoding::encode(&query.key));
        let page: LogPage = self
            .client
            .get(&self.tenant, Service::Connect, &endpoint, &query.params())
            .await?;
        tracing::debug!(
            tenant = %self.tenant,
            deployment = %query.key,
            count = page.data.len(),
            has_next = page.next.is_some(),
            "Fetched log page"
        );
        Ok(page)
    }

    pub async fn fetch_deployment_log_stats(&self) -> Result<LogStats, ClientError> {
        self.client
            .get(&self.tenant, Service::Core, "deployment-logs/stats", &[])
            .await
    }

    /// Newest-first listing of custom objects, narrowed by container and key.
    /// A `(container, key)` lookup returns a bare object, which is wrapped
    /// into a one-element page.
    pub async fn fetch_custom_objects(
        &self,
        query: &CustomObjectQuery,
    ) -> Result<PagedResponse<CustomObject>, ClientError> {
        let mut endpoint = "custom-objects".to_string();
        if let Some(container) = query.container.as_deref().filter(|c| !c.is_empty()) {
            endpoint.push('/');
            endpoint.push_str(&urlencoding::encode(container));
            if let Some(key) = query.key.as_deref().filter(|k| !k.is_empty()) {
                endpoint.push('/');
                endpoint.push_str(&urlencoding::encode(key));
            }
        }

        let mut params = vec![("sort", "lastModifiedAt desc".to_string())];
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = query.offset {
            params.push(("offset", offset.to_string()));
        }

        let body: Value = self
            .client
            .get(&self.tenant, Service::Core, &endpoint, &params)
            .await?;
        normalize_page(body)
    }

    pub async fn fetch_custom_object(
        &self,
        container: &str,
        key: &str,
    ) -> Result<CustomObject, ClientError> {
        let endpoint = format!(
            "custom-objects/{}/{}",
            urlencoding::encode(container),
            urlencoding::encode(key)
        );
        self.client
            .get(&self.tenant, Service::Core, &endpoint, &[])
            .await
    }
}

/// A body carrying an `id` is a single resource rather than a page.
fn normalize_page<T: DeserializeOwned>(body: Value) -> Result<PagedResponse<T>, ClientError> {
    let decode = |e: serde_json::Error| ClientError::Decode(e.to_string());
    if body.get("id").is_some() {
        let item = serde_json::from_value(body).map_err(decode)?;
        Ok(PagedResponse::single(item))
    } else {
        serde_json::from_value(body).map_err(decode)
    }
}
