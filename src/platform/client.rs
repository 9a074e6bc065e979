//! HTTP facade over the two upstream APIs (Connect and core commerce).
//! Attaches the tenant's bearer token and turns non-2xx responses into
//! `ClientError::Api`. Response bodies are decoded with serde and otherwise
//! passed through untouched.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::{TenantId, TokenProvider};
use crate::errors::ClientError;

/// Build the shared upstream client. Retries on transient failures are
/// only installed when `retries > 0`.
pub fn build_http_client(timeout_secs: u64, retries: u32) -> anyhow::Result<ClientWithMiddleware> {
    let reqwest_client = reqwest::Client::builder()
        .use_rustls_tls()
        .pool_max_idle_per_host(16)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .context("failed to build HTTP client")?;

    let mut builder = ClientBuilder::new(reqwest_client);
    if retries > 0 {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(retries);
        builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
    }
    Ok(builder.build())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Connect API: deployments and their logs.
    Connect,
    /// Core commerce API: custom objects, stats.
    Core,
}

pub struct PlatformClient {
    http: ClientWithMiddleware,
    tokens: Arc<TokenProvider>,
    connect_url: String,
    api_url: String,
}

impl PlatformClient {
    pub fn new(
        http: ClientWithMiddleware,
        tokens: Arc<TokenProvider>,
        connect_url: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            connect_url: connect_url.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `<service base>/<tenant>`.
    pub fn base_url(&self, service: Service, tenant: &TenantId) -> String {
        let base = match service {
            Service::Connect => &self.connect_url,
            Service::Core => &self.api_url,
        };
        format!("{}/{}", base, urlencoding::encode(tenant.as_str()))
    }

    fn endpoint_url(
        &self,
        service: Service,
        tenant: &TenantId,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Url, ClientError> {
        let raw = format!(
            "{}/{}",
            self.base_url(service, tenant),
            endpoint.trim_start_matches('/')
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| ClientError::Configuration(format!("invalid URL '{}': {}", raw, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    /// GET `endpoint` on `service` for `tenant`, merging `extra_headers`
    /// over the defaults. `Authorization` always comes from the token provider.
    pub async fn request<T: DeserializeOwned>(
        &self,
        tenant: &TenantId,
        service: Service,
        endpoint: &str,
        query: &[(&str, String)],
        extra_headers: HeaderMap,
    ) -> Result<T, ClientError> {
        let token = self.tokens.access_token(tenant).await?;
        let url = self.endpoint_url(service, tenant, endpoint, query)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in extra_headers.iter() {
            if name != AUTHORIZATION {
                headers.insert(name.clone(), value.clone());
            }
        }
        let bearer = HeaderValue::from_str(&token.bearer())
            .map_err(|_| ClientError::Authentication("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, bearer);

        tracing::debug!(tenant = %tenant, url = %url, "Upstream request");
        let resp = self.http.get(url.clone()).headers(headers).send().await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(tenant = %tenant, path = %url.path(), status = %status, "Upstream returned error");
            return Err(ClientError::api(status));
        }

        Ok(resp.json::<T>().await?)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        tenant: &TenantId,
        service: Service,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        self.request(tenant, service, endpoint, query, HeaderMap::new())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TenantRegistry;
    use crate::config::TenantConfig;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use zeroize::Zeroizing;

    async fn client(server: &MockServer) -> PlatformClient {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-abc", "expires_in": 3600
            })))
            .mount(server)
            .await;

        let registry = Arc::new(TenantRegistry::new(vec![TenantConfig {
            project_key: "shop".into(),
            client_id: "id".into(),
            client_secret: Zeroizing::new("secret".into()),
            scope: "manage_project:shop".into(),
        }]));
        let http = build_http_client(5, 0).unwrap();
        let tokens = Arc::new(TokenProvider::new(http.clone(), server.uri(), registry));
        PlatformClient::new(
            http,
            tokens,
            format!("{}/connect", server.uri()),
            format!("{}/core", server.uri()),
        )
    }

    #[tokio::test]
    async fn test_request_attaches_bearer_and_query() {
        let server = MockServer::start().await;
        let client = client(&server).await;

        Mock::given(method("GET"))
            .and(path("/connect/shop/deployments"))
            .and(query_param("limit", "5"))
            .and(header("authorization", "Bearer tok-abc"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let body: serde_json::Value = client
            .get(
                &TenantId::from("shop"),
                Service::Connect,
                "deployments",
                &[("limit", "5".to_string())],
            )
            .await
            .unwrap();
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_caller_headers_cannot_override_authorization() {
        let server = MockServer::start().await;
        let client = client(&server).await;

        Mock::given(method("GET"))
            .and(path("/core/shop/custom-objects"))
            .and(header("authorization", "Bearer tok-abc"))
            .and(header("x-correlation-id", "req-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let mut extra = HeaderMap::new();
        extra.insert(AUTHORIZATION, HeaderValue::from_static("Bearer forged"));
        extra.insert("x-correlation-id", HeaderValue::from_static("req-1"));

        let _: serde_json::Value = client
            .request(
                &TenantId::from("shop"),
                Service::Core,
                "custom-objects",
                &[],
                extra,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_success_becomes_api_error() {
        let server = MockServer::start().await;
        let client = client(&server).await;

        Mock::given(method("GET"))
            .and(path("/connect/shop/deployments"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{\"message\":\"nope\"}"))
            .mount(&server)
            .await;

        let err = client
            .get::<serde_json::Value>(&TenantId::from("shop"), Service::Connect, "deployments", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Api { status: 404, ref status_text } if status_text == "Not Found"
        ));
    }

    #[tokio::test]
    async fn test_non_json_body_is_decode_error() {
        let server = MockServer::start().await;
        let client = client(&server).await;

        Mock::given(method("GET"))
            .and(path("/connect/shop/deployments"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client
            .get::<serde_json::Value>(&TenantId::from("shop"), Service::Connect, "deployments", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_base_url_per_service() {
        let registry = Arc::new(TenantRegistry::default());
        let http = build_http_client(5, 0).unwrap();
        let tokens = Arc::new(TokenProvider::new(http.clone(), "https://auth.example", registry));
        let client = PlatformClient::new(
            http,
            tokens,
            "https://connect.europe-west1.gcp.commercetools.com/",
            "https://api.europe-west1.gcp.commercetools.com",
        );
        let tenant = TenantId::from("shop");
        assert_eq!(
            client.base_url(Service::Connect, &tenant),
            "https://connect.europe-west1.gcp.commercetools.com/shop"
        );
        assert_eq!(
            client.base_url(Service::Core, &tenant),
            "https://api.europe-west1.gcp.commercetools.com/shop"
        );
    }
}
