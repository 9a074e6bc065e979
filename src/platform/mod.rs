//! Access to the commerce platform on behalf of the active tenant.

pub mod client;
pub mod fallback;
pub mod queries;

use std::sync::Arc;

pub use client::{build_http_client, PlatformClient, Service};
pub use fallback::{Fallback, LoadError, Loaded, OrFallback};
pub use queries::{CustomObjectQuery, DeploymentQuery, LogQuery, Queries};

use crate::auth::{MarkerStore, TenantRegistry, TenantResolver, TokenProvider};
use crate::config::Config;
use crate::errors::ClientError;

/// Process-wide context: configuration, the tenant registry, the shared
/// token cache and the upstream client.
pub struct Console {
    pub config: Config,
    pub registry: Arc<TenantRegistry>,
    pub tokens: Arc<TokenProvider>,
    pub client: Arc<PlatformClient>,
}

impl Console {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = build_http_client(config.http_timeout_secs, config.upstream_retries)?;
        let registry = Arc::new(TenantRegistry::new(config.tenants.clone()));
        let tokens = Arc::new(TokenProvider::new(
            http.clone(),
            config.auth_url.clone(),
            registry.clone(),
        ));
        let client = Arc::new(PlatformClient::new(
            http,
            tokens.clone(),
            config.connect_url.clone(),
            config.api_url.clone(),
        ));

        tracing::debug!(
            tenants = registry.ids().len(),
            connect_url = %config.connect_url,
            api_url = %config.api_url,
            "Platform context ready"
        );

        Ok(Self {
            config,
            registry,
            tokens,
            client,
        })
    }

    /// A resolver reading and writing the active tenant through `marker`.
    pub fn resolver(&self, marker: Arc<dyn MarkerStore>) -> TenantResolver {
        TenantResolver::new(self.registry.clone(), self.tokens.clone(), marker)
    }

    /// Data access for the tenant `resolver` currently points at.
    pub fn queries(&self, resolver: &TenantResolver) -> Result<Queries, ClientError> {
        let tenant = resolver.active_tenant()?;
        Ok(Queries::new(self.client.clone(), tenant))
    }
}
