//! Active tenant ("project key") tracking.
//!
//! The active tenant is remembered outside the process: in the
//! `activeProjectKey` cookie for the dashboard server, in a small marker
//! file for the CLI. [`MarkerStore`] abstracts over both.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use axum::http::HeaderMap;
use serde::Serialize;

use super::token::TokenProvider;
use crate::config::TenantConfig;
use crate::errors::ClientError;

pub const TENANT_COOKIE: &str = "activeProjectKey";

/// Where the UI lands after a tenant switch.
pub const SWITCH_REDIRECT: &str = "/deployments";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        TenantId(s.to_string())
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        TenantId(s)
    }
}

// ── Registry ─────────────────────────────────────────────────

/// Configured tenants and their client credentials.
#[derive(Debug, Default)]
pub struct TenantRegistry {
    tenants: Vec<TenantConfig>,
}

impl TenantRegistry {
    pub fn new(tenants: Vec<TenantConfig>) -> Self {
        Self { tenants }
    }

    pub fn ids(&self) -> Vec<TenantId> {
        self.tenants
            .iter()
            .map(|t| TenantId::from(t.project_key.as_str()))
            .collect()
    }

    pub fn contains(&self, tenant: &TenantId) -> bool {
        self.tenants.iter().any(|t| t.project_key == tenant.as_str())
    }

    pub fn first(&self) -> Option<TenantId> {
        self.tenants
            .first()
            .map(|t| TenantId::from(t.project_key.as_str()))
    }

    /// Credentials for `tenant`. Unknown tenants and entries with an empty
    /// client id, secret or scope are configuration errors.
    pub fn credentials(&self, tenant: &TenantId) -> Result<&TenantConfig, ClientError> {
        let entry = self
            .tenants
            .iter()
            .find(|t| t.project_key == tenant.as_str())
            .ok_or_else(|| {
                ClientError::Configuration(format!("project key '{}' is not configured", tenant))
            })?;

        if !entry.is_complete() {
            return Err(ClientError::Configuration(format!(
                "missing client id, secret or scope for project key '{}'",
                tenant
            )));
        }
        Ok(entry)
    }
}

// ── Marker stores ────────────────────────────────────────────

pub trait MarkerStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, project_key: &str) -> anyhow::Result<()>;
}

/// Process-local marker, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryMarker(RwLock<Option<String>>);

impl MemoryMarker {
    pub fn new(initial: Option<&str>) -> Self {
        Self(RwLock::new(initial.map(String::from)))
    }
}

impl MarkerStore for MemoryMarker {
    fn load(&self) -> Option<String> {
        self.0.read().ok().and_then(|v| v.clone())
    }

    fn store(&self, project_key: &str) -> anyhow::Result<()> {
        let mut slot = self
            .0
            .write()
            .map_err(|_| anyhow::anyhow!("tenant marker lock poisoned"))?;
        *slot = Some(project_key.to_string());
        Ok(())
    }
}

/// Marker kept in a one-line file (CLI).
#[derive(Debug, Clone)]
pub struct FileMarker {
    path: PathBuf,
}

impl FileMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MarkerStore for FileMarker {
    fn load(&self) -> Option<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn store(&self, project_key: &str) -> anyhow::Result<()> {
        use anyhow::Context;
        std::fs::write(&self.path, format!("{}\n", project_key))
            .with_context(|| format!("failed to write tenant marker {}", self.path.display()))
    }
}

/// Marker carried by the `activeProjectKey` cookie. Writes are recorded and
/// turned into a `Set-Cookie` header by the handler.
#[derive(Debug, Default)]
pub struct CookieMarker {
    current: Option<String>,
    pending: Mutex<Option<String>>,
}

impl CookieMarker {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let current = headers
            .get_all(axum::http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == TENANT_COOKIE)
            .and_then(|(_, value)| urlencoding::decode(value).ok())
            .map(|v| v.into_owned())
            .filter(|v| !v.is_empty());

        Self {
            current,
            pending: Mutex::new(None),
        }
    }

    /// `Set-Cookie` value for a stored marker, if one was written.
    pub fn set_cookie(&self) -> Option<String> {
        let pending = self.pending.lock().ok()?.clone()?;
        Some(format!(
            "{}={}; Path=/; SameSite=Lax",
            TENANT_COOKIE,
            urlencoding::encode(&pending)
        ))
    }
}

impl MarkerStore for CookieMarker {
    fn load(&self) -> Option<String> {
        self.pending
            .lock()
            .ok()
            .and_then(|p| p.clone())
            .or_else(|| self.current.clone())
    }

    fn store(&self, project_key: &str) -> anyhow::Result<()> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| anyhow::anyhow!("cookie marker lock poisoned"))?;
        *pending = Some(project_key.to_string());
        Ok(())
    }
}

// ── Resolver ─────────────────────────────────────────────────

/// Outcome of a tenant switch; the caller navigates to `redirect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSwitch {
    pub previous: Option<TenantId>,
    pub active: TenantId,
    pub redirect: &'static str,
}

#[derive(Clone)]
pub struct TenantResolver {
    registry: Arc<TenantRegistry>,
    tokens: Arc<TokenProvider>,
    marker: Arc<dyn MarkerStore>,
}

impl TenantResolver {
    pub fn new(
        registry: Arc<TenantRegistry>,
        tokens: Arc<TokenProvider>,
        marker: Arc<dyn MarkerStore>,
    ) -> Self {
        Self {
            registry,
            tokens,
            marker,
        }
    }

    pub fn tenants(&self) -> Vec<TenantId> {
        self.registry.ids()
    }

    /// The tenant named by the persisted marker.
    pub fn active_tenant(&self) -> Result<TenantId, ClientError> {
        self.marker
            .load()
            .map(TenantId::from)
            .ok_or(ClientError::NoActiveTenant)
    }

    /// Like [`active_tenant`](Self::active_tenant), but selects and persists
    /// the first configured tenant when no marker exists yet.
    pub fn active_or_default(&self) -> Result<TenantId, ClientError> {
        match self.active_tenant() {
            Ok(tenant) => Ok(tenant),
            Err(ClientError::NoActiveTenant) => {
                let first = self.registry.first().ok_or(ClientError::NoActiveTenant)?;
                self.persist(&first)?;
                tracing::info!(tenant = %first, "No tenant selected, defaulting to first configured");
                Ok(first)
            }
            Err(e) => Err(e),
        }
    }

    /// Persist `tenant` as active and drop cached tokens so the next
    /// request re-authenticates.
    pub fn set_active_tenant(&self, tenant: TenantId) -> Result<TenantSwitch, ClientError> {
        if !self.registry.contains(&tenant) {
            return Err(ClientError::Configuration(format!(
                "project key '{}' is not configured",
                tenant
            )));
        }

        let previous = self.active_tenant().ok();
        self.persist(&tenant)?;

        if let Some(prev) = &previous {
            self.tokens.invalidate(prev);
        }
        self.tokens.invalidate(&tenant);

        tracing::info!(
            previous = previous.as_ref().map(TenantId::as_str).unwrap_or("-"),
            active = %tenant,
            "Switched active tenant"
        );

        Ok(TenantSwitch {
            previous,
            active: tenant,
            redirect: SWITCH_REDIRECT,
        })
    }

    fn persist(&self, tenant: &TenantId) -> Result<(), ClientError> {
        self.marker
            .store(tenant.as_str())
            .map_err(|e| ClientError::Configuration(format!("cannot persist tenant: {}", e)))
    }
}
