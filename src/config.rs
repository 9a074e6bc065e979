use std::fmt;
use std::path::PathBuf;

use zeroize::Zeroizing;

const DEFAULT_API_URL: &str = "https://api.europe-west1.gcp.commercetools.com";
const DEFAULT_REGION: &str = "europe-west1.gcp";
const DEFAULT_HOST: &str = "commercetools.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Core commerce API base, e.g. `https://api.europe-west1.gcp.commercetools.com`.
    pub api_url: String,
    /// Auth server base. Derived from `api_url` unless `CTP_AUTH_URL` is set.
    pub auth_url: String,
    /// Connect (deployments) API base.
    pub connect_url: String,
    pub tenants: Vec<TenantConfig>,
    /// Production mode turns on the basic-auth gate.
    pub production: bool,
    pub basic_auth: Option<BasicAuth>,
    /// Marker file used by the CLI to remember the active project key.
    pub tenant_file: PathBuf,
    pub http_timeout_secs: u64,
    /// Transient-failure retries for upstream calls. 0 disables the retry middleware.
    pub upstream_retries: u32,
    pub log_format: LogFormat,
}

/// One entry of the parallel `CTP_PROJECT_KEYS` / `CTP_CLIENT_IDS` /
/// `CTP_CLIENT_SECRETS` / `CTP_SCOPES` lists.
#[derive(Clone)]
pub struct TenantConfig {
    pub project_key: String,
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    pub scope: String,
}

impl TenantConfig {
    /// True when every credential field is present.
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.scope.is_empty()
    }
}

impl fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantConfig")
            .field("project_key", &self.project_key)
            .field("client_id", &self.client_id)
            .field("client_secret", &"****")
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Clone)]
pub struct BasicAuth {
    pub user: String,
    pub password: Zeroizing<String>,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("password", &"****")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Configured project keys, in declaration order.
    pub fn project_keys(&self) -> impl Iterator<Item = &str> {
        self.tenants.iter().map(|t| t.project_key.as_str())
    }
}

/// Load configuration from the process environment (and `.env`, if present).
pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a configuration from an arbitrary variable lookup.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let api_url = var("CTP_API_URL")
        .unwrap_or_else(|| DEFAULT_API_URL.into())
        .trim_end_matches('/')
        .to_string();
    // The auth host mirrors the API host with its first "api" segment swapped.
    let auth_url = var("CTP_AUTH_URL")
        .map(|u| u.trim_end_matches('/').to_string())
        .unwrap_or_else(|| api_url.replacen("api", "auth", 1));
    let region = var("CTP_REGION").unwrap_or_else(|| DEFAULT_REGION.into());
    let host = var("CTP_HOST").unwrap_or_else(|| DEFAULT_HOST.into());
    let connect_url = var("CTP_CONNECT_URL")
        .map(|u| u.trim_end_matches('/').to_string())
        .unwrap_or_else(|| format!("https://connect.{}.{}", region, host));

    let keys = split_list(var("CTP_PROJECT_KEYS").or_else(|| var("CTP_PROJECT_KEY")));
    let client_ids = split_list(var("CTP_CLIENT_IDS").or_else(|| var("CTP_CLIENT_ID")));
    let secrets = split_list(var("CTP_CLIENT_SECRETS").or_else(|| var("CTP_CLIENT_SECRET")));
    let scopes = var("CTP_SCOPES").map(|s| split_list(Some(s)));

    let tenants = keys
        .iter()
        .enumerate()
        .filter(|(_, key)| !key.is_empty())
        .map(|(i, key)| TenantConfig {
            project_key: key.clone(),
            client_id: client_ids.get(i).cloned().unwrap_or_default(),
            client_secret: Zeroizing::new(secrets.get(i).cloned().unwrap_or_default()),
            scope: match &scopes {
                Some(list) => list.get(i).cloned().unwrap_or_default(),
                None => format!("manage_project:{}", key),
            },
        })
        .collect::<Vec<_>>();

    let env_mode = var("CONSOLE_ENV").or_else(|| var("RUST_ENV")).unwrap_or_default();
    let production = env_mode == "production";

    let basic_auth = match (var("BASIC_AUTH_USER"), var("BASIC_AUTH_PASSWORD")) {
        (Some(user), Some(password)) => Some(BasicAuth {
            user,
            password: Zeroizing::new(password),
        }),
        _ => None,
    };

    if production && basic_auth.is_none() {
        anyhow::bail!(
            "BASIC_AUTH_USER and BASIC_AUTH_PASSWORD must be set when running in production"
        );
    }

    let log_format = match var("CONSOLE_LOG_FORMAT").as_deref() {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    };

    Ok(Config {
        port: var("CONSOLE_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000),
        api_url,
        auth_url,
        connect_url,
        tenants,
        production,
        basic_auth,
        tenant_file: var("CONSOLE_TENANT_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".connect-console-tenant")),
        http_timeout_secs: var("CONSOLE_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(30),
        upstream_retries: var("CONSOLE_UPSTREAM_RETRIES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        log_format,
    })
}

/// Split a comma list, keeping empty slots so positions stay aligned with
/// the other parallel lists.
fn split_list(raw: Option<String>) -> Vec<String> {
    match raw {
        Some(raw) => raw.split(',').map(|s| s.trim().to_string()).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_derive_auth_and_connect_hosts() {
        let cfg = from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.api_url, "https://api.europe-west1.gcp.commercetools.com");
        assert_eq!(cfg.auth_url, "https://auth.europe-west1.gcp.commercetools.com");
        assert_eq!(cfg.connect_url, "https://connect.europe-west1.gcp.commercetools.com");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.upstream_retries, 0);
        assert!(!cfg.production);
        assert!(cfg.tenants.is_empty());
    }

    #[test]
    fn test_parallel_lists_are_zipped_by_position() {
        let cfg = from_lookup(lookup(&[
            ("CTP_PROJECT_KEYS", "shop-dev, shop-prod"),
            ("CTP_CLIENT_IDS", "id-dev,id-prod"),
            ("CTP_CLIENT_SECRETS", "s-dev,s-prod"),
            ("CTP_SCOPES", "manage_project:shop-dev,manage_project:shop-prod"),
        ]))
        .unwrap();

        assert_eq!(cfg.tenants.len(), 2);
        assert_eq!(cfg.tenants[1].project_key, "shop-prod");
        assert_eq!(cfg.tenants[1].client_id, "id-prod");
        assert_eq!(cfg.tenants[1].client_secret.as_str(), "s-prod");
        assert_eq!(cfg.tenants[1].scope, "manage_project:shop-prod");
        assert!(cfg.tenants.iter().all(TenantConfig::is_complete));
    }

    #[test]
    fn test_short_credential_list_leaves_tenant_incomplete() {
        let cfg = from_lookup(lookup(&[
            ("CTP_PROJECT_KEYS", "a,b"),
            ("CTP_CLIENT_IDS", "id-a"),
            ("CTP_CLIENT_SECRETS", "s-a"),
        ]))
        .unwrap();

        assert!(cfg.tenants[0].is_complete());
        assert_eq!(cfg.tenants[0].scope, "manage_project:a");
        assert!(!cfg.tenants[1].is_complete());
    }

    #[test]
    fn test_production_requires_gate_credentials() {
        let err = from_lookup(lookup(&[("CONSOLE_ENV", "production")])).unwrap_err();
        assert!(err.to_string().contains("BASIC_AUTH_USER"));

        let cfg = from_lookup(lookup(&[
            ("CONSOLE_ENV", "production"),
            ("BASIC_AUTH_USER", "ops"),
            ("BASIC_AUTH_PASSWORD", "hunter2"),
        ]))
        .unwrap();
        assert!(cfg.production);
        assert_eq!(cfg.basic_auth.unwrap().user, "ops");
    }

    #[test]
    fn test_debug_masks_secrets() {
        let cfg = from_lookup(lookup(&[
            ("CTP_PROJECT_KEY", "shop"),
            ("CTP_CLIENT_ID", "id"),
            ("CTP_CLIENT_SECRET", "top-secret"),
        ]))
        .unwrap();
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("top-secret"));
    }
}
