//! Wire types for the deployments, logs and custom-objects APIs.
//!
//! Upstream payloads are loosely shaped, so most fields are optional and
//! numeric identifiers that sometimes arrive as strings are accepted either way.

pub mod custom_object;
pub mod deployment;
pub mod log;
pub mod page;
pub mod stats;

pub use custom_object::CustomObject;
pub use deployment::{Connector, Deployment, DeploymentApplication, DeploymentsResponse};
pub use log::{ApplicationDetails, DeploymentLog, HttpRequestDetails, LogDetails, LogType, Severity};
pub use page::{LogPage, PagedResponse};
pub use stats::LogStats;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accept `"1.2.0"`, `3` or `null` and keep the textual form.
pub(crate) fn de_opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

pub(crate) fn de_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_opt_string_or_number(deserializer)?.unwrap_or_default())
}

/// Free text that is usually a string. Structured values keep their JSON form.
pub(crate) fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Accept `200`, `"200"` or `null` as an HTTP status.
pub(crate) fn de_opt_status<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
