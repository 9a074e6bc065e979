use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{de_opt_string_or_number, PagedResponse};

pub type DeploymentsResponse = PagedResponse<Deployment>;

/// A connector deployment as returned by the Connect API. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type", default)]
    pub deployment_type: String,
    #[serde(default)]
    pub preview: bool,
    #[serde(default)]
    pub deployed_region: String,
    #[serde(default)]
    pub applications: Vec<DeploymentApplication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<Connector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl Deployment {
    /// Sorted, de-duplicated application names, for the log filter selector.
    pub fn application_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .applications
            .iter()
            .map(|a| a.application_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default, deserialize_with = "de_opt_string_or_number")]
    pub version: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Creator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_regions: Vec<String>,
    #[serde(default)]
    pub certified: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configurations: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentApplication {
    #[serde(default)]
    pub id: String,
    pub application_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub standard_configuration: Vec<ConfigurationEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secured_configuration: Vec<ConfigurationEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationEntry {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}
