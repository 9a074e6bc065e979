use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A key/value record from the custom-objects store, keyed by `(container, key)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomObject {
    pub id: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub container: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}
