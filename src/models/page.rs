use serde::{Deserialize, Serialize};

use super::DeploymentLog;

/// One cursor-paged response of the deployment logs endpoint.
///
/// `next` is an opaque continuation token; `None` means the final page has
/// been reached. `total` is only set locally once pages have been merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    #[serde(default, alias = "results")]
    pub data: Vec<DeploymentLog>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl LogPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Offset-paged envelope shared by the deployments and custom-objects APIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> PagedResponse<T> {
    /// `{results: [], total: 0, offset: 0, limit: 0}`.
    pub fn empty() -> Self {
        Self {
            limit: 0,
            offset: 0,
            count: 0,
            total: 0,
            results: Vec::new(),
        }
    }

    /// Wrap a single-object response into a one-element page.
    pub fn single(item: T) -> Self {
        Self {
            limit: 1,
            offset: 0,
            count: 1,
            total: 1,
            results: vec![item],
        }
    }
}

impl<T> Default for PagedResponse<T> {
    fn default() -> Self {
        Self::empty()
    }
}
