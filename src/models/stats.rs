use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::log::{DeploymentLog, LogDetails, LogType};

/// Aggregate log counters, either reported by the platform or computed
/// locally from accumulated pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    #[serde(default)]
    pub total_logs: u64,
    #[serde(default)]
    pub by_type: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_severity: BTreeMap<String, u64>,
    /// Mean HTTP request latency in milliseconds.
    #[serde(default)]
    pub avg_response_time: f64,
    #[serde(default)]
    pub last_updated: String,
}

impl LogStats {
    /// All-zero stats. Used when the stats endpoint is unavailable.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_logs(logs: &[DeploymentLog]) -> Self {
        let mut by_type: BTreeMap<String, u64> = LogType::ALL
            .iter()
            .map(|t| (t.stats_key().to_string(), 0))
            .collect();
        let mut by_severity: BTreeMap<String, u64> = BTreeMap::new();
        let mut latency_sum = 0.0;
        let mut latency_count = 0u64;

        for log in logs {
            *by_type.entry(log.log_type().stats_key().to_string()).or_default() += 1;
            *by_severity
                .entry(log.severity.as_str().to_ascii_lowercase())
                .or_default() += 1;

            if let LogDetails::HttpRequest(details) = &log.details {
                if let Some(ms) = details.latency_ms() {
                    latency_sum += ms;
                    latency_count += 1;
                }
            }
        }

        let avg_response_time = if latency_count == 0 {
            0.0
        } else {
            latency_sum / latency_count as f64
        };

        LogStats {
            total_logs: logs.len() as u64,
            by_type,
            by_severity,
            avg_response_time,
            last_updated: Utc::now().to_rfc3339(),
        }
    }
}
