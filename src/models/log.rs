//! Deployment log records.
//!
//! The upstream `details` bag changes shape with the log `type`, and even
//! within a type field names drift (`method` vs `requestMethod`). Logs are
//! decoded through [`RawLog`] into a [`LogDetails`] union so the rest of the
//! crate never probes fields at runtime.
//!
//! Decoding never fails. Unknown types and severities are kept verbatim, and
//! details that do not fit their type land in [`LogDetails::Other`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{de_opt_status, de_opt_string_or_number, de_opt_text, de_string_or_number};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogType {
    HttpRequest,
    ApplicationText,
    ApplicationJson,
    Unknown(String),
}

impl LogType {
    pub const ALL: [LogType; 3] = [
        LogType::HttpRequest,
        LogType::ApplicationText,
        LogType::ApplicationJson,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            LogType::HttpRequest => "HTTP_REQUEST",
            LogType::ApplicationText => "APPLICATION_TEXT",
            LogType::ApplicationJson => "APPLICATION_JSON",
            LogType::Unknown(raw) => raw,
        }
    }

    /// Key used in stats maps, e.g. `httpRequest`.
    pub fn stats_key(&self) -> &str {
        match self {
            LogType::HttpRequest => "httpRequest",
            LogType::ApplicationText => "applicationText",
            LogType::ApplicationJson => "applicationJson",
            LogType::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict: only the known types parse. Used for filters.
impl FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown log type: {}", s))
    }
}

impl From<String> for LogType {
    fn from(raw: String) -> Self {
        match raw.parse() {
            Ok(known) => known,
            Err(_) => LogType::Unknown(raw),
        }
    }
}

impl From<LogType> for String {
    fn from(log_type: LogType) -> Self {
        match log_type {
            LogType::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Log severity. Wire values are upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Default,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
    Unknown(String),
}

impl Severity {
    pub const ALL: [Severity; 9] = [
        Severity::Default,
        Severity::Debug,
        Severity::Info,
        Severity::Notice,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
        Severity::Alert,
        Severity::Emergency,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Severity::Default => "DEFAULT",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Alert => "ALERT",
            Severity::Emergency => "EMERGENCY",
            Severity::Unknown(raw) => raw,
        }
    }

    /// Syslog-style rank, `DEFAULT` and unknown values lowest. Only used
    /// for sorting.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Default | Severity::Unknown(_) => 0,
            Severity::Debug => 1,
            Severity::Info => 2,
            Severity::Notice => 3,
            Severity::Warning => 4,
            Severity::Error => 5,
            Severity::Critical => 6,
            Severity::Alert => 7,
            Severity::Emergency => 8,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown severity: {}", s))
    }
}

impl From<String> for Severity {
    fn from(raw: String) -> Self {
        match raw.parse() {
            Ok(known) => known,
            Err(_) => Severity::Unknown(raw),
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Details of an `HTTP_REQUEST` log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestDetails {
    #[serde(
        default,
        alias = "requestMethod",
        deserialize_with = "de_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub method: Option<String>,
    #[serde(
        default,
        alias = "requestUrl",
        alias = "path",
        deserialize_with = "de_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    #[serde(
        default,
        alias = "statusCode",
        deserialize_with = "de_opt_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<u16>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub latency: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HttpRequestDetails {
    /// Latency in milliseconds. Accepts `"0.087s"` (seconds) or a bare
    /// number (milliseconds).
    pub fn latency_ms(&self) -> Option<f64> {
        let raw = self.latency.as_deref()?.trim();
        match raw.strip_suffix("ms") {
            Some(ms) => ms.trim().parse().ok(),
            None => match raw.strip_suffix('s') {
                Some(secs) => secs.trim().parse::<f64>().ok().map(|s| s * 1000.0),
                None => raw.parse().ok(),
            },
        }
    }
}

/// Details of `APPLICATION_TEXT` and `APPLICATION_JSON` logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDetails {
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ApplicationDetails {
    pub fn payload_object(&self) -> Option<&Map<String, Value>> {
        self.payload.as_ref().and_then(Value::as_object)
    }

    pub fn payload_object_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.payload.as_mut().and_then(Value::as_object_mut)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogDetails {
    HttpRequest(HttpRequestDetails),
    ApplicationText(ApplicationDetails),
    ApplicationJson(ApplicationDetails),
    /// Unknown type, or details that do not fit the declared one.
    Other { log_type: LogType, details: Value },
}

impl LogDetails {
    pub fn log_type(&self) -> LogType {
        match self {
            LogDetails::HttpRequest(_) => LogType::HttpRequest,
            LogDetails::ApplicationText(_) => LogType::ApplicationText,
            LogDetails::ApplicationJson(_) => LogType::ApplicationJson,
            LogDetails::Other { log_type, .. } => log_type.clone(),
        }
    }

    fn decode(log_type: LogType, details: Value) -> Self {
        let details = if details.is_null() {
            Value::Object(Map::new())
        } else {
            details
        };
        let typed = match &log_type {
            LogType::HttpRequest => {
                serde_json::from_value(details.clone()).map(LogDetails::HttpRequest)
            }
            LogType::ApplicationText => {
                serde_json::from_value(details.clone()).map(LogDetails::ApplicationText)
            }
            LogType::ApplicationJson => {
                serde_json::from_value(details.clone()).map(LogDetails::ApplicationJson)
            }
            LogType::Unknown(_) => Ok(LogDetails::Other {
                log_type: log_type.clone(),
                details: details.clone(),
            }),
        };
        match typed {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!(%log_type, error = %e, "log details kept untyped");
                LogDetails::Other { log_type, details }
            }
        }
    }

    fn encode(&self) -> Value {
        let encoded = match self {
            LogDetails::HttpRequest(d) => serde_json::to_value(d),
            LogDetails::ApplicationText(d) | LogDetails::ApplicationJson(d) => {
                serde_json::to_value(d)
            }
            LogDetails::Other { details, .. } => return details.clone(),
        };
        encoded.unwrap_or(Value::Null)
    }
}

/// A single log event emitted by a deployed application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "RawLog")]
pub struct DeploymentLog {
    pub deployment_id: Option<String>,
    pub application_name: String,
    pub severity: Severity,
    pub timestamp: String,
    pub details: LogDetails,
}

impl<'de> Deserialize<'de> for DeploymentLog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(DeploymentLog::from_value)
    }
}

impl DeploymentLog {
    /// Decode one entry of a logs page. An entry that is not even an object
    /// is kept whole as untyped details.
    pub fn from_value(value: Value) -> Self {
        if value.is_object() {
            if let Ok(raw) = serde_json::from_value::<RawLog>(value.clone()) {
                return raw.into();
            }
        }
        DeploymentLog {
            deployment_id: None,
            application_name: String::new(),
            severity: Severity::Default,
            timestamp: String::new(),
            details: LogDetails::Other {
                log_type: LogType::Unknown(String::new()),
                details: value,
            },
        }
    }

    pub fn log_type(&self) -> LogType {
        self.details.log_type()
    }

    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// The human-readable message: the top-level `message`, else the
    /// payload's `message` or normalized `log` field.
    pub fn message(&self) -> Option<&str> {
        match &self.details {
            LogDetails::HttpRequest(d) => d.message.as_deref(),
            LogDetails::ApplicationText(d) | LogDetails::ApplicationJson(d) => {
                d.message.as_deref().or_else(|| {
                    let payload = d.payload_object()?;
                    payload
                        .get("message")
                        .or_else(|| payload.get("log"))
                        .and_then(Value::as_str)
                })
            }
            LogDetails::Other { details, .. } => details
                .as_str()
                .or_else(|| details.get("message").and_then(Value::as_str)),
        }
    }

    /// One-line preview for tables, at most `max` characters of message.
    pub fn preview(&self, max: usize) -> String {
        if let Some(msg) = self.message() {
            return truncate(msg, max);
        }
        if let LogDetails::HttpRequest(d) = &self.details {
            if let (Some(method), Some(url)) = (&d.method, &d.url) {
                let status = d.status.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
                return format!("{} {} ({})", method, url, status);
            }
        }
        truncate(&self.details.encode().to_string(), max)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

/// Wire shape of a log, used only for (de)serialization.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    #[serde(rename = "type", default, deserialize_with = "de_string_or_number")]
    log_type: String,
    #[serde(
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    deployment_id: Option<String>,
    #[serde(default, deserialize_with = "de_string_or_number")]
    application_name: String,
    #[serde(
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    severity: Option<String>,
    #[serde(default, deserialize_with = "de_string_or_number")]
    timestamp: String,
    #[serde(default)]
    details: Value,
}

impl From<RawLog> for DeploymentLog {
    fn from(raw: RawLog) -> Self {
        DeploymentLog {
            deployment_id: raw.deployment_id,
            application_name: raw.application_name,
            severity: raw.severity.map(Severity::from).unwrap_or(Severity::Default),
            timestamp: raw.timestamp,
            details: LogDetails::decode(LogType::from(raw.log_type), raw.details),
        }
    }
}

impl From<DeploymentLog> for RawLog {
    fn from(log: DeploymentLog) -> Self {
        RawLog {
            log_type: log.log_type().into(),
            details: log.details.encode(),
            deployment_id: log.deployment_id,
            application_name: log.application_name,
            severity: Some(log.severity.into()),
            timestamp: log.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_request_details_accept_field_aliases() {
        let log: DeploymentLog = serde_json::from_value(json!({
            "type": "HTTP_REQUEST",
            "applicationName": "service",
            "severity": "ERROR",
            "timestamp": "2024-05-01T10:00:00Z",
            "details": {
                "requestMethod": "POST",
                "requestUrl": "/orders",
                "status": "502",
                "latency": "0.25s",
                "userAgent": "curl/8"
            }
        }))
        .unwrap();

        let LogDetails::HttpRequest(details) = &log.details else {
            panic!("expected HTTP details");
        };
        assert_eq!(details.method.as_deref(), Some("POST"));
        assert_eq!(details.url.as_deref(), Some("/orders"));
        assert_eq!(details.status, Some(502));
        assert_eq!(details.latency_ms(), Some(250.0));
        assert_eq!(log.preview(50), "POST /orders (502)");
    }

    #[test]
    fn test_alternate_http_field_names() {
        let details: HttpRequestDetails = serde_json::from_value(json!({
            "method": "GET", "path": "/health", "statusCode": 200, "latency": 12
        }))
        .unwrap();
        assert_eq!(details.url.as_deref(), Some("/health"));
        assert_eq!(details.status, Some(200));
        assert_eq!(details.latency_ms(), Some(12.0));
    }

    #[test]
    fn test_application_log_keeps_unknown_fields() {
        let log: DeploymentLog = serde_json::from_value(json!({
            "type": "APPLICATION_JSON",
            "deploymentId": "dep-1",
            "applicationName": "event",
            "severity": "CRITICAL",
            "timestamp": "2024-05-01T10:00:00Z",
            "details": {"payload": {"message": "boom", "orderId": "o-1"}, "trace": "abc"}
        }))
        .unwrap();

        assert_eq!(log.log_type(), LogType::ApplicationJson);
        assert_eq!(log.severity, Severity::Critical);
        assert_eq!(log.message(), Some("boom"));

        let round = serde_json::to_value(&log).unwrap();
        assert_eq!(round["type"], "APPLICATION_JSON");
        assert_eq!(round["details"]["trace"], "abc");
        assert_eq!(round["details"]["payload"]["orderId"], "o-1");
    }

    #[test]
    fn test_unknown_type_and_severity_are_kept() {
        let log: DeploymentLog = serde_json::from_value(json!({
            "type": "METRIC", "applicationName": "x", "severity": "TRACE",
            "timestamp": "", "details": {"message": "cpu 93%"}
        }))
        .unwrap();

        assert_eq!(log.log_type(), LogType::Unknown("METRIC".into()));
        assert_eq!(log.severity, Severity::Unknown("TRACE".into()));
        assert_eq!(log.severity.rank(), 0);
        assert_eq!(log.message(), Some("cpu 93%"));

        let round = serde_json::to_value(&log).unwrap();
        assert_eq!(round["type"], "METRIC");
        assert_eq!(round["severity"], "TRACE");
        assert_eq!(round["details"]["message"], "cpu 93%");
    }

    #[test]
    fn test_structured_message_is_kept_as_json_text() {
        let log: DeploymentLog = serde_json::from_value(json!({
            "type": "APPLICATION_JSON", "applicationName": "event", "severity": "INFO",
            "timestamp": "2024-05-01T10:00:00Z",
            "details": {"message": {"orderId": "o-1"}}
        }))
        .unwrap();

        assert_eq!(log.log_type(), LogType::ApplicationJson);
        assert!(matches!(log.details, LogDetails::ApplicationJson(_)));
        assert_eq!(log.message(), Some(r#"{"orderId":"o-1"}"#));
    }

    #[test]
    fn test_details_that_do_not_fit_their_type_stay_untyped() {
        let log: DeploymentLog = serde_json::from_value(json!({
            "type": "APPLICATION_TEXT", "applicationName": "job", "severity": "WARNING",
            "timestamp": "2024-05-01T10:00:00Z", "details": "plain line"
        }))
        .unwrap();

        assert_eq!(log.log_type(), LogType::ApplicationText);
        assert_eq!(log.message(), Some("plain line"));
        assert_eq!(serde_json::to_value(&log).unwrap()["details"], "plain line");
    }

    #[test]
    fn test_page_keeps_every_entry() {
        let page: crate::models::LogPage = serde_json::from_value(json!({
            "data": [
                {"type": "APPLICATION_TEXT", "applicationName": "a", "severity": "INFO",
                 "timestamp": "2024-05-01T10:00:00Z", "details": {"message": "ok"}},
                {"type": "APPLICATION_JSON", "applicationName": "b", "severity": "INFO",
                 "timestamp": 1714557600, "details": {"message": {"orderId": "o-1"}}},
                "garbage"
            ],
            "next": "c2"
        }))
        .unwrap();

        assert_eq!(page.data.len(), 3);
        assert_eq!(page.data[1].timestamp, "1714557600");
        assert_eq!(page.data[2].message(), Some("garbage"));
        assert_eq!(page.next.as_deref(), Some("c2"));
    }

    #[test]
    fn test_preview_truncates_long_messages() {
        let log: DeploymentLog = serde_json::from_value(json!({
            "type": "APPLICATION_TEXT", "applicationName": "job", "severity": "INFO",
            "timestamp": "2024-05-01T10:00:00Z",
            "details": {"message": "a".repeat(60)}
        }))
        .unwrap();
        assert_eq!(log.preview(50), format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn test_filter_values_parse_case_insensitively() {
        assert_eq!("http_request".parse::<LogType>().unwrap(), LogType::HttpRequest);
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert!("loud".parse::<Severity>().is_err());
    }
}
