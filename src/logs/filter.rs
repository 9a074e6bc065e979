use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::models::{DeploymentLog, LogDetails, LogType, Severity};

/// Key of the single group produced when grouping is disabled.
pub const UNGROUPED: &str = "all";

// ── Filters ────────────────────────────────────────────────────

/// Either "no constraint" (`all`) or one specific value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: PartialEq> Selection<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(expected) => expected == value,
        }
    }
}

impl<T: FromStr<Err = String>> FromStr for Selection<T> {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case(UNGROUPED) {
            Ok(Selection::All)
        } else {
            s.parse().map(Selection::Only)
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("all"),
            Selection::Only(v) => v.fmt(f),
        }
    }
}

pub type TypeFilter = Selection<LogType>;
pub type SeverityFilter = Selection<Severity>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub log_type: TypeFilter,
    pub severity: SeverityFilter,
    /// Case-sensitive substring of the log message.
    pub search: Option<String>,
}

impl LogFilter {
    pub fn matches(&self, log: &DeploymentLog) -> bool {
        if !self.log_type.matches(&log.log_type()) || !self.severity.matches(&log.severity) {
            return false;
        }
        match self.search.as_deref().filter(|q| !q.is_empty()) {
            Some(q) => log.message().is_some_and(|m| m.contains(q)),
            None => true,
        }
    }
}

/// Logs matching every constraint of `filter`, payload-normalized.
pub fn filter_logs(logs: &[DeploymentLog], filter: &LogFilter) -> Vec<DeploymentLog> {
    logs.iter()
        .filter(|log| filter.matches(log))
        .cloned()
        .map(|mut log| {
            normalize_payload(&mut log);
            log
        })
        .collect()
}

/// Collapse a `jsonMessage` that is not actually JSON into a plain `log`
/// line: `payload.log = message + jsonMessage`, both source fields removed.
/// Returns whether the payload was rewritten.
pub fn normalize_payload(log: &mut DeploymentLog) -> bool {
    let details = match &mut log.details {
        LogDetails::ApplicationText(d) | LogDetails::ApplicationJson(d) => d,
        LogDetails::HttpRequest(_) | LogDetails::Other { .. } => return false,
    };
    let Some(payload) = details.payload_object_mut() else {
        return false;
    };
    let Some(Value::String(json_message)) = payload.get("jsonMessage") else {
        return false;
    };
    if json_message.is_empty() || serde_json::from_str::<Value>(json_message).is_ok() {
        return false;
    }

    let prefix = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let line = format!("{}{}", prefix, json_message);
    payload.remove("message");
    payload.remove("jsonMessage");
    payload.insert("log".into(), Value::String(line));
    true
}

// ── Grouping ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroup {
    pub application_name: String,
    pub logs: Vec<DeploymentLog>,
}

/// Bucket logs by application in first-seen order. With grouping disabled
/// everything lands in one group keyed [`UNGROUPED`].
pub fn group_by_application(logs: Vec<DeploymentLog>, enabled: bool) -> Vec<LogGroup> {
    if !enabled {
        return vec![LogGroup {
            application_name: UNGROUPED.to_string(),
            logs,
        }];
    }

    let mut groups: Vec<LogGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for log in logs {
        match index.get(&log.application_name) {
            Some(&i) => groups[i].logs.push(log),
            None => {
                index.insert(log.application_name.clone(), groups.len());
                groups.push(LogGroup {
                    application_name: log.application_name.clone(),
                    logs: vec![log],
                });
            }
        }
    }
    groups
}

// ── Sorting ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Timestamp,
    Type,
    ApplicationName,
    Severity,
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timestamp" => Ok(SortColumn::Timestamp),
            "type" => Ok(SortColumn::Type),
            "applicationName" | "application" => Ok(SortColumn::ApplicationName),
            "severity" => Ok(SortColumn::Severity),
            other => Err(format!("unknown sort column: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {}", other)),
        }
    }
}

/// Stable in-place sort. Unparseable timestamps compare as raw strings.
pub fn sort_logs(logs: &mut [DeploymentLog], column: SortColumn, direction: SortDirection) {
    logs.sort_by(|a, b| {
        let ord = compare(a, b, column);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

fn compare(a: &DeploymentLog, b: &DeploymentLog, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Timestamp => match (a.timestamp_utc(), b.timestamp_utc()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.timestamp.cmp(&b.timestamp),
        },
        SortColumn::Type => a.log_type().as_str().cmp(b.log_type().as_str()),
        SortColumn::ApplicationName => a.application_name.cmp(&b.application_name),
        SortColumn::Severity => a.severity.rank().cmp(&b.severity.rank()),
    }
}
