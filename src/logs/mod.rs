//! Paging, filtering and grouping of deployment logs.

pub mod filter;
pub mod pagination;

pub use filter::{
    filter_logs, group_by_application, normalize_payload, sort_logs, LogFilter, LogGroup,
    Selection, SeverityFilter, SortColumn, SortDirection, TypeFilter, UNGROUPED,
};
pub use pagination::{collect_pages, merge_next_page, LogFeed, PageRequest, PageSource};

use serde::Serialize;

use crate::models::{DeploymentLog, LogStats};

/// How accumulated logs are turned into a view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewOptions {
    pub filter: LogFilter,
    pub sort: SortColumn,
    pub direction: SortDirection,
    pub group: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogView {
    pub groups: Vec<LogGroup>,
    /// Logs left after filtering.
    pub matched: usize,
    /// Stats over the filtered logs.
    pub stats: LogStats,
}

/// filter → normalize → sort → group.
pub fn build_view(logs: &[DeploymentLog], options: &ViewOptions) -> LogView {
    let mut filtered = filter_logs(logs, &options.filter);
    sort_logs(&mut filtered, options.sort, options.direction);
    let stats = LogStats::from_logs(&filtered);
    let matched = filtered.len();
    LogView {
        groups: group_by_application(filtered, options.group),
        matched,
        stats,
    }
}
