//! Tab-separated table formatting for CLI output.

use crate::auth::TenantId;
use crate::logs::{LogGroup, UNGROUPED};
use crate::models::{CustomObject, Deployment, LogStats, PagedResponse};

/// Width of the message column in log tables.
const PREVIEW_CHARS: usize = 100;

pub fn format_tenants(tenants: &[TenantId], active: Option<&TenantId>) -> String {
    if tenants.is_empty() {
        return "No project keys configured.\n".to_string();
    }
    let mut output = String::from("Active\tProject key\n");
    for tenant in tenants {
        let marker = if Some(tenant) == active { "*" } else { "" };
        output.push_str(&format!("{}\t{}\n", marker, tenant));
    }
    output
}

pub fn format_deployments(page: &PagedResponse<Deployment>) -> String {
    if page.results.is_empty() {
        return "No deployments found.\n".to_string();
    }
    let mut output = String::from("Key\tStatus\tType\tRegion\tVersion\tApplications\n");
    for d in &page.results {
        output.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\n",
            d.key,
            d.status,
            d.deployment_type,
            d.deployed_region,
            d.version,
            d.application_names().join(",")
        ));
    }
    output.push_str(&format!("Showing {} of {}\n", page.results.len(), page.total));
    output
}

pub fn format_deployment(d: &Deployment) -> String {
    let mut output = format!(
        "Key:          {}\nID:           {}\nStatus:       {}\nVersion:      {}\n",
        d.key, d.id, d.status, d.version
    );
    if !d.deployed_region.is_empty() {
        output.push_str(&format!("Region:       {}\n", d.deployed_region));
    }
    if let Some(connector) = &d.connector {
        output.push_str(&format!(
            "Connector:    {} {}\n",
            connector.key,
            connector.version.as_deref().unwrap_or("")
        ));
    }
    let apps = d.application_names();
    output.push_str(&format!(
        "Applications: {}\n",
        if apps.is_empty() {
            "-".to_string()
        } else {
            apps.join(", ")
        }
    ));
    output
}

pub fn format_log_groups(groups: &[LogGroup]) -> String {
    if groups.iter().all(|g| g.logs.is_empty()) {
        return "No logs found.\n".to_string();
    }
    let mut output = String::new();
    let titled = groups.len() > 1
        || groups
            .first()
            .is_some_and(|g| g.application_name != UNGROUPED);
    for group in groups {
        if titled {
            output.push_str(&format!("== {} ({}) ==\n", group.application_name, group.logs.len()));
        }
        output.push_str("Time\tSeverity\tType\tApplication\tMessage\n");
        for log in &group.logs {
            output.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                log.timestamp,
                log.severity,
                log.log_type(),
                log.application_name,
                log.preview(PREVIEW_CHARS).replace(['\t', '\n'], " ")
            ));
        }
    }
    output
}

pub fn format_stats(stats: &LogStats) -> String {
    let mut output = format!(
        "Total logs:        {}\nAvg response time: {:.1} ms\n",
        stats.total_logs, stats.avg_response_time
    );
    if !stats.last_updated.is_empty() {
        output.push_str(&format!("Last updated:      {}\n", stats.last_updated));
    }
    output.push_str("\nType\tCount\n");
    for (log_type, count) in &stats.by_type {
        output.push_str(&format!("{}\t{}\n", log_type, count));
    }
    output.push_str("\nSeverity\tCount\n");
    for (severity, count) in &stats.by_severity {
        output.push_str(&format!("{}\t{}\n", severity, count));
    }
    output
}

pub fn format_custom_objects(page: &PagedResponse<CustomObject>) -> String {
    if page.results.is_empty() {
        return "No custom objects found.\n".to_string();
    }
    let mut output = String::from("Container\tKey\tVersion\tLast modified\n");
    for obj in &page.results {
        output.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            obj.container,
            obj.key,
            obj.version,
            obj.last_modified_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string())
        ));
    }
    output.push_str(&format!(
        "Showing {}-{} of {}\n",
        page.offset + 1,
        page.offset + page.results.len() as u64,
        page.total
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::group_by_application;
    use serde_json::json;

    #[test]
    fn test_tenants_marks_active() {
        let tenants = vec![TenantId::from("shop-dev"), TenantId::from("shop-prod")];
        let out = format_tenants(&tenants, Some(&tenants[1]));
        assert_eq!(out, "Active\tProject key\n\tshop-dev\n*\tshop-prod\n");
    }

    #[test]
    fn test_log_table_flattens_multiline_messages() {
        let logs = serde_json::from_value(json!([{
            "type": "APPLICATION_TEXT", "applicationName": "api", "severity": "WARNING",
            "timestamp": "2024-05-01T10:00:00Z", "details": {"message": "line one\nline two"}
        }]))
        .unwrap();
        let out = format_log_groups(&group_by_application(logs, false));
        assert_eq!(
            out,
            "Time\tSeverity\tType\tApplication\tMessage\n\
             2024-05-01T10:00:00Z\tWARNING\tAPPLICATION_TEXT\tapi\tline one line two\n"
        );
    }

    #[test]
    fn test_empty_tables() {
        assert_eq!(format_log_groups(&group_by_application(vec![], false)), "No logs found.\n");
        assert_eq!(
            format_custom_objects(&PagedResponse::empty()),
            "No custom objects found.\n"
        );
        assert_eq!(format_deployments(&PagedResponse::empty()), "No deployments found.\n");
        assert_eq!(format_tenants(&[], None), "No project keys configured.\n");
    }
}
