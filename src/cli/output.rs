//! Text rendering for hosts and services.

use crate::models::{CheckState, Host, Service, Status};
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

const HOST_WIDTH: usize = 25;
const SERVICE_WIDTH: usize = 35;
const OUTPUT_WIDTH: usize = 35;

/// Truncates to `width` characters, then pads to exactly `width`.
fn fit(text: &str, width: usize) -> String {
    let truncated: String = text.chars().take(width).collect();
    format!("{:<width$}", truncated, width = width)
}

/// Pads to at least `width` characters without cutting anything off.
fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

fn state_label(state: CheckState) -> ColoredString {
    match state {
        CheckState::Ok => state.as_str().green(),
        CheckState::Warning => state.as_str().yellow(),
        CheckState::Critical => state.as_str().red().bold(),
        CheckState::Unknown => state.as_str().magenta(),
    }
}

fn markers(status: &Status) -> String {
    let mut line = format!(
        "{}\t{}\t{}",
        state_label(status.current_state),
        if status.is_acknowledged() { "ACK" } else { " " },
        if status.is_muted() { "MUTED" } else { " " },
    );
    if status.in_downtime() {
        line.push_str("\tDOWNTIME");
    }
    line
}

pub fn host_line(host: &Host) -> String {
    format!(
        "{}\t{}\t{}",
        pad(&host.name, HOST_WIDTH),
        fit(&host.status.plugin_output, OUTPUT_WIDTH),
        markers(&host.status)
    )
}

pub fn service_line(service: &Service) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        pad(&service.host, HOST_WIDTH),
        fit(&service.name, SERVICE_WIDTH),
        fit(&service.status.plugin_output, OUTPUT_WIDTH),
        markers(&service.status)
    )
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "yes" } else { "no" };
    text.to_string()
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

/// Two-column attribute table for one host or service.
pub fn detail_table(host: &str, service: Option<&str>, status: &Status) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Attribute", "Value"]);

    table.add_row(vec!["host".to_string(), host.to_string()]);
    if let Some(service) = service {
        table.add_row(vec!["service".to_string(), service.to_string()]);
    }

    let rows = [
        ("state", status.current_state.to_string()),
        ("last hard state", status.last_hard_state.to_string()),
        ("output", status.plugin_output.clone()),
        ("performance data", status.performance_data.clone()),
        (
            "attempt",
            format!("{}/{}", status.current_attempt, status.max_attempts),
        ),
        ("acknowledged", yes_no(status.is_acknowledged())),
        ("notifications", yes_no(status.notifications_enabled)),
        ("active checks", yes_no(status.active_checks_enabled)),
        (
            "downtime depth",
            status.scheduled_downtime_depth.to_string(),
        ),
        ("last check", timestamp(status.last_check)),
        ("last state change", timestamp(status.last_state_change)),
        ("last notification", timestamp(status.last_notification)),
    ];
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Snapshot;
    use serde_json::json;
    use serial_test::serial;

    // Plain-text rendering for the duration of one test
    struct NoColor;

    impl NoColor {
        fn set() -> Self {
            colored::control::set_override(false);
            NoColor
        }
    }

    impl Drop for NoColor {
        fn drop(&mut self) {
            colored::control::unset_override();
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot::from_content(json!({
            "a-rather-long-hostname-that-overflows.example.com": {
                "current_state": "0",
                "plugin_output": "PING OK",
                "notifications_enabled": "1",
                "services": {
                    "http": {
                        "current_state": "2",
                        "plugin_output": "HTTP CRITICAL - connection refused on port 80 after 10s",
                        "notifications_enabled": "0",
                        "problem_has_been_acknowledged": "1",
                        "scheduled_downtime_depth": "2",
                        "last_check": "1700000000"
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_fit_truncates_and_pads_by_character() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdef", 3), "abc");
        assert_eq!(fit("ééééé", 3), "ééé");
    }

    #[test]
    fn test_pad_never_truncates() {
        assert_eq!(pad("db1", 5), "db1  ");
        assert_eq!(pad("a-long-host.example.com", 4), "a-long-host.example.com");
    }

    #[test]
    #[serial]
    fn test_service_line_columns() {
        let _plain = NoColor::set();
        let snapshot = snapshot();
        let service = snapshot.services().next().unwrap();

        let line = service_line(service);
        let columns: Vec<&str> = line.split('\t').collect();

        assert_eq!(columns.len(), 7);
        assert_eq!(
            columns[0],
            "a-rather-long-hostname-that-overflows.example.com"
        );
        assert_eq!(columns[1].trim_end(), "http");
        assert_eq!(columns[1].len(), SERVICE_WIDTH);
        assert_eq!(columns[2], "HTTP CRITICAL - connection refused ");
        assert_eq!(columns[3], "CRIT");
        assert_eq!(columns[4], "ACK");
        assert_eq!(columns[5], "MUTED");
        assert_eq!(columns[6], "DOWNTIME");
    }

    #[test]
    #[serial]
    fn test_host_line_without_markers() {
        let _plain = NoColor::set();
        let snapshot = snapshot();

        let line = host_line(&snapshot.hosts[0]);
        let columns: Vec<&str> = line.split('\t').collect();

        assert_eq!(columns.len(), 5);
        assert_eq!(
            columns[0],
            "a-rather-long-hostname-that-overflows.example.com"
        );
        assert_eq!(columns[1].trim_end(), "PING OK");
        assert_eq!(columns[2], "OK");
        assert_eq!(columns[3], " ");
        assert_eq!(columns[4], " ");
    }

    #[test]
    fn test_detail_table_lists_attributes() {
        let snapshot = snapshot();
        let service = snapshot.services().next().unwrap();

        let mut table = detail_table(&service.host, Some(&service.name), &service.status);
        table.set_width(200);
        let rendered = table.to_string();

        assert!(rendered.contains("downtime depth"));
        assert!(rendered.contains("2023-11-14 22:13:20 UTC"));
        assert!(rendered.contains("never"));
    }
}
