//! Selection of hosts and services from a snapshot.
//!
//! Every configured criterion must hold for an object to be selected. Patterns are
//! unanchored regex searches; callers anchor with `^`/`$` when they need to.

use crate::cli::FilterArgs;
use crate::error::Result;
use crate::models::{CheckState, Host, Service, Snapshot, Status};
use regex::{Regex, RegexBuilder};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Filter {
    host: Option<Regex>,
    service: Option<Regex>,
    output: Option<Regex>,
    states: Vec<CheckState>,
    problems: bool,
    acknowledged: Option<bool>,
    muted: Option<bool>,
    downtime: Option<bool>,
}

impl Filter {
    /// Compiles the filter options. `service` is only meaningful for service objects.
    pub fn new(args: &FilterArgs, service: Option<&str>) -> Result<Self> {
        let ignore_case = args.ignore_case;
        Ok(Self {
            host: compile(args.host.as_deref(), ignore_case)?,
            service: compile(service, ignore_case)?,
            output: compile(args.output.as_deref(), ignore_case)?,
            states: args.state.clone(),
            problems: args.problems,
            acknowledged: tri_state(args.acked, args.unacked),
            muted: tri_state(args.muted, args.unmuted),
            downtime: tri_state(args.downtime, args.no_downtime),
        })
    }

    pub fn select_hosts<'a>(&self, snapshot: &'a Snapshot) -> Vec<&'a Host> {
        let hosts: Vec<&Host> = snapshot
            .hosts
            .iter()
            .filter(|h| is_match(&self.host, &h.name) && self.matches_status(&h.status))
            .collect();
        debug!("{} of {} hosts matched", hosts.len(), snapshot.hosts.len());
        hosts
    }

    pub fn select_services<'a>(&self, snapshot: &'a Snapshot) -> Vec<&'a Service> {
        let services: Vec<&Service> = snapshot
            .services()
            .filter(|s| {
                is_match(&self.host, &s.host)
                    && is_match(&self.service, &s.name)
                    && self.matches_status(&s.status)
            })
            .collect();
        debug!("{} services matched", services.len());
        services
    }

    fn matches_status(&self, status: &Status) -> bool {
        if !is_match(&self.output, &status.plugin_output) {
            return false;
        }
        if !self.states.is_empty() && !self.states.contains(&status.current_state) {
            return false;
        }
        if self.problems && !status.current_state.is_problem() {
            return false;
        }
        flag_matches(self.acknowledged, status.is_acknowledged())
            && flag_matches(self.muted, status.is_muted())
            && flag_matches(self.downtime, status.in_downtime())
    }
}

fn compile(pattern: Option<&str>, ignore_case: bool) -> Result<Option<Regex>> {
    pattern
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(ignore_case)
                .build()
                .map_err(Into::into)
        })
        .transpose()
}

fn is_match(pattern: &Option<Regex>, haystack: &str) -> bool {
    pattern.as_ref().map_or(true, |re| re.is_match(haystack))
}

fn tri_state(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

fn flag_matches(wanted: Option<bool>, actual: bool) -> bool {
    wanted.map_or(true, |w| w == actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn snapshot() -> Snapshot {
        Snapshot::from_content(json!({
            "web1": {
                "current_state": "0",
                "notifications_enabled": "1",
                "services": {
                    "HTTP": { "current_state": "2", "plugin_output": "HTTP CRITICAL - 503",
                              "notifications_enabled": "1", "problem_has_been_acknowledged": "1" },
                    "disk /": { "current_state": "0", "plugin_output": "DISK OK",
                                "notifications_enabled": "1" }
                }
            },
            "web2": {
                "current_state": "2",
                "notifications_enabled": "0",
                "scheduled_downtime_depth": "1",
                "services": {
                    "http": { "current_state": "1", "plugin_output": "HTTP WARNING - slow",
                              "notifications_enabled": "0" }
                }
            },
            "db1": {
                "current_state": "0",
                "notifications_enabled": "1",
                "services": {
                    "mysql": { "current_state": "3", "plugin_output": "connection refused",
                               "notifications_enabled": "1" }
                }
            }
        }))
        .unwrap()
    }

    fn service_names(selected: &[&Service]) -> Vec<String> {
        selected
            .iter()
            .map(|s| format!("{}/{}", s.host, s.name))
            .collect()
    }

    #[rstest]
    #[case(FilterArgs::default(), None, vec!["db1/mysql", "web1/HTTP", "web1/disk /", "web2/http"])]
    #[case(FilterArgs { host: Some("^web".into()), ..Default::default() }, Some("http"), vec!["web2/http"])]
    #[case(FilterArgs { host: Some("^web".into()), ignore_case: true, ..Default::default() }, Some("http"), vec!["web1/HTTP", "web2/http"])]
    #[case(FilterArgs { problems: true, ..Default::default() }, None, vec!["db1/mysql", "web1/HTTP", "web2/http"])]
    #[case(FilterArgs { state: vec![CheckState::Critical, CheckState::Unknown], ..Default::default() }, None, vec!["db1/mysql", "web1/HTTP"])]
    #[case(FilterArgs { acked: true, ..Default::default() }, None, vec!["web1/HTTP"])]
    #[case(FilterArgs { problems: true, unacked: true, ..Default::default() }, None, vec!["db1/mysql", "web2/http"])]
    #[case(FilterArgs { muted: true, ..Default::default() }, None, vec!["web2/http"])]
    #[case(FilterArgs { output: Some("refused|slow".into()), ..Default::default() }, None, vec!["db1/mysql", "web2/http"])]
    fn test_select_services(
        snapshot: Snapshot,
        #[case] args: FilterArgs,
        #[case] service: Option<&str>,
        #[case] expected: Vec<&str>,
    ) {
        let filter = Filter::new(&args, service).unwrap();
        assert_eq!(service_names(&filter.select_services(&snapshot)), expected);
    }

    #[rstest]
    #[case(FilterArgs::default(), vec!["db1", "web1", "web2"])]
    #[case(FilterArgs { host: Some("1$".into()), ..Default::default() }, vec!["db1", "web1"])]
    #[case(FilterArgs { downtime: true, ..Default::default() }, vec!["web2"])]
    #[case(FilterArgs { no_downtime: true, unmuted: true, ..Default::default() }, vec!["db1", "web1"])]
    fn test_select_hosts(
        snapshot: Snapshot,
        #[case] args: FilterArgs,
        #[case] expected: Vec<&str>,
    ) {
        let filter = Filter::new(&args, None).unwrap();
        let names: Vec<&str> = filter
            .select_hosts(&snapshot)
            .iter()
            .map(|h| h.name.as_str())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let args = FilterArgs {
            host: Some("web(".into()),
            ..Default::default()
        };
        assert!(matches!(Filter::new(&args, None), Err(AppError::Regex(_))));
    }

    #[test]
    fn test_tri_state() {
        assert_eq!(tri_state(true, false), Some(true));
        assert_eq!(tri_state(false, true), Some(false));
        assert_eq!(tri_state(false, false), None);
    }
}
