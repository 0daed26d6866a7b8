//! Command-line grammar.
//!
//! Arguments are recognised in a fixed order: object type, filter options, action,
//! action options. For example:
//!
//! ```text
//! ncli service -H '^web' -s http --problems ack -c "deploy in progress"
//! ncli host -H db1 downtime -d 2h -c "kernel upgrade" --services-too
//! ```

use crate::models::CheckState;
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

/// Command-line client for the Nagios JSON HTTP API
#[derive(Parser, Debug)]
#[command(name = "ncli", author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub object: ObjectCommand,
}

/// Options accepted anywhere on the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Base URL of nagios-api (overrides NCLI_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Ignore a fresh cache and fetch the state again
    #[arg(short, long, global = true)]
    pub refresh: bool,

    /// Neither read nor write the status cache
    #[arg(long, global = true, conflicts_with = "refresh")]
    pub no_cache: bool,

    /// How long a cached state stays fresh, e.g. 30s or 5m (overrides NCLI_CACHE_TTL)
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_duration)]
    pub cache_ttl: Option<Duration>,

    /// Show the requests that would be sent without sending them
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Do not ask for confirmation before changing many objects
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Print matched objects as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum ObjectCommand {
    /// Operate on hosts
    #[command(visible_aliases = ["h", "hosts"])]
    Host(HostArgs),

    /// Operate on services
    #[command(visible_aliases = ["s", "svc", "services"])]
    Service(ServiceArgs),
}

#[derive(Args, Debug)]
pub struct HostArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(subcommand)]
    pub action: Option<Action>,
}

#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Service name pattern
    #[arg(short, long, value_name = "REGEX")]
    pub service: Option<String>,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(subcommand)]
    pub action: Option<Action>,
}

/// Criteria shared by host and service selection.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Host name pattern
    #[arg(short = 'H', long, value_name = "REGEX")]
    pub host: Option<String>,

    /// Plugin output pattern
    #[arg(short, long, value_name = "REGEX")]
    pub output: Option<String>,

    /// Only objects in this state (ok, warn, crit, unk); repeatable
    #[arg(short = 'S', long, value_name = "STATE")]
    pub state: Vec<CheckState>,

    /// Only objects that are not OK
    #[arg(short, long)]
    pub problems: bool,

    /// Only acknowledged problems
    #[arg(long, conflicts_with = "unacked")]
    pub acked: bool,

    /// Only unacknowledged objects
    #[arg(long)]
    pub unacked: bool,

    /// Only objects with notifications disabled
    #[arg(long, conflicts_with = "unmuted")]
    pub muted: bool,

    /// Only objects with notifications enabled
    #[arg(long)]
    pub unmuted: bool,

    /// Only objects in scheduled downtime
    #[arg(long, conflicts_with = "no_downtime")]
    pub downtime: bool,

    /// Only objects not in scheduled downtime
    #[arg(long)]
    pub no_downtime: bool,

    /// Match patterns case-insensitively
    #[arg(short, long)]
    pub ignore_case: bool,
}

/// What to do with the matched objects. Defaults to `list`.
#[derive(Subcommand, Debug, Clone, PartialEq, Default)]
pub enum Action {
    /// One line per object
    #[default]
    #[command(visible_alias = "ls")]
    List,

    /// All attributes of each object
    #[command(visible_alias = "info")]
    Show,

    /// Acknowledge the current problem
    #[command(visible_alias = "acknowledge")]
    Ack(AckArgs),

    /// Remove an acknowledgement
    Unack,

    /// Disable notifications
    Mute,

    /// Enable notifications
    Unmute,

    /// Schedule downtime
    #[command(visible_alias = "dt")]
    Downtime(DowntimeArgs),

    /// Cancel scheduled downtime
    #[command(visible_alias = "undt")]
    Undowntime(UndowntimeArgs),

    /// Schedule an immediate check
    #[command(visible_alias = "check")]
    Recheck(RecheckArgs),

    /// Submit a passive check result
    Submit(SubmitArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct AckArgs {
    /// Acknowledgement comment
    #[arg(short, long)]
    pub comment: String,

    /// Clear the acknowledgement on any state change, not only on recovery
    #[arg(long)]
    pub no_sticky: bool,

    /// Send an acknowledgement notification
    #[arg(long)]
    pub notify: bool,

    /// Keep the comment across Nagios restarts
    #[arg(long)]
    pub persistent: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct DowntimeArgs {
    /// Length of the downtime, e.g. 90m, 2h, 1d
    #[arg(short, long, default_value = "2h", value_parser = parse_duration)]
    pub duration: Duration,

    /// Downtime comment
    #[arg(short, long)]
    pub comment: String,

    /// Delay before the downtime starts (default: now)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub start: Option<Duration>,

    /// Start the downtime when the object first goes down instead of at the start time
    #[arg(long)]
    pub flexible: bool,

    /// Also schedule downtime for every service on the host (hosts only)
    #[arg(long)]
    pub services_too: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct UndowntimeArgs {
    /// Also cancel downtime for every service on the host (hosts only)
    #[arg(long)]
    pub services_too: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct RecheckArgs {
    /// Check even if checks are disabled or one is already scheduled sooner
    #[arg(long)]
    pub forced: bool,

    /// Also check every service on the host (hosts only)
    #[arg(long)]
    pub all_services: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SubmitArgs {
    /// Result state (ok, warn, crit, unk)
    #[arg(long, value_name = "STATE")]
    pub status: CheckState,

    /// Plugin output to record
    #[arg(short, long)]
    pub message: String,
}

/// Parses a terse duration: digits with an optional `w`, `d`, `h`, `m` or `s` suffix.
/// A bare number is seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let invalid = || format!("invalid duration '{}' (expected e.g. 90, 30s, 5m, 2h, 1d, 1w)", input);

    let (digits, multiplier) = match input.chars().last() {
        Some(unit) if unit.is_ascii_alphabetic() => {
            let multiplier = match unit {
                'w' => 604_800,
                'd' => 86_400,
                'h' => 3_600,
                'm' => 60,
                's' => 1,
                _ => return Err(invalid()),
            };
            (&input[..input.len() - 1], multiplier)
        },
        _ => (input, 1),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(|value| value.checked_mul(multiplier))
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[rstest]
    #[case("90", 90)]
    #[case("0", 0)]
    #[case("30s", 30)]
    #[case("5m", 300)]
    #[case("2h", 7_200)]
    #[case("1d", 86_400)]
    #[case("2w", 1_209_600)]
    fn test_parse_duration(#[case] input: &str, #[case] secs: u64) {
        assert_eq!(parse_duration(input), Ok(Duration::from_secs(secs)));
    }

    #[rstest]
    #[case("")]
    #[case("h")]
    #[case("2H")]
    #[case("2y")]
    #[case("1.5h")]
    #[case("-3m")]
    #[case(" 5m")]
    #[case("99999999999999999999")]
    fn test_parse_duration_rejects(#[case] input: &str) {
        assert!(parse_duration(input).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_object_filters_action_order() {
        let cli = Cli::try_parse_from([
            "ncli", "service", "-H", "^web", "-s", "http", "-p", "ack", "-c", "on it", "--notify",
        ])
        .unwrap();

        let ObjectCommand::Service(args) = cli.object else {
            panic!("expected service object");
        };
        assert_eq!(args.service.as_deref(), Some("http"));
        assert_eq!(args.filter.host.as_deref(), Some("^web"));
        assert!(args.filter.problems);
        assert_eq!(
            args.action,
            Some(Action::Ack(AckArgs {
                comment: "on it".to_string(),
                no_sticky: false,
                notify: true,
                persistent: false,
            }))
        );
    }

    #[test]
    fn test_action_defaults_to_none_and_aliases_resolve() {
        let cli = Cli::try_parse_from(["ncli", "h", "-H", "db"]).unwrap();
        let ObjectCommand::Host(args) = cli.object else {
            panic!("expected host object");
        };
        assert_eq!(args.action, None);

        let cli = Cli::try_parse_from(["ncli", "svc", "dt", "-c", "maint"]).unwrap();
        let ObjectCommand::Service(args) = cli.object else {
            panic!("expected service object");
        };
        match args.action {
            Some(Action::Downtime(dt)) => {
                assert_eq!(dt.duration, Duration::from_secs(7_200));
                assert_eq!(dt.start, None);
            },
            other => panic!("expected downtime, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_accepted_after_object() {
        let cli = Cli::try_parse_from(["ncli", "service", "-S", "crit", "-S", "warn", "--json", "-r"])
            .unwrap();
        assert!(cli.global.json);
        assert!(cli.global.refresh);

        let ObjectCommand::Service(args) = cli.object else {
            panic!("expected service object");
        };
        assert_eq!(
            args.filter.state,
            vec![CheckState::Critical, CheckState::Warning]
        );
    }

    #[test]
    fn test_conflicting_filters_are_rejected() {
        assert!(Cli::try_parse_from(["ncli", "service", "--acked", "--unacked"]).is_err());
        assert!(Cli::try_parse_from(["ncli", "host", "--refresh", "--no-cache"]).is_err());
        assert!(Cli::try_parse_from(["ncli", "service", "ack"]).is_err());
    }
}
