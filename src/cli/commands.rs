use super::args::{Action, GlobalArgs, ObjectCommand};
use super::output;
use crate::api::{
    Acknowledgement, CheckRequest, Command, Downtime, NagiosClient, ResultSubmission, Target,
};
use crate::cache::{CachePolicy, StatusCache};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::filter::Filter;
use crate::models::{Host, Service, Snapshot};
use chrono::{DateTime, Utc};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::io::IsTerminal;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Mutating actions matching more objects than this ask before sending anything.
pub const CONFIRM_THRESHOLD: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    Host,
    Service,
}

impl ObjectKind {
    fn plural(self) -> &'static str {
        match self {
            ObjectKind::Host => "hosts",
            ObjectKind::Service => "services",
        }
    }
}

/// Objects picked out of a snapshot by the filter.
enum Selection<'a> {
    Hosts(Vec<&'a Host>),
    Services(Vec<&'a Service>),
}

impl<'a> Selection<'a> {
    fn select(kind: ObjectKind, filter: &Filter, snapshot: &'a Snapshot) -> Self {
        match kind {
            ObjectKind::Host => Selection::Hosts(filter.select_hosts(snapshot)),
            ObjectKind::Service => Selection::Services(filter.select_services(snapshot)),
        }
    }

    fn len(&self) -> usize {
        match self {
            Selection::Hosts(hosts) => hosts.len(),
            Selection::Services(services) => services.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn targets(&self) -> Vec<Target> {
        match self {
            Selection::Hosts(hosts) => hosts.iter().map(|h| Target::host(&h.name)).collect(),
            Selection::Services(services) => services
                .iter()
                .map(|s| Target::service(&s.host, &s.name))
                .collect(),
        }
    }
}

/// Translates an action into the nagios-api command it sends, if any.
///
/// Read-only actions (`list`, `show`) yield `None`. Options that only make sense for
/// hosts are rejected for services here, before any request is made.
fn build_command(
    action: &Action,
    kind: ObjectKind,
    author: &str,
    now: DateTime<Utc>,
) -> Result<Option<Command>> {
    let host_only = |flag: bool, name: &str| -> Result<()> {
        if flag && kind == ObjectKind::Service {
            return Err(AppError::Cli(format!("{} only applies to hosts", name)));
        }
        Ok(())
    };

    let command = match action {
        Action::List | Action::Show => return Ok(None),
        Action::Ack(args) => Command::Acknowledge(Acknowledgement {
            comment: args.comment.clone(),
            author: author.to_string(),
            sticky: !args.no_sticky,
            notify: args.notify,
            persistent: args.persistent,
        }),
        Action::Unack => Command::RemoveAcknowledgement,
        Action::Mute => Command::DisableNotifications,
        Action::Unmute => Command::EnableNotifications,
        Action::Downtime(args) => {
            host_only(args.services_too, "--services-too")?;
            if args.duration.is_zero() {
                return Err(AppError::Cli(
                    "downtime duration must be greater than zero".to_string(),
                ));
            }
            let start_time = match args.start {
                Some(delay) => Some(start_after(now, delay)?),
                None => None,
            };
            Command::ScheduleDowntime(Downtime {
                author: author.to_string(),
                comment: args.comment.clone(),
                duration: args.duration.as_secs(),
                start_time,
                fixed: !args.flexible,
                services_too: args.services_too,
            })
        },
        Action::Undowntime(args) => {
            host_only(args.services_too, "--services-too")?;
            Command::CancelDowntime {
                services_too: args.services_too,
            }
        },
        Action::Recheck(args) => {
            host_only(args.all_services, "--all-services")?;
            Command::ScheduleCheck(CheckRequest {
                check_time: None,
                forced: args.forced,
                all_services: args.all_services,
            })
        },
        Action::Submit(args) => Command::SubmitResult(ResultSubmission {
            status: args.status.code(),
            output: args.message.clone(),
        }),
    };

    Ok(Some(command))
}

/// Epoch seconds `delay` after `now`.
fn start_after(now: DateTime<Utc>, delay: Duration) -> Result<i64> {
    i64::try_from(delay.as_secs())
        .ok()
        .and_then(|secs| now.timestamp().checked_add(secs))
        .ok_or_else(|| AppError::Cli("downtime start is out of range".to_string()))
}

/// Asks the user whether to go ahead; receives the prompt text.
type Confirmer = fn(&str) -> Result<bool>;

fn prompt_confirm(prompt: &str) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        return Err(AppError::Cli(
            "refusing to change that many objects without a terminal to confirm on; pass --yes"
                .to_string(),
        ));
    }

    let answer = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    Ok(answer)
}

/// CLI application
pub struct App {
    global: GlobalArgs,
    config: Config,
    client: NagiosClient,
    cache: StatusCache,
    confirmer: Confirmer,
}

impl App {
    /// Create a new CLI application
    pub fn new(config: Config, global: GlobalArgs) -> Result<Self> {
        let policy = if global.no_cache {
            CachePolicy::Disabled
        } else if global.refresh {
            CachePolicy::Refresh
        } else {
            CachePolicy::Use
        };

        let client = NagiosClient::new(&config.url)?;
        let cache = StatusCache::new(config.cache_path.clone(), config.cache_ttl, policy);
        debug!(
            "Status cache at {} ({:?})",
            cache.path().display(),
            policy
        );

        Ok(Self {
            global,
            config,
            client,
            cache,
            confirmer: prompt_confirm,
        })
    }

    /// Run one command line: select objects, then list them or apply the action.
    pub async fn run(&self, object: ObjectCommand) -> Result<()> {
        let (kind, filter, action) = match object {
            ObjectCommand::Host(args) => (
                ObjectKind::Host,
                Filter::new(&args.filter, None)?,
                args.action.unwrap_or_default(),
            ),
            ObjectCommand::Service(args) => (
                ObjectKind::Service,
                Filter::new(&args.filter, args.service.as_deref())?,
                args.action.unwrap_or_default(),
            ),
        };

        let command = build_command(&action, kind, &self.config.author, Utc::now())?;

        let snapshot = self.cache.load(&self.client).await?;
        let selection = Selection::select(kind, &filter, &snapshot);
        info!("{} {} matched", selection.len(), kind.plural());

        match command {
            Some(command) => self.apply(&command, kind, selection.targets()).await,
            None => self.render(&action, kind, &selection),
        }
    }

    /// Print the selection for the read-only actions.
    fn render(&self, action: &Action, kind: ObjectKind, selection: &Selection) -> Result<()> {
        if self.global.json {
            let json = match selection {
                Selection::Hosts(hosts) => serde_json::to_string_pretty(hosts)?,
                Selection::Services(services) => serde_json::to_string_pretty(services)?,
            };
            println!("{}", json);
            return Ok(());
        }

        if selection.is_empty() {
            println!("{}", format!("No matching {}", kind.plural()).yellow());
            return Ok(());
        }

        match (action, selection) {
            (Action::Show, Selection::Hosts(hosts)) => {
                for host in hosts {
                    println!("{}", output::detail_table(&host.name, None, &host.status));
                }
            },
            (Action::Show, Selection::Services(services)) => {
                for service in services {
                    println!(
                        "{}",
                        output::detail_table(&service.host, Some(&service.name), &service.status)
                    );
                }
            },
            (_, Selection::Hosts(hosts)) => {
                for host in hosts {
                    println!("{}", output::host_line(host));
                }
            },
            (_, Selection::Services(services)) => {
                for service in services {
                    println!("{}", output::service_line(service));
                }
            },
        }

        Ok(())
    }

    /// Send `command` once per target, in order.
    ///
    /// A failing target does not stop the loop; the call fails afterwards if any
    /// request failed. The cache is invalidated once anything has changed.
    async fn apply(&self, command: &Command, kind: ObjectKind, targets: Vec<Target>) -> Result<()> {
        if targets.is_empty() {
            println!(
                "{}",
                format!("No matching {}, nothing to do", kind.plural()).yellow()
            );
            return Ok(());
        }

        if self.global.dry_run {
            for target in &targets {
                println!(
                    "would POST {} {}",
                    command.endpoint(),
                    command.body(target)?
                );
            }
            return Ok(());
        }

        if targets.len() > CONFIRM_THRESHOLD
            && !self.global.yes
            && !self.confirm(command, &targets)?
        {
            println!("{}", "Aborted, nothing was sent.".yellow());
            return Ok(());
        }

        let mut failures = 0;
        for target in &targets {
            match self.client.execute(command, target).await {
                Ok(_) => println!("{} {}", command.verb(), target),
                Err(e) => {
                    failures += 1;
                    error!("{} failed for {}: {}", command.endpoint(), target, e);
                    eprintln!("{} {}: {}", "failed".red(), target, e);
                },
            }
        }

        if failures < targets.len() {
            if let Err(e) = self.cache.invalidate() {
                warn!("Could not invalidate status cache: {}", e);
            }
        }

        if failures > 0 {
            return Err(AppError::Cli(format!(
                "{} of {} requests failed",
                failures,
                targets.len()
            )));
        }

        Ok(())
    }

    fn confirm(&self, command: &Command, targets: &[Target]) -> Result<bool> {
        let prompt = format!(
            "{} will be sent for {} objects. Continue?",
            command.endpoint(),
            targets.len()
        );
        (self.confirmer)(&prompt)
    }
}
