//! Data structures for the nagios-api `/state` snapshot.
//!
//! nagios-api mirrors Nagios' `status.dat`, so nearly every attribute arrives as a
//! string (`"current_state": "2"`, `"notifications_enabled": "0"`). The types here
//! accept either strings or native JSON values and normalise them into typed fields.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Result of the most recent check of a host or service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckState {
    Ok,
    Warning,
    Critical,
    #[default]
    Unknown,
}

impl CheckState {
    /// Maps a Nagios return code onto a state. Codes outside 0..=3 are `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => CheckState::Ok,
            1 => CheckState::Warning,
            2 => CheckState::Critical,
            3 => CheckState::Unknown,
            other => {
                debug!("Unexpected state code {}, treating as UNK", other);
                CheckState::Unknown
            },
        }
    }

    /// The Nagios return code for this state.
    pub fn code(self) -> u8 {
        match self {
            CheckState::Ok => 0,
            CheckState::Warning => 1,
            CheckState::Critical => 2,
            CheckState::Unknown => 3,
        }
    }

    /// Short label used in listings.
    pub fn as_str(self) -> &'static str {
        match self {
            CheckState::Ok => "OK",
            CheckState::Warning => "WARN",
            CheckState::Critical => "CRIT",
            CheckState::Unknown => "UNK",
        }
    }

    pub fn is_problem(self) -> bool {
        self != CheckState::Ok
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "ok" => Ok(CheckState::Ok),
            "1" | "warn" | "warning" => Ok(CheckState::Warning),
            "2" | "crit" | "critical" => Ok(CheckState::Critical),
            "3" | "unk" | "unknown" => Ok(CheckState::Unknown),
            other => Err(format!(
                "unknown state '{}' (expected one of: ok, warn, crit, unk)",
                other
            )),
        }
    }
}

impl Serialize for CheckState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CheckState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<loose::Loose>::deserialize(deserializer)?;
        Ok(match raw {
            Some(value) => match value.as_i64() {
                Some(code) => CheckState::from_code(code),
                None => value.as_text().parse().unwrap_or_default(),
            },
            None => CheckState::Unknown,
        })
    }
}

/// Lenient field decoders for values that may be strings, numbers, bools or null.
mod loose {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum Loose {
        Bool(bool),
        Int(i64),
        Float(f64),
        Text(String),
    }

    impl Loose {
        pub(super) fn as_i64(&self) -> Option<i64> {
            match self {
                Loose::Bool(b) => Some(i64::from(*b)),
                Loose::Int(i) => Some(*i),
                Loose::Float(f) => Some(f.trunc() as i64),
                Loose::Text(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                },
            }
        }

        pub(super) fn as_text(&self) -> String {
            match self {
                Loose::Bool(b) => b.to_string(),
                Loose::Int(i) => i.to_string(),
                Loose::Float(f) => f.to_string(),
                Loose::Text(s) => s.clone(),
            }
        }

        fn as_bool(&self) -> bool {
            match self {
                Loose::Bool(b) => *b,
                Loose::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" => true,
                    _ => self.as_i64().unwrap_or(0) != 0,
                },
                _ => self.as_i64().unwrap_or(0) != 0,
            }
        }
    }

    pub(super) fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(Option::<Loose>::deserialize(d)?
            .map(|v| v.as_text())
            .unwrap_or_default())
    }

    pub(super) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(Option::<Loose>::deserialize(d)?
            .map(|v| v.as_bool())
            .unwrap_or(false))
    }

    pub(super) fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(Option::<Loose>::deserialize(d)?
            .and_then(|v| v.as_i64())
            .map(|n| n.clamp(0, i64::from(u32::MAX)) as u32)
            .unwrap_or(0))
    }

    /// Epoch seconds; `0` is how Nagios spells "never".
    pub(super) fn timestamp<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<Loose>::deserialize(d)?
            .and_then(|v| v.as_i64())
            .filter(|secs| *secs > 0)
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)))
    }
}

/// Monitoring attributes shared by hosts and services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub current_state: CheckState,
    #[serde(deserialize_with = "loose::text")]
    pub plugin_output: String,
    #[serde(deserialize_with = "loose::flag")]
    pub notifications_enabled: bool,
    #[serde(deserialize_with = "loose::timestamp")]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "loose::timestamp")]
    pub last_notification: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "loose::flag")]
    pub active_checks_enabled: bool,
    #[serde(deserialize_with = "loose::flag")]
    pub problem_has_been_acknowledged: bool,
    pub last_hard_state: CheckState,
    #[serde(deserialize_with = "loose::count")]
    pub scheduled_downtime_depth: u32,
    #[serde(deserialize_with = "loose::text")]
    pub performance_data: String,
    #[serde(deserialize_with = "loose::timestamp")]
    pub last_state_change: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "loose::count")]
    pub current_attempt: u32,
    #[serde(deserialize_with = "loose::count")]
    pub max_attempts: u32,
}

impl Status {
    pub fn is_acknowledged(&self) -> bool {
        self.problem_has_been_acknowledged
    }

    pub fn is_muted(&self) -> bool {
        !self.notifications_enabled
    }

    pub fn in_downtime(&self) -> bool {
        self.scheduled_downtime_depth > 0
    }
}

/// Host entry as it appears in the `/state` payload.
#[derive(Debug, Deserialize)]
struct RawHost {
    #[serde(flatten)]
    status: Status,
    #[serde(default)]
    services: BTreeMap<String, Status>,
}

/// A monitored host together with its services.
#[derive(Debug, Clone, Serialize)]
pub struct Host {
    #[serde(rename = "host")]
    pub name: String,
    #[serde(flatten)]
    pub status: Status,
    #[serde(skip)]
    pub services: Vec<Service>,
}

/// A monitored service, always attached to a host.
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub host: String,
    #[serde(rename = "service")]
    pub name: String,
    #[serde(flatten)]
    pub status: Status,
}

/// Full monitoring state at one point in time, hosts ordered by name.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub hosts: Vec<Host>,
}

impl Snapshot {
    /// Builds a snapshot from the `content` of a `/state` response.
    pub fn from_content(content: serde_json::Value) -> Result<Self> {
        if content.is_null() {
            return Ok(Self::default());
        }

        let raw: BTreeMap<String, RawHost> = serde_json::from_value(content)?;
        let hosts = raw
            .into_iter()
            .map(|(name, raw_host)| {
                let services = raw_host
                    .services
                    .into_iter()
                    .map(|(service, status)| Service {
                        host: name.clone(),
                        name: service,
                        status,
                    })
                    .collect();
                Host {
                    name,
                    status: raw_host.status,
                    services,
                }
            })
            .collect::<Vec<_>>();

        debug!("Parsed snapshot with {} hosts", hosts.len());
        Ok(Self { hosts })
    }

    /// All services, grouped by host in host order.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.hosts.iter().flat_map(|h| h.services.iter())
    }

    #[cfg(test)]
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.name == name)
    }
}
