//! Provides a client for the nagios-api JSON HTTP interface.
//!
//! Every call is a single request. Responses are wrapped in a `{success, content}`
//! envelope; `success: false` carries the failure reason in `content`.

use crate::error::{AppError, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The object a command applies to. Without a service the command targets the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Target {
    pub fn host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            service: None,
        }
    }

    pub fn service(host: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            service: Some(service.into()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.service {
            Some(service) => write!(f, "{}/{}", self.host, service),
            None => f.write_str(&self.host),
        }
    }
}

/// Parameters for `/acknowledge_problem`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acknowledgement {
    pub comment: String,
    pub author: String,
    pub sticky: bool,
    pub notify: bool,
    pub persistent: bool,
}

/// Parameters for `/schedule_downtime`. `duration` is in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Downtime {
    pub author: String,
    pub comment: String,
    pub duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    pub fixed: bool,
    pub services_too: bool,
}

/// Parameters for `/schedule_check`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_time: Option<i64>,
    pub forced: bool,
    pub all_services: bool,
}

/// Parameters for `/submit_result`. `status` is the Nagios return code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSubmission {
    pub status: u8,
    pub output: String,
}

/// A state-changing nagios-api operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Acknowledge(Acknowledgement),
    RemoveAcknowledgement,
    DisableNotifications,
    EnableNotifications,
    ScheduleDowntime(Downtime),
    CancelDowntime { services_too: bool },
    ScheduleCheck(CheckRequest),
    SubmitResult(ResultSubmission),
}

impl Command {
    /// Endpoint path, relative to the API base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Command::Acknowledge(_) => "/acknowledge_problem",
            Command::RemoveAcknowledgement => "/remove_acknowledgement",
            Command::DisableNotifications => "/disable_notifications",
            Command::EnableNotifications => "/enable_notifications",
            Command::ScheduleDowntime(_) => "/schedule_downtime",
            Command::CancelDowntime { .. } => "/cancel_downtime",
            Command::ScheduleCheck(_) => "/schedule_check",
            Command::SubmitResult(_) => "/submit_result",
        }
    }

    /// Past-tense description used when reporting results.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Acknowledge(_) => "acknowledged",
            Command::RemoveAcknowledgement => "removed acknowledgement for",
            Command::DisableNotifications => "muted",
            Command::EnableNotifications => "unmuted",
            Command::ScheduleDowntime(_) => "scheduled downtime for",
            Command::CancelDowntime { .. } => "cancelled downtime for",
            Command::ScheduleCheck(_) => "scheduled check for",
            Command::SubmitResult(_) => "submitted result for",
        }
    }

    /// JSON request body: the target fields merged with the command parameters.
    pub fn body(&self, target: &Target) -> Result<Value> {
        let mut body = serde_json::to_value(target)?;
        let params = match self {
            Command::Acknowledge(ack) => serde_json::to_value(ack)?,
            Command::ScheduleDowntime(downtime) => serde_json::to_value(downtime)?,
            Command::CancelDowntime { services_too } => {
                serde_json::json!({ "services_too": services_too })
            },
            Command::ScheduleCheck(check) => serde_json::to_value(check)?,
            Command::SubmitResult(submission) => serde_json::to_value(submission)?,
            Command::RemoveAcknowledgement
            | Command::DisableNotifications
            | Command::EnableNotifications => Value::Null,
        };

        if let (Value::Object(fields), Value::Object(extra)) = (&mut body, params) {
            fields.extend(extra);
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    content: Value,
}

/// An asynchronous client for a nagios-api instance.
pub struct NagiosClient {
    client: Client,
    base_url: String,
}

impl NagiosClient {
    /// Creates a client for the API rooted at `base_url` (e.g. `http://nagios:6315`).
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("ncli/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches the full monitoring state (`GET /state`) and returns the raw `content`.
    pub async fn get_state(&self) -> Result<Value> {
        let url = format!("{}/state", self.base_url);
        info!("Fetching monitoring state from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            error!("Error fetching state from {}: {}", url, e);
            AppError::from(e)
        })?;

        read_envelope(response).await
    }

    /// Sends `command` for `target` as a single `POST`.
    pub async fn execute(&self, command: &Command, target: &Target) -> Result<Value> {
        let url = format!("{}{}", self.base_url, command.endpoint());
        let body = command.body(target)?;
        info!("POST {} for {}", command.endpoint(), target);
        debug!("Request body: {}", body);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Error sending {} for {}: {}", command.endpoint(), target, e);
                AppError::from(e)
            })?;

        read_envelope(response).await
    }
}

/// Unwraps the `{success, content}` envelope, falling back to the HTTP status when
/// the body is not an envelope at all.
async fn read_envelope(response: Response) -> Result<Value> {
    let status = response.status();
    let url = response.url().to_string();
    let bytes = response.bytes().await?;

    match serde_json::from_slice::<Envelope>(&bytes) {
        Ok(envelope) if envelope.success => {
            debug!("{} succeeded with status {}", url, status);
            Ok(envelope.content)
        },
        Ok(envelope) => {
            let message = match envelope.content {
                Value::String(message) => message,
                Value::Null => format!("request failed with status {}", status),
                other => other.to_string(),
            };
            error!("nagios-api rejected request to {}: {}", url, message);
            Err(AppError::Nagios(message))
        },
        Err(e) if !status.is_success() => {
            error!("Request to {} failed with status {}: {}", url, status, e);
            Err(AppError::Http {
                status: status.as_u16(),
                url,
            })
        },
        Err(e) => {
            error!("Error parsing response from {}: {}", url, e);
            Err(e.into())
        },
    }
}
