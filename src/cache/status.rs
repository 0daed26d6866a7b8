//! Persists the `/state` snapshot to a JSON file with a time-based expiry.
//!
//! The file stores the raw API content next to the time it was fetched, so a cached
//! snapshot is parsed exactly like a fresh one.

use crate::api::NagiosClient;
use crate::error::Result;
use crate::models::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How the cache participates in a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve a fresh file, otherwise fetch and rewrite it.
    Use,
    /// Always fetch, then rewrite the file.
    Refresh,
    /// Always fetch and never touch the file.
    Disabled,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    fetched_at: DateTime<Utc>,
    content: Value,
}

/// File-backed cache of the monitoring snapshot.
pub struct StatusCache {
    path: PathBuf,
    ttl: Duration,
    policy: CachePolicy,
}

impl StatusCache {
    pub fn new(path: PathBuf, ttl: Duration, policy: CachePolicy) -> Self {
        Self { path, ttl, policy }
    }

    /// `<user cache dir>/ncli/status.json`, if the platform has a cache directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("ncli").join("status.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the snapshot, from disk when fresh and from nagios-api otherwise.
    pub async fn load(&self, client: &NagiosClient) -> Result<Snapshot> {
        let now = Utc::now();

        if self.policy == CachePolicy::Use {
            if let Some(snapshot) = self.read_fresh(now) {
                info!("Using cached state from {}", self.path.display());
                return Ok(snapshot);
            }
        }

        let content = client.get_state().await?;
        // Only content that parses is ever written back
        let snapshot = Snapshot::from_content(content.clone())?;

        if self.policy != CachePolicy::Disabled {
            // A cache we cannot write only costs us a refetch next time
            if let Err(e) = self.write(&content, now) {
                warn!("Could not write cache {}: {}", self.path.display(), e);
            }
        }

        Ok(snapshot)
    }

    /// Removes the cache file so the next invocation refetches.
    pub fn invalidate(&self) -> Result<()> {
        if self.policy == CachePolicy::Disabled {
            return Ok(());
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Invalidated cache {}", self.path.display());
                Ok(())
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_fresh(&self, now: DateTime<Utc>) -> Option<Snapshot> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache at {}", self.path.display());
                return None;
            },
            Err(e) => {
                warn!("Could not read cache {}: {}", self.path.display(), e);
                return None;
            },
        };

        let file: CacheFile = match serde_json::from_slice(&raw) {
            Ok(file) => file,
            Err(e) => {
                warn!("Ignoring corrupt cache {}: {}", self.path.display(), e);
                return None;
            },
        };

        if !is_fresh(file.fetched_at, now, self.ttl) {
            debug!("Cache fetched at {} is stale", file.fetched_at);
            return None;
        }

        match Snapshot::from_content(file.content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Ignoring malformed cache {}: {}", self.path.display(), e);
                None
            },
        }
    }

    fn write(&self, content: &Value, now: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = CacheFile {
            fetched_at: now,
            content: content.clone(),
        };
        let tmp = self.path.with_extension("json.tmp");
        let written = fs::write(&tmp, serde_json::to_vec(&file)?)
            .and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!("Wrote cache {}", self.path.display());
        Ok(())
    }
}

/// A snapshot is fresh when it is younger than `ttl`. Timestamps from the future are stale.
fn is_fresh(fetched_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match (now - fetched_at).to_std() {
        Ok(age) => age < ttl,
        Err(_) => false,
    }
}
