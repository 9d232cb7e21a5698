//! Configuration for the node operator.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use ebsop_reconcile::{
    backoff::{DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX},
    ReconcilerSettings, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RESOURCE_NAME,
};

/// Node operator configuration (env-driven).
#[derive(Debug, Clone)]
pub struct Config {
    /// Extended resource to manage.
    pub resource_name: String,

    /// Deadline for each API call made while reconciling.
    pub request_timeout: Duration,

    /// First requeue delay after a failed reconcile.
    pub backoff_base: Duration,

    /// Requeue delay cap.
    pub backoff_max: Duration,

    /// Requeue successfully reconciled nodes after this long.
    pub resync_interval: Option<Duration>,

    /// Only watch nodes matching this label selector.
    pub node_label_selector: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resource_name: DEFAULT_RESOURCE_NAME.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
            resync_interval: None,
            node_label_selector: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resource_name = lookup("EBSOP_RESOURCE_NAME")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_RESOURCE_NAME.to_string());
        if resource_name.is_empty() {
            bail!("EBSOP_RESOURCE_NAME must not be empty.");
        }

        let request_timeout_ms: u64 = lookup("EBSOP_REQUEST_TIMEOUT_MS")
            .map(|v| v.parse())
            .transpose()
            .context("EBSOP_REQUEST_TIMEOUT_MS must be an integer (milliseconds).")?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT.as_millis() as u64);
        let request_timeout = Duration::from_millis(request_timeout_ms.max(100));

        let backoff_base_ms: u64 = lookup("EBSOP_BACKOFF_BASE_MS")
            .map(|v| v.parse())
            .transpose()
            .context("EBSOP_BACKOFF_BASE_MS must be an integer (milliseconds).")?
            .unwrap_or(DEFAULT_BACKOFF_BASE.as_millis() as u64);
        let backoff_base = Duration::from_millis(backoff_base_ms.max(10));

        let backoff_max_secs: u64 = lookup("EBSOP_BACKOFF_MAX_SECS")
            .map(|v| v.parse())
            .transpose()
            .context("EBSOP_BACKOFF_MAX_SECS must be an integer (seconds).")?
            .unwrap_or(DEFAULT_BACKOFF_MAX.as_secs());
        let backoff_max = Duration::from_secs(backoff_max_secs).max(backoff_base);

        let resync_interval = lookup("EBSOP_RESYNC_INTERVAL_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("EBSOP_RESYNC_INTERVAL_SECS must be an integer (seconds).")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let node_label_selector = lookup("EBSOP_NODE_LABEL_SELECTOR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let log_level = lookup("EBSOP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            resource_name,
            request_timeout,
            backoff_base,
            backoff_max,
            resync_interval,
            node_label_selector,
            log_level,
        })
    }

    /// Engine settings derived from this configuration.
    pub fn reconciler_settings(&self) -> ReconcilerSettings {
        ReconcilerSettings {
            resource_name: self.resource_name.clone(),
            request_timeout: self.request_timeout,
            ..Default::default()
        }
    }
}
