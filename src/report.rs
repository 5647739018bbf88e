//! Pluggable alert reporting.
//!
//! The gate reports noteworthy events (such as rate limit denials) through a
//! `Reporter`. The backend is picked once at startup from configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

/// A single reportable event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    pub tags: BTreeMap<String, String>,
}

impl Alert {
    /// Create an alert with no tags.
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Attach a tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Destination for alerts.
pub trait Reporter: Send + Sync {
    /// Deliver an alert. Must not block.
    fn report(&self, alert: &Alert);
}

/// Discards every alert.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn report(&self, _alert: &Alert) {}
}

/// Emits alerts as structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, alert: &Alert) {
        let tags = &alert.tags;
        match alert.level {
            AlertLevel::Info => info!(target: "turnstile::alert", ?tags, "{}", alert.message),
            AlertLevel::Warning => warn!(target: "turnstile::alert", ?tags, "{}", alert.message),
            AlertLevel::Error | AlertLevel::Critical => {
                error!(target: "turnstile::alert", level = ?alert.level, ?tags, "{}", alert.message)
            }
        }
    }
}

/// Which reporter backend to install.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportingBackend {
    #[default]
    None,
    Tracing,
}

impl ReportingBackend {
    /// Build the reporter for this backend.
    pub fn build(self) -> Arc<dyn Reporter> {
        match self {
            ReportingBackend::None => Arc::new(NoopReporter),
            ReportingBackend::Tracing => Arc::new(TracingReporter),
        }
    }
}
