//! What the agent needs from whoever runs it: a log, an event store and a clock.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::Result;
use crate::event::OutgoingEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

/// One line of the agent's host-visible log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

/// The host's per-agent log. Error entries count against health.
pub trait AgentLog: Send + Sync {
    fn record(&self, entry: LogEntry);

    fn log(&self, message: &str) {
        self.record(LogEntry::new(LogLevel::Info, message));
    }

    fn error(&self, message: &str) {
        self.record(LogEntry::new(LogLevel::Error, message));
    }
}

/// Where emitted events go.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &OutgoingEvent) -> Result<()>;
}

pub trait HealthClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl HealthClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Log that only goes to `tracing`; nothing is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl AgentLog for TracingLog {
    fn record(&self, entry: LogEntry) {
        trace_entry(&entry);
    }
}

pub(crate) fn trace_entry(entry: &LogEntry) {
    match entry.level {
        LogLevel::Info => info!(target: "discord_notifier::agent", "{}", entry.message),
        LogLevel::Error => error!(target: "discord_notifier::agent", "{}", entry.message),
    }
}

/// Writes each event as a JSON line to stdout instead of storing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&self, event: &OutgoingEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}").map_err(|e| crate::Error::store("writing event", "<stdout>", e))
    }
}
