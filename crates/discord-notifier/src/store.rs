//! JSON-lines persistence used by the command line host.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use crate::config::StoreSettings;
use crate::error::{Error, Result};
use crate::event::OutgoingEvent;
use crate::health::HealthSnapshot;
use crate::host::{trace_entry, AgentLog, EventSink, LogEntry, LogLevel};

#[derive(Debug, Clone)]
pub struct FileStore {
    events: PathBuf,
    logs: PathBuf,
}

impl FileStore {
    pub fn new(settings: &StoreSettings) -> Self {
        Self {
            events: settings.events_path(),
            logs: settings.logs_path(),
        }
    }

    pub fn events_path(&self) -> &Path {
        &self.events
    }

    pub fn logs_path(&self) -> &Path {
        &self.logs
    }

    pub fn events(&self) -> Result<Vec<OutgoingEvent>> {
        read_lines(&self.events)
    }

    pub fn log_entries(&self) -> Result<Vec<LogEntry>> {
        read_lines(&self.logs)
    }

    /// Latest event and latest error, as the health check wants them.
    pub fn snapshot(&self) -> Result<HealthSnapshot> {
        let last_event_at = self.events()?.iter().map(|e| e.created_at).max();
        let last_error_log_at = self
            .log_entries()?
            .iter()
            .filter(|entry| entry.level == LogLevel::Error)
            .map(|entry| entry.at)
            .max();
        Ok(HealthSnapshot {
            last_event_at,
            last_error_log_at,
        })
    }
}

impl EventSink for FileStore {
    fn emit(&self, event: &OutgoingEvent) -> Result<()> {
        append_line(&self.events, event)
    }
}

impl AgentLog for FileStore {
    fn record(&self, entry: LogEntry) {
        trace_entry(&entry);
        if let Err(err) = append_line(&self.logs, &entry) {
            error!(
                error = %err,
                level = ?entry.level,
                path = %self.logs.display(),
                "could not persist agent log entry"
            );
        }
    }
}

fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::store("creating store directory", parent, e))?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::store("opening store file", path, e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| Error::store("appending to store file", path, e))
}

/// A missing file is an empty history.
fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::store("opening store file", path, e)),
    };
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| Error::store("reading store file", path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(out)
}
