//! In-memory stand-ins for the host collaborators and the Discord API.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};

use crate::discord::{ApiResponse, MessageApi};
use crate::error::Result;
use crate::event::OutgoingEvent;
use crate::host::{AgentLog, EventSink, HealthClock, LogEntry, LogLevel};

#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == LogLevel::Error)
            .map(|e| e.message)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.message.contains(needle))
    }
}

impl AgentLog for MemoryLog {
    fn record(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<OutgoingEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<OutgoingEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &OutgoingEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl HealthClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A request as the fake API saw it, credential included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: String,
    pub credential: String,
    pub content: String,
}

/// Answers with queued responses, then repeats the fallback.
#[derive(Debug)]
pub struct ScriptedApi {
    queued: Mutex<VecDeque<ApiResponse>>,
    fallback: ApiResponse,
    sent: Mutex<Vec<SentMessage>>,
}

impl ScriptedApi {
    pub fn replying(status: u16, body: &str) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: ApiResponse {
                status,
                body: body.to_string(),
            },
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, status: u16, body: &str) -> Self {
        self.queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(ApiResponse {
                status,
                body: body.to_string(),
            });
        self
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl MessageApi for ScriptedApi {
    async fn create_message(
        &self,
        channel_id: &str,
        credential: &Secret<String>,
        content: &str,
    ) -> Result<ApiResponse> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentMessage {
                channel_id: channel_id.to_string(),
                credential: credential.expose_secret().clone(),
                content: content.to_string(),
            });
        let next = self
            .queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}
