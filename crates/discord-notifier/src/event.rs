use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::template::Context;

/// An upstream event. Only its payload is looked at, as interpolation context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "IncomingWire")]
pub struct IncomingEvent {
    pub id: Option<String>,
    pub payload: Context,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IncomingWire {
    Wrapped(Wrapped),
    Bare(Context),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Wrapped {
    #[serde(default)]
    id: Option<String>,
    payload: Context,
}

impl From<IncomingWire> for IncomingEvent {
    fn from(wire: IncomingWire) -> Self {
        match wire {
            IncomingWire::Wrapped(w) => IncomingEvent {
                id: w.id,
                payload: w.payload,
            },
            IncomingWire::Bare(payload) => IncomingEvent { id: None, payload },
        }
    }
}

impl IncomingEvent {
    pub fn new(payload: Context) -> Self {
        Self { id: None, payload }
    }

    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("event")
    }
}

/// Parses either a JSON array of events or one event per line.
pub fn parse_events(input: &str) -> Result<Vec<IncomingEvent>> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(Into::into))
        .collect()
}

/// The record this agent hands back to the host after a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEvent {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Raw response body from Discord.
    pub payload: String,
}

impl OutgoingEvent {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            payload: payload.into(),
        }
    }
}
