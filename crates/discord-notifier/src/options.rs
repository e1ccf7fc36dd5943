//! Agent options: the raw, host-supplied form and the strictly parsed form.

use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationErrors};
use crate::template::{self, Context};

pub const DEFAULT_MAX_QUIET_PERIOD_DAYS: u32 = 7;

/// A flag or number as it may appear in a config file: native or quoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl OptionValue {
    /// Only `true`/`false`, native or as exact strings, count as booleans.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Text(s) if s == "true" => Some(true),
            OptionValue::Text(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    pub fn as_positive_int(&self) -> Option<u32> {
        let n = match self {
            OptionValue::Int(n) => u32::try_from(*n).ok()?,
            OptionValue::Text(s) => s.trim().parse::<u32>().ok()?,
            OptionValue::Bool(_) => return None,
        };
        (n > 0).then_some(n)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Text(s.to_string())
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    SendMessage,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::SendMessage => "send_message",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownActionType(pub String);

impl FromStr for ActionType {
    type Err = UnknownActionType;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "send_message" => Ok(ActionType::SendMessage),
            other => Err(UnknownActionType(other.to_string())),
        }
    }
}

/// Options exactly as the host supplies them. Every field may be missing;
/// string fields may contain `{{ }}` placeholders.
#[derive(Clone, Default, Deserialize)]
pub struct RawOptions {
    pub content: Option<String>,
    #[serde(alias = "type")]
    pub action_type: Option<String>,
    #[serde(alias = "bot_token")]
    pub credential: Option<String>,
    pub channel_id: Option<String>,
    #[serde(alias = "emit_events")]
    pub emit_on_success: Option<OptionValue>,
    pub debug: Option<OptionValue>,
    #[serde(alias = "expected_receive_period_in_days")]
    pub max_quiet_period_days: Option<OptionValue>,
}

impl fmt::Debug for RawOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawOptions")
            .field("content", &self.content)
            .field("action_type", &self.action_type)
            .field("credential", &self.credential.as_ref().map(|_| "[REDACTED]"))
            .field("channel_id", &self.channel_id)
            .field("emit_on_success", &self.emit_on_success)
            .field("debug", &self.debug)
            .field("max_quiet_period_days", &self.max_quiet_period_days)
            .finish()
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

impl RawOptions {
    /// Options of a freshly created agent.
    pub fn defaults() -> Self {
        Self {
            content: Some(String::new()),
            action_type: Some(ActionType::SendMessage.to_string()),
            credential: Some(String::new()),
            channel_id: Some(String::new()),
            emit_on_success: Some("true".into()),
            debug: Some("false".into()),
            max_quiet_period_days: Some(OptionValue::Text(
                DEFAULT_MAX_QUIET_PERIOD_DAYS.to_string(),
            )),
        }
    }

    /// Whether the required-field rules apply. A missing type means `send_message`;
    /// a templated type only resolves per event, so it is not checked here.
    fn sends_message(&self) -> bool {
        self.action_type
            .as_deref()
            .map_or(true, |t| t == ActionType::SendMessage.as_str())
    }

    /// Checks every rule and collects every failure.
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let sends = self.sends_message();

        if let Some(raw_type) = &self.action_type {
            let resolved = template::resolve(raw_type, &Context::new());
            if !resolved.trim().is_empty() && resolved.parse::<ActionType>().is_err() {
                errors.add("type has invalid value: should be 'send_message'");
            }
        }

        if sends && !present(&self.channel_id) {
            errors.add("channel_id is a required field");
        }

        if self
            .emit_on_success
            .as_ref()
            .is_some_and(|v| v.as_bool().is_none())
        {
            errors.add("if provided, emit_events must be true or false");
        }

        if sends && !present(&self.content) {
            errors.add("content is a required field");
        }

        if sends && !present(&self.credential) {
            errors.add("bot_token is a required field");
        }

        if self.debug.as_ref().is_some_and(|v| v.as_bool().is_none()) {
            errors.add("if provided, debug must be true or false");
        }

        if self
            .max_quiet_period_days
            .as_ref()
            .and_then(OptionValue::as_positive_int)
            .is_none()
        {
            errors.add(
                "Please provide 'expected_receive_period_in_days' to indicate how many days \
                 can pass before this Agent is considered to be not working",
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validated options. Template fields are still unresolved.
#[derive(Clone)]
pub struct AgentOptions {
    pub content: String,
    pub action_type: String,
    pub credential: Secret<String>,
    pub channel_id: String,
    pub emit_on_success: bool,
    pub debug: bool,
    pub max_quiet_period_days: u32,
}

impl fmt::Debug for AgentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentOptions")
            .field("content", &self.content)
            .field("action_type", &self.action_type)
            .field("credential", &"[REDACTED]")
            .field("channel_id", &self.channel_id)
            .field("emit_on_success", &self.emit_on_success)
            .field("debug", &self.debug)
            .field("max_quiet_period_days", &self.max_quiet_period_days)
            .finish()
    }
}

impl AgentOptions {
    pub fn parse(raw: RawOptions) -> Result<Self> {
        raw.validate().map_err(Error::InvalidOptions)?;

        let flag = |value: Option<OptionValue>, default: bool| {
            value.and_then(|v| v.as_bool()).unwrap_or(default)
        };
        let max_quiet_period_days = raw
            .max_quiet_period_days
            .as_ref()
            .and_then(OptionValue::as_positive_int)
            .unwrap_or(DEFAULT_MAX_QUIET_PERIOD_DAYS);

        Ok(Self {
            content: raw.content.unwrap_or_default(),
            action_type: raw
                .action_type
                .unwrap_or_else(|| ActionType::SendMessage.to_string()),
            credential: Secret::new(raw.credential.unwrap_or_default()),
            channel_id: raw.channel_id.unwrap_or_default(),
            emit_on_success: flag(raw.emit_on_success, true),
            debug: flag(raw.debug, false),
            max_quiet_period_days,
        })
    }

    pub fn resolve_action_type(&self, context: &Context) -> String {
        template::resolve(&self.action_type, context)
    }

    /// Resolves every message field against the context.
    pub fn interpolate(&self, context: &Context) -> MessageRequest {
        MessageRequest {
            channel_id: template::resolve(&self.channel_id, context),
            credential: Secret::new(template::resolve(
                self.credential.expose_secret(),
                context,
            )),
            content: template::resolve(&self.content, context),
        }
    }
}

/// A fully resolved send, ready for the wire.
#[derive(Clone)]
pub struct MessageRequest {
    pub channel_id: String,
    pub credential: Secret<String>,
    pub content: String,
}

impl fmt::Debug for MessageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRequest")
            .field("channel_id", &self.channel_id)
            .field("credential", &"[REDACTED]")
            .field("content", &self.content)
            .finish()
    }
}
