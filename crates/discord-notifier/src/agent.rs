use std::fmt;
use std::sync::Arc;

use tracing::{debug, info_span, Instrument};

use crate::discord::MessageApi;
use crate::error::Result;
use crate::event::{IncomingEvent, OutgoingEvent};
use crate::health::{self, HealthSnapshot};
use crate::host::{AgentLog, EventSink, HealthClock};
use crate::options::{ActionType, AgentOptions, RawOptions};
use crate::template::Context;

/// Steps a single trigger goes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validating,
    Interpolating,
    Sending,
    Logging,
    Emitting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validating => "validating",
            Stage::Interpolating => "interpolating",
            Stage::Sending => "sending",
            Stage::Logging => "logging",
            Stage::Emitting => "emitting",
        })
    }
}

/// How one trigger ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Discord answered. `event` is set when the answer was emitted.
    Sent {
        status: u16,
        event: Option<OutgoingEvent>,
    },
    /// The type resolved to something other than `send_message`.
    Skipped { action_type: String },
}

/// Posts a message to a Discord channel on every trigger.
pub struct DiscordAgent {
    options: AgentOptions,
    api: Arc<dyn MessageApi>,
    log: Arc<dyn AgentLog>,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for DiscordAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordAgent")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DiscordAgent {
    /// Fails with [`crate::Error::InvalidOptions`] rather than build an agent
    /// that could dispatch on bad options.
    pub fn new(
        raw: RawOptions,
        api: Arc<dyn MessageApi>,
        log: Arc<dyn AgentLog>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        Ok(Self {
            options: AgentOptions::parse(raw)?,
            api,
            log,
            sink,
        })
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// One trigger per event, in order. Stops at the first transport failure.
    pub async fn receive(&self, events: &[IncomingEvent]) -> Result<Vec<TriggerOutcome>> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            let span = info_span!("receive", event = event.label());
            let outcome = async {
                self.log.log(&format!("received {}", event.label()));
                self.trigger(&event.payload).await
            }
            .instrument(span)
            .await?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Periodic trigger; placeholders resolve against nothing.
    pub async fn check(&self) -> Result<TriggerOutcome> {
        self.trigger(&Context::new())
            .instrument(info_span!("check"))
            .await
    }

    pub fn is_working(&self, snapshot: &HealthSnapshot, clock: &dyn HealthClock) -> bool {
        health::is_working(snapshot, self.options.max_quiet_period_days, clock)
    }

    async fn trigger(&self, context: &Context) -> Result<TriggerOutcome> {
        debug!(stage = %Stage::Validating);
        let action_type = self.options.resolve_action_type(context);
        match action_type.parse::<ActionType>() {
            Ok(ActionType::SendMessage) => self.send_message(context).await,
            Err(_) => {
                self.log
                    .error(&format!("Error: type has an invalid value ({action_type})"));
                Ok(TriggerOutcome::Skipped { action_type })
            }
        }
    }

    async fn send_message(&self, context: &Context) -> Result<TriggerOutcome> {
        debug!(stage = %Stage::Interpolating);
        let request = self.options.interpolate(context);

        debug!(stage = %Stage::Sending, channel_id = %request.channel_id);
        let response = match self
            .api
            .create_message(&request.channel_id, &request.credential, &request.content)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                self.log.error(&format!("Error: {err}"));
                return Err(err);
            }
        };

        debug!(stage = %Stage::Logging, status = response.status);
        self.log.log(&format!("request status : {}", response.status));
        if self.options.debug {
            self.log.log("body");
            self.log.log(&response.body);
        }

        // Emitted for any status, not just 2xx.
        let event = if self.options.emit_on_success {
            debug!(stage = %Stage::Emitting);
            let event = OutgoingEvent::new(response.body);
            self.sink.emit(&event)?;
            Some(event)
        } else {
            None
        };

        Ok(TriggerOutcome::Sent {
            status: response.status,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedClock, MemoryLog, MemorySink, ScriptedApi};
    use crate::Error;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use serde_json::json;

    const BODY: &str = r#"{"id":"1063","content":"Hello Ada","channel_id":"42"}"#;

    struct Harness {
        api: Arc<ScriptedApi>,
        log: Arc<MemoryLog>,
        sink: Arc<MemorySink>,
    }

    impl Harness {
        fn new(api: ScriptedApi) -> Self {
            Self {
                api: Arc::new(api),
                log: Arc::new(MemoryLog::default()),
                sink: Arc::new(MemorySink::default()),
            }
        }

        fn agent(&self, raw: RawOptions) -> Result<DiscordAgent> {
            DiscordAgent::new(raw, self.api.clone(), self.log.clone(), self.sink.clone())
        }
    }

    fn options() -> RawOptions {
        RawOptions {
            content: Some("Hello {{name}}".into()),
            credential: Some("super-secret-token".into()),
            channel_id: Some("42".into()),
            ..RawOptions::defaults()
        }
    }

    fn event(payload: serde_json::Value) -> IncomingEvent {
        IncomingEvent::new(payload.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn invalid_options_never_build_an_agent() {
        let h = Harness::new(ScriptedApi::replying(200, BODY));
        for raw in [
            RawOptions { channel_id: None, ..options() },
            RawOptions { content: Some(String::new()), ..options() },
            RawOptions { credential: Some(String::new()), ..options() },
        ] {
            assert_matches!(h.agent(raw), Err(Error::InvalidOptions(_)));
        }
        assert!(h.api.sent().is_empty());
    }

    #[test]
    fn debug_output_redacts_credential() {
        let h = Harness::new(ScriptedApi::replying(200, BODY));
        let agent = h.agent(options()).unwrap();
        let rendered = format!("{agent:?}");
        assert!(rendered.contains("DiscordAgent"));
        assert!(!rendered.contains("super-secret-token"));
    }

    #[tokio::test]
    async fn success_emits_raw_body() {
        let h = Harness::new(ScriptedApi::replying(200, BODY));
        let agent = h.agent(options()).unwrap();

        let outcomes = agent.receive(&[event(json!({"name": "Ada"}))]).await.unwrap();

        let sent = h.api.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "Hello Ada");
        assert_eq!(sent[0].channel_id, "42");
        assert_eq!(sent[0].credential, "super-secret-token");

        let events = h.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, BODY);
        assert_matches!(
            &outcomes[..],
            [TriggerOutcome::Sent { status: 200, event: Some(e) }] if e.payload == BODY
        );
        assert!(h.log.contains("request status : 200"));
    }

    #[tokio::test]
    async fn missing_placeholder_sends_empty_text() {
        let h = Harness::new(ScriptedApi::replying(200, BODY));
        let agent = h.agent(options()).unwrap();
        agent.receive(&[event(json!({"other": "x"}))]).await.unwrap();
        assert_eq!(h.api.sent()[0].content, "Hello ");
    }

    #[tokio::test]
    async fn no_emission_when_disabled() {
        let h = Harness::new(ScriptedApi::replying(200, BODY).then(400, "{}"));
        let agent = h
            .agent(RawOptions {
                emit_on_success: Some("false".into()),
                ..options()
            })
            .unwrap();

        let outcomes = agent
            .receive(&[event(json!({})), event(json!({}))])
            .await
            .unwrap();
        assert_eq!(h.api.sent().len(), 2);
        assert!(h.sink.events().is_empty());
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, TriggerOutcome::Sent { event: None, .. })));
    }

    #[tokio::test]
    async fn error_status_still_emits() {
        let body = r#"{"message": "Missing Permissions", "code": 50013}"#;
        let h = Harness::new(ScriptedApi::replying(400, body));
        let agent = h.agent(options()).unwrap();

        let outcome = agent.check().await.unwrap();
        assert_matches!(outcome, TriggerOutcome::Sent { status: 400, event: Some(_) });
        assert_eq!(h.sink.events()[0].payload, body);
        assert!(h.log.contains("request status : 400"));
        assert!(h.log.errors().is_empty());
    }

    #[tokio::test]
    async fn body_is_logged_only_in_debug() {
        let h = Harness::new(ScriptedApi::replying(200, BODY));
        h.agent(options()).unwrap().check().await.unwrap();
        assert!(!h.log.contains(BODY));

        let h = Harness::new(ScriptedApi::replying(200, BODY));
        h.agent(RawOptions {
            debug: Some("true".into()),
            ..options()
        })
        .unwrap()
        .check()
        .await
        .unwrap();
        assert_eq!(
            h.log.messages(),
            vec!["request status : 200".to_string(), "body".to_string(), BODY.to_string()]
        );
    }

    #[tokio::test]
    async fn credential_never_logged() {
        let h = Harness::new(ScriptedApi::replying(200, BODY));
        let agent = h
            .agent(RawOptions {
                debug: Some("true".into()),
                ..options()
            })
            .unwrap();
        agent
            .receive(&[IncomingEvent {
                id: Some("evt-7".into()),
                payload: Default::default(),
            }])
            .await
            .unwrap();
        assert!(h.log.contains("received evt-7"));
        assert!(!h.log.contains("super-secret-token"));
    }

    #[tokio::test]
    async fn one_request_per_event() {
        let h = Harness::new(ScriptedApi::replying(200, BODY));
        let agent = h.agent(options()).unwrap();
        let events: Vec<_> = ["Ada", "Grace", "Barbara"]
            .iter()
            .map(|n| event(json!({ "name": n })))
            .collect();

        let outcomes = agent.receive(&events).await.unwrap();
        assert_eq!(outcomes.len(), 3);
        let contents: Vec<_> = h.api.sent().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, ["Hello Ada", "Hello Grace", "Hello Barbara"]);
        assert_eq!(h.sink.events().len(), 3);
    }

    #[tokio::test]
    async fn unknown_resolved_type_is_skipped() {
        let h = Harness::new(ScriptedApi::replying(200, BODY));
        let agent = h
            .agent(RawOptions {
                action_type: Some("{{ kind }}".into()),
                ..options()
            })
            .unwrap();

        let outcome = agent
            .receive(&[event(json!({"kind": "add_reaction"}))])
            .await
            .unwrap();
        assert_eq!(
            outcome,
            vec![TriggerOutcome::Skipped {
                action_type: "add_reaction".into()
            }]
        );
        assert!(h.api.sent().is_empty());
        assert!(h.sink.events().is_empty());
        assert_eq!(
            h.log.errors(),
            vec!["Error: type has an invalid value (add_reaction)".to_string()]
        );
    }

    #[tokio::test]
    async fn transport_failure_aborts_without_emitting() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let api = crate::discord::DiscordClient::new(&crate::config::TransportSettings {
            api_base: format!("http://127.0.0.1:{port}"),
            timeout_secs: Some(5),
        })
        .unwrap();
        let log = Arc::new(MemoryLog::default());
        let sink = Arc::new(MemorySink::default());
        let agent = DiscordAgent::new(options(), Arc::new(api), log.clone(), sink.clone()).unwrap();

        let err = agent
            .receive(&[event(json!({"name": "a"})), event(json!({"name": "b"}))])
            .await
            .unwrap_err();
        assert_matches!(err, Error::Transport(_));
        assert!(sink.events().is_empty());
        assert_eq!(log.errors().len(), 1);
        assert!(!log.contains("super-secret-token"));
    }

    #[tokio::test]
    async fn health_follows_emitted_events() {
        let h = Harness::new(ScriptedApi::replying(200, BODY));
        let agent = h.agent(options()).unwrap();
        agent.check().await.unwrap();

        let last = h.sink.events()[0].created_at;
        let snapshot = HealthSnapshot {
            last_event_at: Some(last),
            last_error_log_at: None,
        };
        assert!(agent.is_working(&snapshot, &FixedClock(Utc::now())));
        assert!(!agent.is_working(&snapshot, &FixedClock(last + Duration::days(8))));
    }
}
