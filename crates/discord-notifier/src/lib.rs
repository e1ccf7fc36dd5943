pub mod agent;
pub mod cli;
pub mod config;
pub mod discord;
pub mod error;
pub mod event;
pub mod health;
pub mod host;
pub mod logging;
pub mod options;
pub mod store;
pub mod template;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::{DiscordAgent, TriggerOutcome};
pub use error::{Error, Result, ValidationErrors};
