use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio::runtime::Runtime;

use discord_notifier::cli::{Cli, Commands};
use discord_notifier::config::Config;
use discord_notifier::discord::DiscordClient;
use discord_notifier::event::{parse_events, IncomingEvent};
use discord_notifier::health;
use discord_notifier::host::{StdoutSink, SystemClock, TracingLog};
use discord_notifier::logging::init_tracing;
use discord_notifier::options::AgentOptions;
use discord_notifier::store::FileStore;
use discord_notifier::{DiscordAgent, TriggerOutcome};

use tabled::settings::{object::Columns, Alignment, Modify, Style};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "event")]
    event: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "emitted")]
    emitted: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let rt = Runtime::new()?;
    rt.block_on(async {
        match cli.command {
            Commands::Receive { events, dry_run } => {
                let config = Config::load(cli.config.clone())?;
                let agent = build_agent(config, dry_run)?;
                let incoming = read_events(&events).await?;

                let outcomes = agent.receive(&incoming).await?;
                let rows = incoming
                    .iter()
                    .zip(&outcomes)
                    .map(|(event, outcome)| row(event.label(), outcome))
                    .collect::<Vec<_>>();
                print_table(rows, dry_run);
            }
            Commands::Check { dry_run } => {
                let config = Config::load(cli.config.clone())?;
                let agent = build_agent(config, dry_run)?;
                let outcome = agent.check().await?;
                print_table(vec![row("check", &outcome)], dry_run);
            }
            Commands::Validate => {
                let config = Config::load(cli.config.clone())?;
                match config.agent.validate() {
                    Ok(()) => println!("options are valid"),
                    Err(errors) => {
                        for message in errors.messages() {
                            println!("- {message}");
                        }
                        std::process::exit(1);
                    }
                }
            }
            Commands::Health => {
                let config = Config::load(cli.config.clone())?;
                let store = FileStore::new(&config.store);
                let options = AgentOptions::parse(config.agent)?;
                let snapshot = store.snapshot()?;

                if health::is_working(&snapshot, options.max_quiet_period_days, &SystemClock) {
                    println!("working");
                } else {
                    println!("not working");
                    std::process::exit(1);
                }
            }
            Commands::Version { json } => {
                if json {
                    let info = serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "commit": option_env!("GIT_SHA").unwrap_or("unknown"),
                        "build_date": option_env!("BUILD_DATE").unwrap_or("unknown"),
                    });
                    println!("{}", serde_json::to_string_pretty(&info)?);
                } else {
                    println!(
                        "discord-notifier {} (commit: {}, built: {})",
                        env!("CARGO_PKG_VERSION"),
                        option_env!("GIT_SHA").unwrap_or("unknown"),
                        option_env!("BUILD_DATE").unwrap_or("unknown"),
                    );
                }
            }
        }
        Ok(())
    })
}

fn build_agent(config: Config, dry_run: bool) -> Result<DiscordAgent> {
    let api = Arc::new(DiscordClient::new(&config.transport)?);
    if dry_run {
        return Ok(DiscordAgent::new(
            config.agent,
            api,
            Arc::new(TracingLog),
            Arc::new(StdoutSink),
        )?);
    }
    let store = Arc::new(FileStore::new(&config.store));
    Ok(DiscordAgent::new(config.agent, api, store.clone(), store)?)
}

async fn read_events(path: &Path) -> Result<Vec<IncomingEvent>> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Reading events from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Reading events file {}", path.display()))?
    };
    parse_events(&text).context("Parsing incoming events")
}

fn row(label: &str, outcome: &TriggerOutcome) -> Row {
    match outcome {
        TriggerOutcome::Sent { status, event } => Row {
            event: label.to_string(),
            status: status.to_string(),
            emitted: if event.is_some() { "yes" } else { "no" }.to_string(),
        },
        TriggerOutcome::Skipped { action_type } => Row {
            event: label.to_string(),
            status: format!("skipped ({action_type})"),
            emitted: "no".to_string(),
        },
    }
}

fn print_table(rows: Vec<Row>, dry_run: bool) {
    // Emitted events already went to stdout on a dry run; keep it parseable.
    if dry_run {
        return;
    }
    let mut table = Table::new(rows);
    table
        .with(Style::modern())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()));
    println!("{}", table);
}
