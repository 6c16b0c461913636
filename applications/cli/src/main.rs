use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use tibrah_cli::commands::{self, audio, reminders};
use tibrah_cli::{Cli, Commands, ReminderCommands, TibrahConfig};
use tibrah_reminders::ReminderStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tibrah=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config =
        TibrahConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let name = command_name(&cli.command);
    let result = run(cli.command, &config).await;

    if let Err(e) = &result {
        // The store itself may be what failed; nothing more to do then
        let recorded = commands::open_store(&config)
            .and_then(|store| commands::record_error(&store, &format!("{e:#}"), name));
        if let Err(log_error) = recorded {
            tracing::debug!(error = %log_error, "Could not record error");
        }
    }
    result
}

async fn run(command: Commands, config: &TibrahConfig) -> anyhow::Result<()> {
    match command {
        Commands::Tone { hz, playback } => {
            let engine = audio::desktop_engine(config, &playback)?;
            let duration = playback.duration.map(Duration::from_secs);
            let summary = audio::play_tone(&engine, hz, duration, ctrl_c()).await?;
            tracing::info!(elapsed = ?summary.elapsed, "Done");
        }

        Commands::Rife {
            frequencies,
            step,
            manual,
            playback,
        } => {
            let engine = audio::desktop_engine(config, &playback)?;
            let duration = playback.duration.map(Duration::from_secs);
            let summary =
                audio::play_rife(&engine, frequencies, step, manual, duration, ctrl_c()).await?;
            tracing::info!(
                elapsed = ?summary.elapsed,
                frequencies = summary.frequencies_played,
                "Done"
            );
        }

        Commands::Devices => audio::print_devices()?,

        Commands::Reminders { command } => {
            let store = ReminderStore::new(commands::open_store(config)?);
            match command {
                ReminderCommands::List { json } => reminders::list(&store, json)?,
                ReminderCommands::Add {
                    kind,
                    title,
                    time,
                    body,
                    days,
                } => {
                    let reminder = reminders::add(&store, kind, title, time, body, days)?;
                    println!("{}", reminders::format_reminder(&reminder));
                }
                ReminderCommands::Toggle { id } => {
                    let enabled = store.toggle(&id)?;
                    println!("{id} {}", if enabled { "enabled" } else { "disabled" });
                }
                ReminderCommands::Remove { id } => {
                    store.remove(&id)?;
                    println!("Removed {id}");
                }
                ReminderCommands::Run => {
                    reminders::run(store, config.reminders.icon.clone(), ctrl_c()).await?;
                }
            }
        }

        Commands::Config => print!("{}", config.to_toml()?),

        Commands::Errors { clear } => {
            commands::print_errors(&*commands::open_store(config)?, clear)?;
        }
    }
    Ok(())
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Tone { .. } => "tone",
        Commands::Rife { .. } => "rife",
        Commands::Devices => "devices",
        Commands::Reminders { .. } => "reminders",
        Commands::Config => "config",
        Commands::Errors { .. } => "errors",
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
