use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;

use crate::channels::telegram::TelegramChannel;
use crate::config::load_config;
use crate::engine::Engine;
use crate::payment::PaymentGateway;
use crate::payment::chapa::ChapaClient;

#[derive(Parser)]
#[command(name = "dabo")]
#[command(about = "Telegram ordering bot for a local delivery service")]
pub struct Cli {
    /// Path to the JSON config file (default: ./config.json)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (Telegram channel + engine + webhook gateway)
    Run,
    /// Show a configuration summary
    Status,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => run_bot(config).await,
        Commands::Status => {
            status(&config);
            Ok(())
        }
    }
}

async fn run_bot(config: crate::config::Config) -> Result<()> {
    config.validate().context("Configuration is not usable")?;

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    let telegram = Arc::new(TelegramChannel::new(&config.telegram, inbound_tx));
    let gateway: Arc<dyn PaymentGateway> = Arc::new(ChapaClient::new(&config.payments));
    let http = config.http.clone();
    let engine = Arc::new(Engine::new(config, telegram.clone(), gateway)?);

    telegram.start();
    if http.enabled {
        crate::gateway::serve(engine.clone(), &http.host, http.port).await?;
    }

    // One task per event; per-session ordering comes from the session
    // locks, not from this loop.
    let loop_engine = engine.clone();
    tokio::spawn(async move {
        while let Some(event) = inbound_rx.recv().await {
            let engine = loop_engine.clone();
            tokio::spawn(async move {
                engine.handle(event).await;
            });
        }
    });

    info!("dabo {} running, press Ctrl-C to stop", crate::VERSION);
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}

fn status(config: &crate::config::Config) {
    println!("dabo {}", crate::VERSION);
    println!(
        "  telegram token: {}",
        if config.telegram.token.is_empty() {
            "not set"
        } else {
            "set"
        }
    );
    println!("  merchant channel: {}", config.telegram.merchant_channel);
    println!("  admins: {}", config.telegram.admins.join(", "));
    println!("  cafes: {}", config.catalog.len());
    println!(
        "  service hours: {:02}:00-{:02}:00 (UTC{:+}), mode {:?}",
        config.schedule.hours.open_hour,
        config.schedule.hours.close_hour,
        config.schedule.hours.utc_offset_hours,
        config.schedule.mode
    );
    println!(
        "  payments: {}",
        if config.payments.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  http gateway: {}",
        if config.http.enabled {
            format!("{}:{}", config.http.host, config.http.port)
        } else {
            "disabled".to_string()
        }
    );
    match config.validate() {
        Ok(()) => println!("  config: valid"),
        Err(e) => println!("  config: INVALID — {e}"),
    }
}
