//! Hirys CLI
//!
//! Command-line front end for the daily check-in:
//! - Show wallet, network and streak status
//! - Connect and switch the wallet to Irys Testnet
//! - Submit the daily check-in
//! - Watch the countdown to the next check-in

use anyhow::Context;
use clap::{Parser, Subcommand};
use hirys_streak::config::{generate_default_config, Config};
use hirys_streak::display::{
    flames_row, format_balance, format_hms, short_address, short_hash, streak_label, today_iso,
};
use hirys_streak::{AppSnapshot, CheckInOutcome, SkipReason, StreakApp, StreakEvent};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hirys")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Submit your daily Hirys on-chain. Keep your streak alive.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/hirys/config.toml or ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Wallet JSON-RPC endpoint, overrides the config
    #[arg(long, global = true)]
    pub wallet_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show wallet, network and streak status
    Status,

    /// Request account access and switch to the target network
    Connect,

    /// Switch the wallet to the target network (adding it if needed)
    SwitchNetwork,

    /// Submit today's check-in
    CheckIn {
        /// Message (default from config)
        message: Option<String>,
        /// Optional Irys transaction id to attach
        #[arg(long)]
        irys_id: Option<String>,
    },

    /// Follow wallet changes and the countdown until Ctrl-C
    Watch,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("hirys_streak={}", config.logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("writing config to {:?}", path))?;
                println!("✓ Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let mut config = Config::load_default(cli.config.as_deref())?;
    if let Some(url) = cli.wallet_url {
        config.wallet.endpoint = Some(url);
    }
    init_logging(&config);

    let app = StreakApp::from_config(config).context("building client")?;

    match cli.command {
        Commands::Status => {
            app.hydrate().await;
            print_status(&app, &app.snapshot());
        }
        Commands::Connect => {
            app.connect().await?;
            print_status(&app, &app.snapshot());
        }
        Commands::SwitchNetwork => {
            let session = app.switch_network().await?;
            if app.sessions().guard().is_on_target_network(&session) {
                println!("✓ Wallet on {}", app.config().network.name);
            } else {
                println!("Switch requested; confirm it in your wallet");
            }
        }
        Commands::CheckIn { message, irys_id } => {
            app.hydrate().await;
            run_check_in(&app, message.as_deref(), irys_id.as_deref()).await?;
        }
        Commands::Watch => watch(&app).await?,
        Commands::Config { .. } => unreachable!("handled above"),
    }

    app.shutdown().await;
    Ok(())
}

fn print_status(app: &StreakApp, snapshot: &AppSnapshot) {
    let network = &app.config().network;

    match &snapshot.session.address {
        Some(address) => {
            println!(
                "Wallet:    {}  ({})",
                short_address(address),
                format_balance(snapshot.session.balance, network)
            );
        }
        None => println!("Wallet:    not connected  (run `hirys connect`)"),
    }

    if snapshot.on_target_network {
        println!("Network:   {}", network.name);
    } else {
        println!("Network:   Wrong Chain  (run `hirys switch-network`)");
    }

    println!("Today:     {}", today_iso());
    println!("Streak:    {}", streak_label(snapshot.streak.streak_count));
    println!(
        "Last day:  {}",
        snapshot
            .streak
            .last_submission_day
            .map(|d| d.to_string())
            .unwrap_or_else(|| "—".to_string())
    );
    println!("Flames:    {}", flames_row(&snapshot.view.flames));

    if snapshot.view.is_eligible() {
        println!("Next:      Available now");
    } else {
        println!("Next:      {}", format_hms(snapshot.view.countdown_ms));
    }

    if snapshot.view.at_risk {
        println!("Streak might be broken. Submit a new Hirys to start again.");
    }
    if let Some(error) = &snapshot.submission.last_error {
        println!("Error:     {}", error);
    }
    println!("Faucet:    {}", network.faucet_url);
}

async fn run_check_in(
    app: &StreakApp,
    message: Option<&str>,
    irys_id: Option<&str>,
) -> anyhow::Result<()> {
    let mut events = app.controller().subscribe_events();
    println!("Submitting…");

    match app.check_in(message, irys_id).await? {
        CheckInOutcome::Confirmed(hash) => {
            while let Ok(event) = events.try_recv() {
                if let StreakEvent::SubmissionSucceeded { explorer_url, .. } = event {
                    println!("✓ Hirys submitted on-chain");
                    println!("Tx: {} {}", short_hash(&hash), explorer_url);
                }
            }
            print_status(app, &app.snapshot());
        }
        CheckInOutcome::Skipped(SkipReason::EmptyMessage) => {
            println!("Nothing to submit: message is empty");
        }
        CheckInOutcome::Skipped(SkipReason::InFlight) => {
            println!("A check-in is already in flight");
        }
    }

    Ok(())
}

async fn watch(app: &StreakApp) -> anyhow::Result<()> {
    app.start();
    app.hydrate().await;

    let mut view = app
        .subscribe_view()
        .context("countdown ticker not running")?;
    let mut events = app.controller().subscribe_events();
    let mut last_line = String::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = app.snapshot();
                let next = if snapshot.view.is_eligible() {
                    "Available now".to_string()
                } else {
                    format_hms(snapshot.view.countdown_ms)
                };
                let line = format!(
                    "{}  {}  next: {}{}",
                    streak_label(snapshot.streak.streak_count),
                    flames_row(&snapshot.view.flames),
                    next,
                    if snapshot.on_target_network { "" } else { "  [wrong chain]" },
                );
                if line != last_line {
                    println!("{}", line);
                    last_line = line;
                }
            }
            event = events.recv() => {
                if let Ok(StreakEvent::Error { message }) = event {
                    eprintln!("Error: {}", message);
                }
            }
        }
    }

    Ok(())
}
