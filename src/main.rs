//! Moltbot Runtime
//!
//! The entry point for the feed agent. Handles CLI args, first-run
//! setup, and starting the heartbeat daemon.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tokio::signal;
use tracing::info;

use moltbot::config::{load_config, resolve_path};
use moltbot::engine::EngineHttpClient;
use moltbot::heartbeat::{run_loop, run_once};
use moltbot::memory::MemoryStore;
use moltbot::platform::MoltHttpClient;
use moltbot::setup::run_init;
use moltbot::types::{LogLevel, MoltClient, MoltbotConfig};

const VERSION: &str = "0.1.0";

/// Moltbot -- autonomous Moltbook feed agent
#[derive(Parser, Debug)]
#[command(
    name = "moltbot",
    version = VERSION,
    about = "Moltbot -- autonomous Moltbook feed agent"
)]
struct Cli {
    /// Start the heartbeat daemon (first run triggers setup)
    #[arg(long)]
    run: bool,

    /// Run exactly one heartbeat cycle, then exit
    #[arg(long)]
    once: bool,

    /// Register the agent and write the config file
    #[arg(long)]
    init: bool,

    /// Show current agent status
    #[arg(long)]
    status: bool,
}

fn init_logging(level: &LogLevel) {
    let level = match level {
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Error => tracing::Level::ERROR,
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

// ─── Status Command ──────────────────────────────────────────────

/// Display the current agent status from local state only.
fn show_status() {
    let Some(config) = load_config() else {
        println!("Moltbot is not configured. Run: moltbot --init");
        return;
    };

    let store = MemoryStore::load(resolve_path(&config.memory_path));
    let memory = &store.memory;

    println!();
    println!("{}", "=== MOLTBOT STATUS ===".bold());
    println!("Name:            {}", config.agent_name);
    println!("Platform:        {}", config.api_url);
    println!("Engine model:    {}", config.engine_model);
    println!("Heartbeats:      {}", memory.total_heartbeats);
    println!(
        "Last heartbeat:  {}",
        memory.last_heartbeat_time.as_deref().unwrap_or("never")
    );
    println!("Posts seen:      {}", memory.interacted_post_ids.len());
    println!("Following:       {}", memory.followed_agents.len());
    println!("Communities:     {}", memory.subscribed_communities.len());
    if let Some(entry) = memory.journal.last() {
        println!("Last cycle:      {}", entry.summary);
    }
    println!("{}", "======================".bold());
    println!();
}

// ─── Run ─────────────────────────────────────────────────────────

/// Load config, falling back to the interactive setup on first run.
async fn load_or_init() -> Result<MoltbotConfig> {
    match load_config() {
        Some(config) => Ok(config),
        None => run_init().await,
    }
}

async fn shutdown_signal() {
    let ctrl_c = signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("failed to register SIGTERM handler: {e}");
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => info!("received SIGINT, shutting down after this cycle"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down after this cycle"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received shutdown signal");
    }
}

async fn run(once: bool) -> Result<()> {
    let config = load_or_init().await?;
    init_logging(&config.log_level);
    info!(version = VERSION, agent = %config.agent_name, "moltbot starting");

    let client = MoltHttpClient::new(config.api_url.clone(), config.api_key.clone());
    match client.get_own_profile().await.payload {
        Some(profile) => info!(agent = %profile.name, "platform credentials verified"),
        None => tracing::warn!("could not fetch own profile; check the API key"),
    }

    let engine = EngineHttpClient::new(
        config.engine_api_url.clone(),
        config.engine_api_key.clone(),
        config.engine_model.clone(),
        config.max_tokens_per_decision,
        config.persona.clone(),
    );

    if once {
        let outcome = run_once(&client, &engine, &config).await;
        println!("{}", outcome.summary);
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    tokio::spawn(async move {
        shutdown_signal().await;
        flag.store(true, Ordering::SeqCst);
    });

    // The loop drains: the in-flight cycle finishes before this returns.
    run_loop(&client, &engine, &config, shutdown).await;
    info!("moltbot stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.init {
        init_logging(&LogLevel::Info);
        run_init().await?;
        return Ok(());
    }
    if cli.status {
        show_status();
        return Ok(());
    }
    if cli.run || cli.once {
        return run(cli.once).await;
    }

    println!("Nothing to do. Try: moltbot --run (or --once, --init, --status)");
    Ok(())
}
