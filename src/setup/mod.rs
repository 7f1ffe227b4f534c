//! Setup
//!
//! Interactive first-run flow: asks for a name and persona, registers
//! the agent on the platform, and writes `~/.moltbot/moltbot.json`.
//! Uses the `dialoguer` crate for input handling.

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Input;

use crate::config::{get_config_path, save_config};
use crate::platform::MoltHttpClient;
use crate::types::{default_config, MoltClient, MoltbotConfig};

/// Prompt for a required string value. Repeats until non-empty.
fn prompt_required(label: &str) -> Result<String> {
    loop {
        let value: String = Input::new()
            .with_prompt(format!("  {} {}", "\u{2192}".cyan(), label.white()))
            .allow_empty(true)
            .interact_text()?;

        let trimmed = value.trim().to_string();
        if !trimmed.is_empty() {
            return Ok(trimmed);
        }
        println!("{}", "  This field is required.".yellow());
    }
}

/// Prompt with a prefilled default the user can accept with Enter.
fn prompt_with_default(label: &str, default: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(format!("  {} {}", "\u{2192}".cyan(), label.white()))
        .default(default.to_string())
        .interact_text()?;
    Ok(value.trim().to_string())
}

/// Run the interactive init flow. Returns the saved config.
pub async fn run_init() -> Result<MoltbotConfig> {
    println!();
    println!("{}", "  moltbot setup".bold());
    println!(
        "{}",
        "  First run. Let's get your agent onto the feed.\n".white()
    );

    let mut config = default_config();

    // ─── 1. Identity ─────────────────────────────────────────────
    println!("{}", "  [1/3] Identity\n".cyan());

    config.agent_name = prompt_required("Agent name")?;
    config.persona = prompt_required("Persona (one or two sentences, who is this agent?)")?;
    println!();

    // ─── 2. Platform registration ────────────────────────────────
    println!("{}", "  [2/3] Platform registration\n".cyan());

    config.api_url = prompt_with_default("Platform API URL", &config.api_url)?;

    let client = MoltHttpClient::new(config.api_url.clone(), String::new());
    let registration = client.register(&config.agent_name, &config.persona).await;

    match registration.payload {
        Some(result) => {
            config.api_key = result.api_key;
            config.agent_name = result.agent_name;
            println!(
                "{}",
                format!("  Registered as {}.\n", config.agent_name).green()
            );
        }
        None => {
            println!(
                "{}",
                "  Registration failed. You can paste an existing key instead.\n".yellow()
            );
            config.api_key = prompt_required("Platform API key")?;
        }
    }

    // ─── 3. Decision engine ──────────────────────────────────────
    println!("{}", "  [3/3] Decision engine\n".cyan());

    config.engine_api_url = prompt_with_default("Engine API URL", &config.engine_api_url)?;
    config.engine_model = prompt_with_default("Engine model", &config.engine_model)?;
    config.engine_api_key = prompt_required("Engine API key")?;

    save_config(&config).context("Failed to save config")?;
    println!();
    println!(
        "{}",
        format!("  Config written to {}", get_config_path().display()).green()
    );
    println!(
        "{}",
        "  Start the agent with: moltbot --run\n".dimmed()
    );

    Ok(config)
}
