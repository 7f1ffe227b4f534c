//! Moltbot Configuration
//!
//! Loads and saves the agent's configuration from `~/.moltbot/moltbot.json`.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::types::{default_config, MoltbotConfig};

/// Config file name within the moltbot directory.
const CONFIG_FILENAME: &str = "moltbot.json";

/// Returns the `~/.moltbot` directory.
pub fn get_moltbot_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
    home.join(".moltbot")
}

/// Returns the full path to the config file: `~/.moltbot/moltbot.json`.
pub fn get_config_path() -> PathBuf {
    get_moltbot_dir().join(CONFIG_FILENAME)
}

/// Load the agent config from disk, merging missing fields with defaults.
///
/// Returns `None` if the config file does not exist or cannot be parsed.
pub fn load_config() -> Option<MoltbotConfig> {
    let config_path = get_config_path();
    if !config_path.exists() {
        return None;
    }

    let contents = fs::read_to_string(&config_path).ok()?;
    let mut config: MoltbotConfig = serde_json::from_str(&contents).ok()?;

    // Merge defaults for unset fields
    let defaults = default_config();

    if config.api_url.is_empty() {
        config.api_url = defaults.api_url;
    }
    if config.engine_api_url.is_empty() {
        config.engine_api_url = defaults.engine_api_url;
    }
    if config.engine_model.is_empty() {
        config.engine_model = defaults.engine_model;
    }
    if config.max_tokens_per_decision == 0 {
        config.max_tokens_per_decision = defaults.max_tokens_per_decision;
    }
    if config.memory_path.is_empty() {
        config.memory_path = defaults.memory_path;
    }
    if config.heartbeat_interval_secs == 0 {
        config.heartbeat_interval_secs = defaults.heartbeat_interval_secs;
    }
    if config.suspended_interval_secs == 0 {
        config.suspended_interval_secs = defaults.suspended_interval_secs;
    }
    if config.feed_sort.is_empty() {
        config.feed_sort = defaults.feed_sort;
    }
    if config.feed_limit == 0 {
        config.feed_limit = defaults.feed_limit;
    }
    if config.moderator_handles.is_empty() {
        config.moderator_handles = defaults.moderator_handles;
    }
    if config.version.is_empty() {
        config.version = defaults.version;
    }

    Some(config)
}

/// Save the agent config to disk at `~/.moltbot/moltbot.json`.
///
/// Creates the moltbot directory with mode 0o700 if it does not exist.
/// The config file is written with mode 0o600 since it contains API keys.
pub fn save_config(config: &MoltbotConfig) -> Result<()> {
    let dir = get_moltbot_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create moltbot directory")?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
    }

    let config_path = get_config_path();
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&config_path, &json).context("Failed to write config file")?;
    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}

/// Resolve a path that may start with `~` to an absolute path.
pub fn resolve_path(p: &str) -> String {
    if let Some(rest) = p.strip_prefix('~') {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        home.join(rest).to_string_lossy().to_string()
    } else {
        p.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path_expands_tilde() {
        let resolved = resolve_path("~/.moltbot/memory.json");
        assert!(!resolved.starts_with('~'));
        assert!(resolved.ends_with(".moltbot/memory.json"));
    }

    #[test]
    fn test_resolve_path_leaves_absolute_untouched() {
        assert_eq!(resolve_path("/tmp/memory.json"), "/tmp/memory.json");
    }

    #[test]
    fn test_default_config_has_budgets() {
        let config = default_config();
        assert!(config.limits.max_upvotes_per_cycle > 0);
        assert!(config.limits.max_action_delay_ms >= config.limits.min_action_delay_ms);
        assert!(config.gates.comment <= 1.0);
    }
}
