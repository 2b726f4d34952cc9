//! `logtriage config`

use anyhow::{Context, Result};
use clap::Subcommand;
use logtriage_config::ConfigManager;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a default config file
    Init,

    /// Print the effective configuration
    Show,

    /// Show config file path
    Path,
}

pub async fn handle_config_command(cmd: ConfigCommand, path: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigCommand::Init => init_config(path).await,
        ConfigCommand::Show => show_config(path).await,
        ConfigCommand::Path => show_config_path(path),
    }
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => ConfigManager::config_path().context("Failed to resolve config directory"),
    }
}

async fn init_config(path: Option<&Path>) -> Result<()> {
    let config_path = resolve_path(path)?;

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("To reinitialize, please delete the existing config first.");
        return Ok(());
    }

    ConfigManager::init_at(&config_path)
        .await
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    println!("✓ Initialized config at: {}", config_path.display());
    Ok(())
}

async fn show_config(path: Option<&Path>) -> Result<()> {
    let manager = ConfigManager::load_or_default(path)
        .await
        .context("Config not found or invalid. Run 'logtriage config init' first.")?;

    let rendered =
        toml::to_string_pretty(manager.config()).context("Failed to render config")?;
    println!("# {}", manager.path().display());
    print!("{}", rendered);
    Ok(())
}

fn show_config_path(path: Option<&Path>) -> Result<()> {
    println!("{}", resolve_path(path)?.display());
    Ok(())
}
