use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use std::path::{Path, PathBuf};
use weather_core::{Config, Fulfillment, provider::provider_from_config};

use crate::server::{self, AppState};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-webhook", version, about = "Weather fulfillment webhook")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// Run the fulfillment webhook.
    Serve {
        /// Address to listen on, e.g. "127.0.0.1:8080".
        #[arg(long)]
        bind: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Configure => configure(&path),
            Command::Serve { bind } => serve(&path, bind).await,
        }
    }
}

fn configure(path: &Path) -> anyhow::Result<()> {
    let mut config = Config::load_from(path)?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(api_key.to_string());
    config.save_to(path)?;

    println!("Saved configuration to {}", path.display());
    Ok(())
}

async fn serve(path: &Path, bind: Option<String>) -> anyhow::Result<()> {
    let mut config = Config::load_from(path)?;
    config.apply_env();
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    let provider = provider_from_config(&config)?;
    let state = AppState::new(Fulfillment::new(provider));

    server::serve(&config.server.bind, state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_with_bind_and_config() {
        let cli = Cli::parse_from([
            "weather-webhook",
            "serve",
            "--bind",
            "127.0.0.1:9000",
            "--config",
            "/tmp/weather.toml",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/weather.toml")));
        match cli.command {
            Command::Serve { bind } => assert_eq!(bind.as_deref(), Some("127.0.0.1:9000")),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
