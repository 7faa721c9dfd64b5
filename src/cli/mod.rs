//! CLI module for the Autoblog Gateway
//!
//! Provides subcommands:
//! - `serve`: HTTP API server (default deployment mode)
//! - `migrate`: apply key database migrations and exit
//! - `issue-key`: mint a key directly against the database

pub mod keys;
pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Autoblog Gateway - API-key gated blog generation
#[derive(Parser)]
#[command(name = "autoblog-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Apply database migrations and exit
    Migrate,

    /// Issue a new API key and print it
    IssueKey(keys::IssueKeyArgs),
}

/// Read `.env`, load and validate configuration, then start logging
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_issue_key() {
        let cli = Cli::try_parse_from(["autoblog-gateway", "issue-key", "--tier", "paid"]).unwrap();

        match cli.command {
            Command::IssueKey(args) => assert_eq!(args.tier, "paid"),
            _ => panic!("expected issue-key"),
        }
    }

    #[test]
    fn test_issue_key_defaults_to_trial() {
        let cli = Cli::try_parse_from(["autoblog-gateway", "issue-key"]).unwrap();

        match cli.command {
            Command::IssueKey(args) => assert_eq!(args.tier, "trial"),
            _ => panic!("expected issue-key"),
        }
    }

    #[test]
    fn test_parse_serve_and_migrate() {
        assert!(matches!(
            Cli::try_parse_from(["autoblog-gateway", "serve"]).unwrap().command,
            Command::Serve
        ));
        assert!(matches!(
            Cli::try_parse_from(["autoblog-gateway", "migrate"]).unwrap().command,
            Command::Migrate
        ));
        assert!(Cli::try_parse_from(["autoblog-gateway", "ui"]).is_err());
    }
}
