//! CLI argument definitions using clap
//!
//! Commands:
//! - docregistry init --config <path>
//! - docregistry serve --config <path> [--port <port>]
//! - docregistry call --config <path>
//! - docregistry check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docregistry - content-hash document registry
#[derive(Parser, Debug)]
#[command(name = "docregistry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new registry data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./docregistry.json")]
        config: PathBuf,
    },

    /// Serve the registry over HTTP
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./docregistry.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one request read from stdin through the gateway and exit
    Call {
        /// Path to configuration file
        #[arg(long, default_value = "./docregistry.json")]
        config: PathBuf,
    },

    /// Open the store, repair interrupted writes and report
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./docregistry.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_port() {
        let cli = Cli::parse_from(["docregistry", "serve", "--config", "r.json", "--port", "9000"]);
        match cli.command {
            Command::Serve { config, port } => {
                assert_eq!(config, PathBuf::from("r.json"));
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::parse_from(["docregistry", "check"]);
        match cli.command {
            Command::Check { config } => assert_eq!(config, PathBuf::from("./docregistry.json")),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
