use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

use crate::config::{EngineConfig, StorageArgs};
use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};
use crate::types::Phase;

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub storage: StorageArgs,

    #[command(flatten)]
    pub engine: EngineConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the goal engine over MCP
    Start(ServerArgs),
    /// Show the active goal and its scores
    Status,
    /// Start a new goal
    Create {
        title: String,
        /// Target duration in days
        #[arg(long)]
        days: Option<f64>,
        /// First day of the goal (YYYY-MM-DD), defaults to today
        #[arg(long)]
        start: Option<String>,
    },
    /// Record a checkpoint for a day on the active goal
    Log {
        #[arg(long, value_enum)]
        phase: Phase,
        /// Energy level, 0-100
        #[arg(long)]
        energy: f64,
        /// Nominal output target before energy adjustment
        #[arg(long)]
        target: Option<f64>,
        /// Output actually done
        #[arg(long)]
        done: f64,
        /// Day to log (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Settle today from an energy level and a 0-100 progress value
    Settle {
        #[arg(long)]
        energy: f64,
        #[arg(long)]
        progress: f64,
    },
    /// Edit the active goal
    Update {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        days: Option<f64>,
    },
    /// Mark the active goal completed
    Complete,
    /// Give up on the active goal
    Abandon,
    /// Erase all goals, including the archive
    Reset {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Enable stdio transport
    #[arg(long, env = "YOH_ENABLE_STDIO", default_value_t = true, action = clap::ArgAction::Set)]
    pub enable_stdio: bool,

    /// Enable streamable HTTP transport
    #[arg(long, env = "YOH_ENABLE_HTTP", default_value_t = false, action = clap::ArgAction::Set)]
    pub enable_http: bool,

    /// HTTP bind address (streamable HTTP)
    #[arg(long, env = "YOH_HTTP_ADDR", default_value = "127.0.0.1:8080")]
    pub http_addr: String,
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            enable_stdio: true,
            enable_http: false,
            http_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerArgs {
    /// Validate CLI/environment-derived arguments.
    pub fn validate(&self) -> Result<(), String> {
        if !self.enable_stdio && !self.enable_http {
            return Err("Enable at least one transport (stdio or http)".to_string());
        }
        if self.enable_http {
            self.http_addr
                .parse::<SocketAddr>()
                .map_err(|e| format!("Invalid YOH_HTTP_ADDR '{}': {e}", self.http_addr))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_args_validation() {
        assert!(ServerArgs::default().validate().is_ok());

        let none = ServerArgs {
            enable_stdio: false,
            ..ServerArgs::default()
        };
        assert!(none.validate().is_err());

        let bad_addr = ServerArgs {
            enable_http: true,
            http_addr: "nowhere".to_string(),
            ..ServerArgs::default()
        };
        assert!(bad_addr.validate().is_err());
    }

    #[test]
    fn test_parse_log_command() {
        let cli = Cli::try_parse_from([
            "yearofhorse",
            "--auto-complete",
            "--completion-policy",
            "days-required",
            "log",
            "--phase",
            "morning",
            "--energy",
            "70",
            "--done",
            "1.5",
        ])
        .unwrap();
        assert!(cli.engine.auto_complete);
        assert_eq!(
            cli.engine.completion_policy,
            crate::scoring::CompletionPolicy::DaysRequired
        );
        match cli.command {
            Command::Log {
                phase, energy, target, ..
            } => {
                assert_eq!(phase, Phase::Morning);
                assert_eq!(energy, 70.0);
                assert!(target.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_start_defaults() {
        let cli = Cli::try_parse_from(["yearofhorse", "start"]).unwrap();
        let Command::Start(args) = cli.command else {
            panic!("expected start");
        };
        assert!(args.enable_stdio);
        assert!(!args.enable_http);
    }
}
