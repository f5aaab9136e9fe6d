use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::apply::ApplyOptions;

#[derive(Parser, Debug)]
#[command(
    name = "fabric-lz",
    version,
    about = "Converge a Fabric landing zone: management groups, subscription placement and policy assignments"
)]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a commented sample configuration.
    Init {
        #[arg(short, long, default_value = "landing-zone.yaml")]
        output: PathBuf,

        /// Overwrite if the file already exists
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Validate a configuration without contacting Azure.
    Check {
        #[arg(short, long, default_value = "landing-zone.yaml")]
        config: PathBuf,
    },

    /// Show the ordered declarations a run would converge.
    Plan {
        #[arg(short, long, default_value = "landing-zone.yaml")]
        config: PathBuf,

        /// Simulate a first run against an empty tenant
        #[arg(long, default_value_t = false)]
        offline: bool,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Converge the landing zone against Azure Resource Manager.
    Apply {
        #[arg(short, long, default_value = "landing-zone.yaml")]
        config: PathBuf,

        /// Look up only; report what would be created
        #[arg(long, default_value_t = false)]
        simulate: bool,

        /// ARM bearer token (defaults to the variable named by arm.token_env)
        #[arg(long, env = "ARM_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Override arm.endpoint
        #[arg(long)]
        endpoint: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Command::Init { output, force } => commands::init::run(&output, force),
        Command::Check { config } => commands::check::run(&config),
        Command::Plan {
            config,
            offline,
            json,
        } => commands::plan::run(&config, offline, json).await,
        Command::Apply {
            config,
            simulate,
            token,
            endpoint,
            json,
        } => {
            let options = ApplyOptions {
                simulate,
                token,
                endpoint,
                json,
            };
            commands::apply::run(&config, options).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_arguments() {
        let cli = Cli::parse_from([
            "fabric-lz",
            "apply",
            "--config",
            "lz.yaml",
            "--simulate",
            "--token",
            "abc",
        ]);
        match cli.cmd {
            Command::Apply {
                config,
                simulate,
                token,
                endpoint,
                json,
            } => {
                assert_eq!(config, PathBuf::from("lz.yaml"));
                assert!(simulate);
                assert_eq!(token.as_deref(), Some("abc"));
                assert!(endpoint.is_none());
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
