//! CornCob CLI - command-line interface for the link-chain sync protocol.
//!
//! Provides commands for:
//! - Cloning a remote's initial graph
//! - Registering and forgetting remotes
//! - Publishing, fetching, and merging link-chain updates
//! - Inspecting configured remotes
//! - Authenticating OAuth-backed remotes (Drive, Dropbox)

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;
mod remotes;

use commands::add::AddCommand;
use commands::clone::CloneCommand;
use commands::config::ConfigCommand;
use commands::fetch::FetchCommand;
use commands::login::LoginCommand;
use commands::merge::MergeCommand;
use commands::push::PushCommand;
use commands::remove::RemoveCommand;
use output::OutputFormat;

use corncob_core::domain::errors::CorncobError;

#[derive(Debug, Parser)]
#[command(name = "corncob", version, about = "Content-addressed link-chain sync over untrusted blob storage")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Bootstrap a fresh local graph from a remote's initial link
    Clone(CloneCommand),
    /// Register a remote
    Add(AddCommand),
    /// Forget a configured remote
    Remove(RemoveCommand),
    /// Publish local branch heads as a new link
    Push(PushCommand),
    /// Walk a remote's link chain and integrate missing bundles
    Fetch(FetchCommand),
    /// Merge a remote's fetched refs into local branches
    Merge(MergeCommand),
    /// Inspect configured remotes
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Authenticate an OAuth-backed remote (Drive, Dropbox)
    Login(LoginCommand),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Human };

    let result = dispatch(cli.command, format).await;

    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            let formatter = output::get_formatter(matches!(format, OutputFormat::Json));
            formatter.error(&format!("{err:#}"));
            exit_code_for(&err)
        }
    });
}

async fn dispatch(command: Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Clone(cmd) => cmd.execute(format).await,
        Commands::Add(cmd) => cmd.execute(format).await,
        Commands::Remove(cmd) => cmd.execute(format).await,
        Commands::Push(cmd) => cmd.execute(format).await,
        Commands::Fetch(cmd) => cmd.execute(format).await,
        Commands::Merge(cmd) => cmd.execute(format).await,
        Commands::Config(cmd) => cmd.execute(format).await,
        Commands::Login(cmd) => cmd.execute(format).await,
    }
}

/// Maps a failed command's error to the exit code table: `1` for a generic
/// failure, `3` when the underlying VCS engine itself reported a non-zero
/// exit (`2`, usage errors, is handled by clap before we ever get here).
fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<CorncobError>() {
        Some(CorncobError::VcsEngineFailed { .. }) => 3,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vcs_engine_failure_maps_to_exit_code_three() {
        let err = anyhow::Error::new(CorncobError::VcsEngineFailed {
            exit_code: 128,
            stderr: "fatal: not a repository".to_string(),
        });
        assert_eq!(exit_code_for(&err), 3);
    }

    #[test]
    fn other_corncob_errors_map_to_exit_code_one() {
        let err = anyhow::Error::new(CorncobError::EmptyRemote);
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn non_corncob_errors_map_to_exit_code_one() {
        let err = anyhow::anyhow!("some other failure");
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn cli_parses_push_with_default_branches() {
        let cli = Cli::parse_from(["corncob", "push", "origin"]);
        match cli.command {
            Commands::Push(cmd) => {
                let _ = cmd;
            }
            _ => panic!("expected Push command"),
        }
    }
}
