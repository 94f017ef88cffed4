//! CLI commands.

mod port_check;
mod runs;
mod testsets;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ostf_testrun::AdapterClient;

use crate::output::OutputFormat;

/// ostfctl - drive OSTF test runs and cluster probes.
#[derive(Debug, Parser)]
#[command(name = "ostfctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Base URL of the test-execution service.
    #[arg(
        long,
        global = true,
        env = "OSTF_ADAPTER_URL",
        default_value = "http://127.0.0.1:8777/v1"
    )]
    adapter_url: String,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the testsets available for a cluster.
    Testsets(testsets::TestsetsArgs),

    /// List the tests available for a cluster.
    Tests(testsets::TestsArgs),

    /// Show test runs.
    Runs(runs::RunsCommand),

    /// Start a run and wait for it to finish.
    Run(runs::RunArgs),

    /// Stop the latest run of a testset.
    Stop(runs::StopArgs),

    /// Restart tests of the latest run of a testset.
    Restart(runs::RestartArgs),

    /// Wait for a host:port to accept connections.
    PortCheck(port_check::PortCheckArgs),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Default log filter for the chosen verbosity.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "info,ostf_testrun=debug,ostf_cluster=debug"
        } else {
            "warn"
        }
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let ctx = CommandContext {
            adapter_url: self.adapter_url,
            format: OutputFormat::parse(&self.format),
        };

        match self.command {
            Commands::Testsets(args) => testsets::list_testsets(ctx, args).await,
            Commands::Tests(args) => testsets::list_tests(ctx, args).await,
            Commands::Runs(cmd) => cmd.run(ctx).await,
            Commands::Run(args) => runs::run(ctx, args).await,
            Commands::Stop(args) => runs::stop(ctx, args).await,
            Commands::Restart(args) => runs::restart(ctx, args).await,
            Commands::PortCheck(args) => port_check::port_check(args).await,
            Commands::Version => {
                println!("ostfctl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub adapter_url: String,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Client for the test-execution service.
    pub fn client(&self) -> Result<AdapterClient> {
        AdapterClient::new(&self.adapter_url).context("Failed to create HTTP client")
    }
}
