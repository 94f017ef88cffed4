//! Test run commands.

use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use ostf_testrun::{restart_with_timeout, run_with_timeout, RunTimeout, TestOutcome, TestRun};
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use crate::output::{
    display_option, print_info, print_output, print_single, print_success, OutputFormat,
};

use super::CommandContext;

/// Test run listings.
#[derive(Debug, Args)]
pub struct RunsCommand {
    #[command(subcommand)]
    command: RunsSubcommand,
}

#[derive(Debug, Subcommand)]
enum RunsSubcommand {
    /// List every test run.
    List,

    /// Latest run of each testset for a cluster.
    Last {
        /// Cluster ID.
        cluster: String,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Cluster ID.
    pub cluster: String,

    /// Testset to run.
    pub testset: String,

    /// Test to run; repeat for several. Runs the whole testset when omitted.
    #[arg(long = "test")]
    pub tests: Vec<String>,

    /// Seconds to wait before stopping the run.
    #[arg(long, default_value = "300")]
    pub timeout: u64,

    /// Seconds between status polls.
    #[arg(long, default_value = "5")]
    pub polling: u64,
}

#[derive(Debug, Args)]
pub struct StopArgs {
    /// Cluster ID.
    pub cluster: String,

    /// Testset whose latest run is stopped.
    pub testset: String,
}

#[derive(Debug, Args)]
pub struct RestartArgs {
    /// Cluster ID.
    pub cluster: String,

    /// Testset whose latest run is restarted.
    pub testset: String,

    /// Test to restart; repeat for several.
    #[arg(long = "test")]
    pub tests: Vec<String>,

    /// Wait up to this many seconds for the restarted run to finish.
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl RunsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let client = ctx.client()?;
        let runs = match self.command {
            RunsSubcommand::List => client.testruns().await?,
            RunsSubcommand::Last { cluster } => client.testruns_last(&cluster).await?,
        };
        print_runs(&runs, ctx.format);
        Ok(())
    }
}

#[derive(Debug, Serialize, Tabled)]
struct RunRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Testset")]
    testset: String,

    #[tabled(rename = "Status")]
    status: String,

    #[tabled(rename = "Passed")]
    passed: String,

    #[tabled(rename = "Started", display = "display_option")]
    started_at: Option<String>,
}

impl From<&TestRun> for RunRow {
    fn from(run: &TestRun) -> Self {
        let passed = run.tests.iter().filter(|t| t.status == "success").count();
        Self {
            id: run.id.to_string(),
            testset: run.testset.clone(),
            status: run.status.to_string(),
            passed: format!("{passed}/{}", run.tests.len()),
            started_at: run.started_at.clone(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Test")]
    id: String,

    #[tabled(rename = "Status")]
    status: String,

    #[tabled(rename = "Taken (s)", display = "display_option")]
    taken: Option<f64>,
}

impl From<&TestOutcome> for OutcomeRow {
    fn from(outcome: &TestOutcome) -> Self {
        Self {
            id: outcome.id.clone(),
            status: outcome.status.clone(),
            taken: outcome.taken,
        }
    }
}

fn print_runs(runs: &[TestRun], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let rows: Vec<RunRow> = runs.iter().map(RunRow::from).collect();
            print_output(&rows, format);
        }
        OutputFormat::Json => print_single(&runs),
    }
}

fn print_finished(runs: &[TestRun], testset: &str, format: OutputFormat) {
    let Some(run) = runs.iter().find(|run| run.testset == testset) else {
        return print_runs(runs, format);
    };
    match format {
        OutputFormat::Table => {
            let rows: Vec<OutcomeRow> = run.tests.iter().map(OutcomeRow::from).collect();
            print_output(&rows, format);
            print_success(&format!("Run {} of {} finished", run.id, run.testset));
        }
        OutputFormat::Json => print_single(run),
    }
}

/// One line of progress for a polling response.
fn progress_line(poll: u32, testset: &str, raw: &Value) -> String {
    let runs: Vec<TestRun> = serde_json::from_value(raw.clone()).unwrap_or_default();
    match runs.iter().find(|run| run.testset == testset) {
        Some(run) => {
            let done = run
                .tests
                .iter()
                .filter(|t| matches!(t.status.as_str(), "success" | "failure" | "error" | "skipped"))
                .count();
            format!(
                "poll {poll}: {testset} is {} ({done}/{} tests done)",
                run.status,
                run.tests.len()
            )
        }
        None => format!("poll {poll}: {raw}"),
    }
}

/// Observer printing one progress line per poll in table mode.
fn progress_printer(format: OutputFormat, testset: &str) -> impl FnMut(&Value) + Send + '_ {
    let mut polls = 0;
    move |raw: &Value| {
        polls += 1;
        if format == OutputFormat::Table {
            print_info(&progress_line(polls, testset, raw));
        }
    }
}

pub async fn run(ctx: CommandContext, args: RunArgs) -> Result<()> {
    let client = ctx.client()?;
    let settings = RunTimeout::new(Duration::from_secs(args.timeout))
        .with_polling(Duration::from_secs(args.polling));

    let format = ctx.format;
    let mut progress = progress_printer(format, &args.testset);

    let runs = run_with_timeout(
        &client,
        &args.testset,
        &args.tests,
        &args.cluster,
        settings,
        Some(&mut progress),
    )
    .await?;

    print_finished(&runs, &args.testset, format);
    Ok(())
}

pub async fn stop(ctx: CommandContext, args: StopArgs) -> Result<()> {
    let client = ctx.client()?;
    let response = client
        .stop_testrun_last(&args.testset, &args.cluster, false)
        .await?;

    match ctx.format {
        OutputFormat::Table => print_success(&format!(
            "Stopped the latest {} run on cluster {}",
            args.testset, args.cluster
        )),
        OutputFormat::Json => print_single(&response),
    }
    Ok(())
}

pub async fn restart(ctx: CommandContext, args: RestartArgs) -> Result<()> {
    let client = ctx.client()?;

    let Some(timeout) = args.timeout else {
        let response = client
            .restart_tests_last(&args.testset, &args.tests, &args.cluster, false)
            .await?;
        match ctx.format {
            OutputFormat::Table => print_success(&format!(
                "Restarted {} test(s) of {} on cluster {}",
                args.tests.len(),
                args.testset,
                args.cluster
            )),
            OutputFormat::Json => print_single(&response),
        }
        return Ok(());
    };

    let format = ctx.format;
    let mut progress = progress_printer(format, &args.testset);

    let runs = restart_with_timeout(
        &client,
        &args.testset,
        &args.tests,
        &args.cluster,
        RunTimeout::new(Duration::from_secs(timeout)),
        Some(&mut progress),
    )
    .await?;

    print_finished(&runs, &args.testset, format);
    Ok(())
}
