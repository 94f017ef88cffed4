//! Testset and test listings.

use anyhow::Result;
use clap::Args;
use ostf_testrun::{Test, Testset};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{display_option, print_output};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct TestsetsArgs {
    /// Cluster ID.
    pub cluster: String,
}

#[derive(Debug, Args)]
pub struct TestsArgs {
    /// Cluster ID.
    pub cluster: String,

    /// Only show tests of this testset.
    #[arg(long)]
    pub testset: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct TestsetRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Name")]
    name: String,
}

impl From<Testset> for TestsetRow {
    fn from(testset: Testset) -> Self {
        Self {
            id: testset.id,
            name: testset.name,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct TestRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Testset")]
    testset: String,

    #[tabled(rename = "Name")]
    name: String,

    #[tabled(rename = "Duration", display = "display_option")]
    duration: Option<String>,
}

impl From<Test> for TestRow {
    fn from(test: Test) -> Self {
        Self {
            id: test.id,
            testset: test.testset,
            name: test.name,
            duration: test.duration,
        }
    }
}

pub async fn list_testsets(ctx: CommandContext, args: TestsetsArgs) -> Result<()> {
    let client = ctx.client()?;
    let rows: Vec<TestsetRow> = client
        .testsets(&args.cluster)
        .await?
        .into_iter()
        .map(TestsetRow::from)
        .collect();

    print_output(&rows, ctx.format);
    Ok(())
}

pub async fn list_tests(ctx: CommandContext, args: TestsArgs) -> Result<()> {
    let client = ctx.client()?;
    let rows: Vec<TestRow> = client
        .tests(&args.cluster)
        .await?
        .into_iter()
        .filter(|test| args.testset.as_deref().is_none_or(|t| test.testset == t))
        .map(TestRow::from)
        .collect();

    print_output(&rows, ctx.format);
    Ok(())
}
