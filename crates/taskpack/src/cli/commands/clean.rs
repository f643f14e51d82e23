//! Clean command

use clap::Args;
use tracing::info;

use crate::cli::{output, Cli};

/// Remove build, test and package output
#[derive(Debug, Args)]
pub struct CleanCommand {}

impl CleanCommand {
    /// Execute the clean command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(task = ?cli.task, "executing clean command");
        let tasks = cli.run_stage(|ctx| taskpack_tasks::clean(ctx, cli.task.as_deref()))?;

        if cli.prints_text() {
            output::done(&format!("Cleaned {}", output::count(tasks.len(), "task")));
        }
        Ok(())
    }
}
