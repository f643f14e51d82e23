//! Bump command

use clap::Args;
use tracing::info;

use crate::cli::{output, Cli, OutputFormat};

/// Increment the patch version of each task
#[derive(Debug, Args)]
pub struct BumpCommand {}

impl BumpCommand {
    /// Execute the bump command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(task = ?cli.task, "executing bump command");
        let bumped = cli.run_stage(|ctx| taskpack_tasks::bump(ctx, cli.task.as_deref()))?;

        match cli.format {
            OutputFormat::Json => {
                let value: Vec<_> = bumped
                    .iter()
                    .map(|b| serde_json::json!({ "task": b.task, "patch": b.patch }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text if !cli.quiet => {
                for task in &bumped {
                    println!(
                        "{}",
                        output::task_line(&task.task, format!("patch {}", output::version(task.patch)))
                    );
                }
                output::done(&format!("Bumped {}", output::count(bumped.len(), "task")));
            }
            OutputFormat::Text => {}
        }
        Ok(())
    }
}
