//! Build command

use clap::Args;
use tracing::info;

use taskpack_tasks::{build, BuildOptions};

use crate::cli::{output, Cli, OutputFormat};

/// Build tasks into the build output directory
#[derive(Debug, Args)]
pub struct BuildCommand {
    /// Reuse the repository-wide node_modules instead of installing per task
    #[arg(long, alias = "skipNpm")]
    pub skip_npm: bool,
}

impl BuildCommand {
    /// Execute the build command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(task = ?cli.task, skip_npm = self.skip_npm, "executing build command");
        let options = BuildOptions {
            task: cli.task.clone(),
            skip_npm: self.skip_npm,
        };
        let summary = cli.run_stage(|ctx| build(ctx, &options))?;

        match cli.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "tasks": summary.tasks.iter().map(|t| serde_json::json!({
                        "task": t.task,
                        "output": t.output_dir.to_string_lossy(),
                    })).collect::<Vec<_>>(),
                    "modules": summary.modules,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text if !cli.quiet => {
                println!();
                for task in &summary.tasks {
                    println!("{}", output::task_line(&task.task, output::path(&task.output_dir)));
                }
                output::done(&format!(
                    "Built {} and {}",
                    output::count(summary.tasks.len(), "task"),
                    output::count(summary.modules.len(), "module")
                ));
            }
            OutputFormat::Text => {}
        }
        Ok(())
    }
}
