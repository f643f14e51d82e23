//! Make-extensions command

use clap::Args;
use tracing::info;

use taskpack_tasks::{make_extensions, ExtensionOptions};

use crate::cli::{output, Cli};

/// Generate and bundle marketplace extensions
#[derive(Debug, Args)]
pub struct ExtensionsCommand {
    /// Bundle every task into one composite extension
    #[arg(long)]
    pub all: bool,

    /// Comma-separated list of tasks to bundle individually
    #[arg(long, conflicts_with = "all")]
    pub exts: Option<String>,
}

impl ExtensionsCommand {
    /// Execute the make-extensions command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(all = self.all, exts = ?self.exts, "executing make-extensions command");
        let options = ExtensionOptions {
            task: cli.task.clone(),
            all: self.all,
            exts: self.exts.clone(),
        };
        let tasks = cli.run_stage(|ctx| make_extensions(ctx, &options))?;

        if cli.prints_text() {
            if tasks.is_empty() {
                output::warning("No task with a task.json was found; nothing was bundled");
            } else if self.all {
                output::done(&format!(
                    "Bundled {} into one extension",
                    output::count(tasks.len(), "task")
                ));
            } else {
                output::done(&format!("Bundled {}", output::count(tasks.len(), "extension")));
            }
        }
        Ok(())
    }
}
