//! Generate command

use clap::Args;
use tracing::info;

use taskpack_tasks::{generate, GenerateOptions};

use crate::cli::{output, Cli};

/// Scaffold a new task from the codegen template
#[derive(Debug, Args)]
pub struct GenerateCommand {
    /// Name of the new task
    #[arg(long)]
    pub name: Option<String>,
}

impl GenerateCommand {
    /// Execute the generate command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(name = ?self.name, "executing generate command");
        let options = GenerateOptions {
            name: self.name.clone(),
        };
        let task = cli.run_stage(|ctx| generate(ctx, &options))?;

        if cli.prints_text() {
            println!("{}", output::field("id", task.id));
            println!("{}", output::field("source", output::path(&task.dir.join(&task.source))));
            output::done(&format!("{} successfully created", output::task(&task.name)));
        }
        Ok(())
    }
}
