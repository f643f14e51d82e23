//! Publish command

use clap::Args;
use tracing::info;

use taskpack_tasks::{publish, PublishOptions};

use crate::cli::{output, Cli};

/// Push the task package to a feed
#[derive(Debug, Args)]
pub struct PublishCommand {
    /// Feed URL to push to
    #[arg(long)]
    pub server: Option<String>,
}

impl PublishCommand {
    /// Execute the publish command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(server = ?self.server, "executing publish command");
        let options = PublishOptions {
            server: self.server.clone(),
        };
        let package = cli.run_stage(|ctx| publish(ctx, &options))?;

        if cli.prints_text() {
            output::done(&format!("Published {}", output::path(&package)));
        }
        Ok(())
    }
}
