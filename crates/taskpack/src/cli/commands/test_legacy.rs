//! Legacy test command

use clap::Args;
use tracing::info;

use taskpack_tasks::{run_legacy_tests, LegacyTestOptions};

use crate::cli::{output, Cli};

/// Run the legacy suites against an isolated copy of the built tasks
#[derive(Debug, Args)]
pub struct LegacyTestCommand {
    /// Suite path under the compiled tests (defaults to every L0 suite)
    #[arg(long)]
    pub suite: Option<String>,
}

impl LegacyTestCommand {
    /// Execute the legacy test command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(suite = ?self.suite, "executing test-legacy command");
        let options = LegacyTestOptions {
            suite: self.suite.clone(),
        };
        let suites = cli.run_stage(|ctx| run_legacy_tests(ctx, &options))?;

        if cli.prints_text() {
            output::done(&format!("Ran {}", output::count(suites.len(), "legacy suite")));
        }
        Ok(())
    }
}
