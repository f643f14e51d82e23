//! Package command

use clap::Args;
use tracing::info;

use taskpack_tasks::{package, PackageOptions};

use crate::cli::{output, Cli};

/// Create the task package from the build output
#[derive(Debug, Args)]
pub struct PackageCommand {
    /// Package version (strict semantic version)
    #[arg(long = "version", value_name = "VERSION")]
    pub package_version: Option<String>,
}

impl PackageCommand {
    /// Execute the package command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(version = ?self.package_version, "executing package command");
        let options = PackageOptions {
            version: self.package_version.clone(),
        };
        let result = cli.run_stage(|ctx| package(ctx, &options))?;

        if cli.prints_text() {
            println!("{}", output::field("nuspec", output::path(&result.nuspec)));
            println!("{}", output::field("output", output::path(&result.target_dir)));
            output::done(&format!(
                "Packaged {} as version {}",
                output::count(result.tasks.len(), "task"),
                output::version(self.package_version.as_deref().unwrap_or_default())
            ));
        }
        Ok(())
    }
}
