//! Doctor command - check external tools against their requirements

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use taskpack_core::config::find_config;
use taskpack_core::ToolKind;
use taskpack_tools::{ensure_tool, ProcessToolRunner};

use crate::cli::{output, Cli, OutputFormat};

/// Check external tools against their configured requirements
#[derive(Debug, Args)]
pub struct DoctorCommand {
    /// Only check specific tools
    #[arg(long, value_delimiter = ',')]
    pub only: Option<Vec<ToolArg>>,
}

/// Tool kinds selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ToolArg {
    Compiler,
    PackageManager,
    TestRunner,
    Compressor,
    Packager,
    Publisher,
    Bundler,
}

impl From<ToolArg> for ToolKind {
    fn from(arg: ToolArg) -> Self {
        match arg {
            ToolArg::Compiler => ToolKind::Compiler,
            ToolArg::PackageManager => ToolKind::PackageManager,
            ToolArg::TestRunner => ToolKind::TestRunner,
            ToolArg::Compressor => ToolKind::Compressor,
            ToolArg::Packager => ToolKind::Packager,
            ToolArg::Publisher => ToolKind::Publisher,
            ToolArg::Bundler => ToolKind::Bundler,
        }
    }
}

/// Result of a single check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub tool: String,
    pub command: String,
    pub status: CheckStatus,
    pub requirement: Option<String>,
    pub version: Option<String>,
    pub message: Option<String>,
}

/// Status of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Fail,
}

impl DoctorCommand {
    /// Execute the doctor command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing doctor command");
        let (config, root) = cli.workspace()?;
        let runner = ProcessToolRunner::new(config.tools.clone());

        let kinds: Vec<ToolKind> = match &self.only {
            Some(only) => only.iter().map(|&t| t.into()).collect(),
            None => ToolKind::ALL.to_vec(),
        };

        let checks: Vec<CheckResult> = kinds
            .into_iter()
            .map(|kind| {
                let tool = config.tools.get(kind);
                let mut check = CheckResult {
                    tool: kind.to_string(),
                    command: tool.command.clone(),
                    status: CheckStatus::Ok,
                    requirement: tool.version.clone(),
                    version: None,
                    message: None,
                };
                match ensure_tool(&runner, kind, tool) {
                    Ok(status) => check.version = status.version.map(|v| v.to_string()),
                    Err(err) => {
                        check.status = CheckStatus::Fail;
                        check.message = Some(err.to_string());
                    }
                }
                check
            })
            .collect();
        let fail_count = checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count();

        match cli.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "root": root.to_string_lossy(),
                    "config": find_config(&root).map(|p| p.to_string_lossy().to_string()),
                    "checks": checks,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text if !cli.quiet => {
                println!("{}", style("Checking tools...").bold());
                println!();
                for check in &checks {
                    print_check(check);
                }
                println!();
                if fail_count == 0 {
                    output::done(&format!("All {} passed", output::count(checks.len(), "check")));
                }
            }
            OutputFormat::Text => {}
        }

        if fail_count > 0 {
            anyhow::bail!("{} failed", output::count(fail_count, "check"));
        }
        Ok(())
    }
}

fn print_check(check: &CheckResult) {
    let detail = match (&check.status, &check.version, &check.message) {
        (CheckStatus::Fail, _, Some(message)) => message.clone(),
        (_, Some(version), _) => version.clone(),
        _ => "found".to_string(),
    };
    let requirement = check.requirement.as_deref().unwrap_or("any version");
    match check.status {
        CheckStatus::Ok => println!(
            "  {} {} {} {}",
            style(output::DONE).green(),
            style(&check.tool).green(),
            style(&check.command).dim(),
            style(format!("{} ({})", detail, requirement)).dim()
        ),
        CheckStatus::Fail => println!(
            "  {} {} {} {}",
            style(output::FAILED).red(),
            style(&check.tool).red(),
            style(&check.command).dim(),
            style(detail).dim()
        ),
    }
}
