//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use taskpack_core::config::{load_config_or_default, Config};
use taskpack_tasks::{PipelineContext, StageReporterRegistry};
use taskpack_tools::ProcessToolRunner;

use commands::{
    BuildCommand, BumpCommand, CleanCommand, CompletionsCommand, DoctorCommand, ExtensionsCommand,
    GenerateCommand, LegacyTestCommand, PackageCommand, PublishCommand, TestCommand,
};
use output::ConsoleReporter;

/// Taskpack - Build, test, package and publish pipeline tasks
#[derive(Debug, Parser)]
#[command(name = "taskpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Repository directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Task name pattern; defaults to the list in make-options.json
    #[arg(long, global = true)]
    pub task: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Remove build, test and package output
    Clean(CleanCommand),

    /// Build tasks into _build/Tasks
    Build(BuildCommand),

    /// Run compiled task test suites
    Test(TestCommand),

    /// Run the legacy L0 suites in an isolated tree
    #[command(alias = "testLegacy")]
    TestLegacy(LegacyTestCommand),

    /// Create the task package
    Package(PackageCommand),

    /// Push the task package to a feed
    Publish(PublishCommand),

    /// Increment the patch version of tasks
    Bump(BumpCommand),

    /// Generate and bundle marketplace extensions
    #[command(alias = "makeExtensions")]
    MakeExtensions(ExtensionsCommand),

    /// Scaffold a new task from the codegen template
    Generate(GenerateCommand),

    /// Check external tools against their requirements
    Doctor(DoctorCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Clean(ref cmd) => cmd.execute(&self),
            Commands::Build(ref cmd) => cmd.execute(&self),
            Commands::Test(ref cmd) => cmd.execute(&self),
            Commands::TestLegacy(ref cmd) => cmd.execute(&self),
            Commands::Package(ref cmd) => cmd.execute(&self),
            Commands::Publish(ref cmd) => cmd.execute(&self),
            Commands::Bump(ref cmd) => cmd.execute(&self),
            Commands::MakeExtensions(ref cmd) => cmd.execute(&self),
            Commands::Generate(ref cmd) => cmd.execute(&self),
            Commands::Doctor(ref cmd) => cmd.execute(&self),
            Commands::Completions(ref cmd) => cmd.execute(&self),
        }
    }

    /// Configuration and repository root for this invocation
    pub fn workspace(&self) -> anyhow::Result<(Config, PathBuf)> {
        let dir = match &self.directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        Ok(load_config_or_default(&dir)?)
    }

    /// Run a stage against the repository with the process tool runner
    pub fn run_stage<T>(
        &self,
        stage: impl FnOnce(&PipelineContext<'_>) -> taskpack_core::Result<T>,
    ) -> anyhow::Result<T> {
        let (config, root) = self.workspace()?;
        let runner = ProcessToolRunner::new(config.tools.clone());

        let mut reporters = StageReporterRegistry::new();
        if !self.quiet && self.format == OutputFormat::Text {
            reporters.register(ConsoleReporter::new(self.verbose));
        }
        let ctx = PipelineContext::new(root, config, &runner).with_reporters(reporters);
        Ok(stage(&ctx)?)
    }

    /// Whether human-readable output should be printed
    pub fn prints_text(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("taskpack").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_legacy_aliases() {
        assert!(matches!(parse(&["testLegacy"]).command, Commands::TestLegacy(_)));
        assert!(matches!(parse(&["test-legacy"]).command, Commands::TestLegacy(_)));
        assert!(matches!(
            parse(&["makeExtensions", "--all"]).command,
            Commands::MakeExtensions(ref cmd) if cmd.all
        ));
        assert!(matches!(
            parse(&["build", "--skipNpm"]).command,
            Commands::Build(ref cmd) if cmd.skip_npm
        ));
    }

    #[test]
    fn test_global_task_and_directory() {
        let cli = parse(&["build", "--task", "Alpha*", "-C", "/repo"]);
        assert_eq!(cli.task.as_deref(), Some("Alpha*"));
        assert_eq!(cli.directory, Some(PathBuf::from("/repo")));
    }

    #[test]
    fn test_package_version_flag() {
        match parse(&["package", "--version", "1.2.3"]).command {
            Commands::Package(cmd) => assert_eq!(cmd.package_version.as_deref(), Some("1.2.3")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verify_command() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
