//! Shell completions for the taskpack command line

use std::path::PathBuf;

use clap::{Args, CommandFactory};
use clap_complete::{generate, generate_to, Shell};
use tracing::info;

use crate::cli::{output, Cli, OutputFormat};

const BIN_NAME: &str = "taskpack";

/// Print or install completions for the stage commands and their flags
#[derive(Debug, Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script into this directory under the shell's file name
    /// (`taskpack.bash`, `_taskpack`, `taskpack.fish`, ...)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

impl CompletionsCommand {
    /// Execute the completions command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(shell = %self.shell, dir = ?self.dir, "executing completions command");
        let Some(dir) = &self.dir else {
            print!("{}", script(self.shell)?);
            return Ok(());
        };

        let path = install(self.shell, dir)?;
        match cli.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "shell": self.shell.to_string(),
                    "path": path.to_string_lossy(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text if !cli.quiet => {
                output::done(&format!(
                    "{} completions written to {}",
                    self.shell,
                    output::path(&path)
                ));
            }
            OutputFormat::Text => {}
        }
        Ok(())
    }
}

/// Completion script for `shell`
fn script(shell: Shell) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    generate(shell, &mut Cli::command(), BIN_NAME, &mut buf);
    Ok(String::from_utf8(buf)?)
}

/// Write the completion script into `dir`, returning its path
fn install(shell: Shell, dir: &std::path::Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(generate_to(shell, &mut Cli::command(), BIN_NAME, dir)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_script_lists_stage_commands() {
        let script = script(Shell::Bash).unwrap();
        for command in [
            "clean",
            "build",
            "test-legacy",
            "package",
            "publish",
            "bump",
            "make-extensions",
            "generate",
            "doctor",
        ] {
            assert!(script.contains(command), "missing {command}");
        }
    }

    #[test]
    fn test_zsh_script_completes_stage_flags() {
        let script = script(Shell::Zsh).unwrap();
        for flag in ["--skip-npm", "--server", "--exts", "--suite", "--task"] {
            assert!(script.contains(flag), "missing {flag}");
        }
    }

    #[test]
    fn test_install_uses_shell_file_name() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("completions");

        let bash = install(Shell::Bash, &dir).unwrap();
        assert_eq!(bash, dir.join("taskpack.bash"));
        let zsh = install(Shell::Zsh, &dir).unwrap();
        assert_eq!(zsh, dir.join("_taskpack"));
        assert!(std::fs::read_to_string(zsh).unwrap().contains("#compdef taskpack"));
    }
}
