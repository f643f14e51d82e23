//! Tool runner backed by child processes

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use taskpack_core::config::{ToolsConfig, POWERSHELL_ARGS};
use taskpack_core::error::{Result, ToolError};
use taskpack_core::ToolKind;
use tracing::{debug, info};

use crate::traits::{CompileRequest, CompressRequest, Invocation, ToolRunner};

/// Runs the configured tools as child processes with inherited stdio
#[derive(Debug, Clone, Default)]
pub struct ProcessToolRunner {
    tools: ToolsConfig,
}

impl ProcessToolRunner {
    /// Create a runner for the configured tool table
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }

    fn command(&self, kind: ToolKind) -> &str {
        &self.tools.get(kind).command
    }

    fn run(&self, kind: ToolKind, invocation: &Invocation, args: Vec<OsString>) -> Result<()> {
        let program = self.command(kind);
        let line = command_line(program, &args);
        info!(tool = %kind, cwd = %invocation.cwd.display(), "{}", line);

        let status = Command::new(program)
            .args(&args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .status()
            .map_err(|e| ToolError::Launch {
                command: line.clone(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(ToolError::Failed {
                tool: program.to_string(),
                command: line,
                code: status.code(),
            }
            .into());
        }

        debug!(tool = %kind, "command succeeded");
        Ok(())
    }
}

impl ToolRunner for ProcessToolRunner {
    fn version(&self, kind: ToolKind) -> Result<Option<String>> {
        let tool = self.tools.get(kind);
        if which::which(&tool.command).is_err() {
            debug!(tool = %tool.command, "not found on PATH");
            return Ok(None);
        }
        if tool.version_args.is_empty() {
            return Ok(Some(String::new()));
        }

        let output = Command::new(&tool.command)
            .args(&tool.version_args)
            .output()
            .ok()
            .filter(|o| o.status.success())
            .map(|o| {
                let stdout = String::from_utf8_lossy(&o.stdout);
                let stderr = String::from_utf8_lossy(&o.stderr);
                if stdout.trim().is_empty() {
                    stderr.trim().to_string()
                } else {
                    stdout.trim().to_string()
                }
            });

        debug!(tool = %tool.command, version = ?output, "probed tool version");
        Ok(output)
    }

    fn compile(&self, invocation: &Invocation, request: &CompileRequest) -> Result<()> {
        let mut args: Vec<OsString> = request.sources.iter().map(OsString::from).collect();
        args.push("--outDir".into());
        args.push(request.out_dir.clone().into());
        if let Some(root) = &request.root_dir {
            args.push("--rootDir".into());
            args.push(root.clone().into());
        }
        self.run(ToolKind::Compiler, invocation, args)
    }

    fn install(&self, invocation: &Invocation, package: Option<&Path>) -> Result<()> {
        let mut args: Vec<OsString> = vec!["install".into()];
        if let Some(package) = package {
            args.push(package.into());
        }
        self.run(ToolKind::PackageManager, invocation, args)
    }

    fn run_tests(&self, invocation: &Invocation, specs: &[PathBuf]) -> Result<()> {
        let args = specs.iter().map(OsString::from).collect();
        self.run(ToolKind::TestRunner, invocation, args)
    }

    fn compress(&self, invocation: &Invocation, request: &CompressRequest) -> Result<()> {
        let mut args: Vec<OsString> = POWERSHELL_ARGS.iter().map(OsString::from).collect();
        args.push(
            format!(
                "& '{}' -IndividualZipStagingPath '{}' -WrapperZipStagingPath '{}' -ZipPath '{}'",
                request.script.display(),
                request.individual.display(),
                request.wrapper.display(),
                request.zip.display()
            )
            .into(),
        );
        self.run(ToolKind::Compressor, invocation, args)
    }

    fn pack(&self, invocation: &Invocation, nuspec: &Path, out_dir: &Path) -> Result<()> {
        let args = vec![
            "pack".into(),
            nuspec.into(),
            "-OutputDirectory".into(),
            out_dir.into(),
        ];
        self.run(ToolKind::Packager, invocation, args)
    }

    fn push(
        &self,
        invocation: &Invocation,
        package: &Path,
        server: &str,
        api_key: Option<&str>,
    ) -> Result<()> {
        let mut args: Vec<OsString> = vec!["push".into(), package.into(), "-Source".into(), server.into()];
        if let Some(key) = api_key {
            args.push("-apikey".into());
            args.push(key.into());
        }
        self.run(ToolKind::Publisher, invocation, args)
    }

    fn bundle(&self, invocation: &Invocation, manifest: &str) -> Result<()> {
        let args = vec![
            "extension".into(),
            "create".into(),
            "--manifest-globs".into(),
            manifest.into(),
        ];
        self.run(ToolKind::Bundler, invocation, args)
    }

    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        info!(url, dest = %dest.display(), "downloading");
        let download_err = |reason: String| ToolError::Download {
            url: url.to_string(),
            reason,
        };

        let response = reqwest::blocking::get(url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| download_err(e.to_string()))?;
        let bytes = response.bytes().map_err(|e| download_err(e.to_string()))?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(dest)?;
        file.write_all(&bytes)?;
        debug!(url, bytes = bytes.len(), "download complete");
        Ok(())
    }
}

/// Printable command line for logs and errors
fn command_line(program: &str, args: &[OsString]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}
