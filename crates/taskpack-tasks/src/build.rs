//! Build stage
//!
//! Turns each resolved task into `_build/Tasks/<outputName>`: localisation
//! files, externals, shared modules, compiled sources, staged script
//! dependencies and resources, in that order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use taskpack_core::config::{SkipNpmFallback, PACKAGE_JSON, SCRIPT_MODULES_DIR, TASK_DESCRIPTOR, TESTS_DIR};
use taskpack_core::error::{Result, TaskError};
use taskpack_core::fsutil::{
    apply_copy_group, apply_remove_group, copy_dir_recursive, copy_matching, CopyFilter, StagedFile,
};
use taskpack_core::jsonfile::read_json;
use taskpack_core::make::BuildConfig;
use taskpack_core::{loc, PackageManifest, TaskManifest, ToolKind};
use taskpack_tools::{CompileRequest, ExternalsFetcher, Invocation};
use tracing::{debug, info, warn};

use crate::context::PipelineContext;
use crate::reporter::Stage;

/// Build stage options
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Task pattern; `None` builds the default list
    pub task: Option<String>,
    /// Reuse the repository-wide `node_modules` instead of installing
    pub skip_npm: bool,
}

/// One task's build result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTask {
    pub task: String,
    pub output_dir: PathBuf,
}

/// Result of a build run
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub tasks: Vec<BuiltTask>,
    /// Shared modules built during this run
    pub modules: Vec<String>,
}

/// Build the resolved tasks
pub fn build(ctx: &PipelineContext<'_>, options: &BuildOptions) -> Result<BuildSummary> {
    ctx.ensure(ToolKind::Compiler)?;
    ctx.ensure(ToolKind::PackageManager)?;

    let tasks = ctx.resolve(options.task.as_deref())?;
    let manifests = load_manifests(ctx, &tasks)?;
    let resources = ctx.options_or_default()?.resources();

    let timer = ctx.start_stage(Stage::Build, manifests.len());
    let mut builder = TaskBuilder {
        ctx,
        options,
        resources,
        summary: BuildSummary::default(),
    };
    for manifest in &manifests {
        ctx.run_task(Stage::Build, &manifest.name, || builder.build_task(manifest))?;
    }
    timer.finish(ctx);

    info!(tasks = builder.summary.tasks.len(), "build successful");
    Ok(builder.summary)
}

/// Load every manifest up front and reject duplicate output names
fn load_manifests(ctx: &PipelineContext<'_>, tasks: &[String]) -> Result<Vec<TaskManifest>> {
    let mut outputs: HashMap<String, String> = HashMap::new();
    let mut manifests = Vec::with_capacity(tasks.len());

    for task in tasks {
        let manifest = TaskManifest::load(&ctx.layout, task)?;
        if let Some(first) = outputs.insert(manifest.output_name.clone(), task.clone()) {
            return Err(TaskError::DuplicateOutput {
                first,
                second: task.clone(),
                output: manifest.output_name,
            }
            .into());
        }
        manifests.push(manifest);
    }
    Ok(manifests)
}

pub(crate) struct TaskBuilder<'c, 'a> {
    pub(crate) ctx: &'c PipelineContext<'a>,
    options: &'c BuildOptions,
    pub(crate) resources: Vec<String>,
    pub(crate) summary: BuildSummary,
}

impl TaskBuilder<'_, '_> {
    fn build_task(&mut self, manifest: &TaskManifest) -> Result<()> {
        let layout = &self.ctx.layout;
        let out_dir = layout.output_dir(&manifest.output_name);
        std::fs::create_dir_all(&out_dir)?;

        if manifest.descriptor.is_some() {
            self.ctx.step("generating localization files");
            let raw: Value = read_json(&manifest.dir.join(TASK_DESCRIPTOR))?;
            loc::write_task_loc_json(&raw, &manifest.dir)?;
            loc::write_resjson(&raw, &manifest.dir)?;
        }

        if let Some(externals) = manifest.build.externals.as_ref().filter(|e| !e.is_empty()) {
            self.ctx.step("getting task externals");
            ExternalsFetcher::new(self.ctx.runner, &layout.download_dir).fetch_all(externals, &out_dir)?;
        }

        for module in &manifest.build.common {
            self.stage_module(manifest, module, &out_dir)?;
        }

        if manifest.needs_compile() {
            self.compile_task(manifest, &out_dir)?;
        }

        if manifest.needs_script_staging() {
            self.stage_script_dependencies(manifest, &out_dir)?;
        }

        self.ctx.step("copying task resources");
        self.copy_resources(&manifest.dir, &out_dir, &manifest.build)?;

        self.summary.tasks.push(BuiltTask {
            task: manifest.name.clone(),
            output_dir: out_dir,
        });
        Ok(())
    }

    /// Install and compile a compiled-runtime task
    fn compile_task(&self, manifest: &TaskManifest, out_dir: &Path) -> Result<()> {
        let layout = &self.ctx.layout;
        let mut install = manifest.dir.join(PACKAGE_JSON).is_file();

        if self.options.skip_npm {
            if layout.node_modules.is_dir() {
                self.ctx.step("copying shared node_modules");
                copy_dir_recursive(&layout.node_modules, &manifest.dir.join("node_modules"))?;
                install = false;
            } else {
                match self.ctx.config.build.skip_npm_fallback {
                    SkipNpmFallback::Install => {
                        warn!(
                            task = %manifest.name,
                            path = %layout.node_modules.display(),
                            "shared node_modules not found, installing instead"
                        );
                    }
                    SkipNpmFallback::Error => {
                        return Err(TaskError::Requirement {
                            task: manifest.name.clone(),
                            message: format!(
                                "--skip-npm requested but {} does not exist",
                                layout.node_modules.display()
                            ),
                        }
                        .into());
                    }
                }
            }
        }

        let _tsconfig = self.stage_tsconfig(&manifest.dir)?;
        let invocation = Invocation::in_dir(&manifest.dir);
        if install {
            self.ctx.runner.install(&invocation, None)?;
        }
        self.ctx
            .runner
            .compile(&invocation, &CompileRequest::project(&manifest.dir, out_dir))
    }

    /// Install a script-runtime task's SDK and copy it next to the scripts
    fn stage_script_dependencies(&self, manifest: &TaskManifest, out_dir: &Path) -> Result<()> {
        let package_path = manifest.dir.join(PACKAGE_JSON);
        if !package_path.is_file() {
            return Ok(());
        }

        let package = PackageManifest::load(&manifest.name, &package_path)?;
        let sdk = &self.ctx.config.build.script_sdk;
        let dependencies = package.dependency_names();
        if let Some(other) = dependencies.iter().find(|d| *d != sdk) {
            return Err(TaskError::Requirement {
                task: manifest.name.clone(),
                message: format!(
                    "script tasks may only depend on '{}', found '{}'",
                    sdk, other
                ),
            }
            .into());
        }

        self.ctx.step("installing script dependencies");
        self.ctx.runner.install(&Invocation::in_dir(&manifest.dir), None)?;

        for dependency in &dependencies {
            let installed = manifest.dir.join("node_modules").join(dependency);
            if !installed.is_dir() {
                return Err(TaskError::FileNotFound {
                    task: manifest.name.clone(),
                    path: installed,
                }
                .into());
            }
            copy_dir_recursive(&installed, &out_dir.join(SCRIPT_MODULES_DIR).join(dependency))?;
        }
        Ok(())
    }

    /// Copy the repository compiler configuration into `dir` for one compile
    pub(crate) fn stage_tsconfig(&self, dir: &Path) -> Result<Option<StagedFile>> {
        let tsconfig = &self.ctx.layout.tsconfig;
        if !tsconfig.is_file() {
            debug!(path = %tsconfig.display(), "no repository compiler configuration");
            return Ok(None);
        }
        StagedFile::stage(tsconfig, dir).map(Some)
    }

    /// Default resources, then `cp` groups, then `rm` groups
    pub(crate) fn copy_resources(&self, src: &Path, out_dir: &Path, build: &BuildConfig) -> Result<()> {
        let filter = CopyFilter::new(&self.resources)?.excluding(&[TESTS_DIR.to_string()])?;
        copy_matching(src, out_dir, &filter)?;

        for group in &build.cp {
            apply_copy_group(src, out_dir, group)?;
        }
        for group in &build.rm {
            apply_remove_group(out_dir, group)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{context, node_task, read_json, write};
    use taskpack_core::error::TaskpackError;
    use taskpack_tools::{RecordingToolRunner, ToolCall};
    use tempfile::TempDir;

    fn options_file(root: &Path, tasks: &[&str]) {
        let list: Vec<String> = tasks.iter().map(|t| format!("\"{}\"", t)).collect();
        write(
            &root.join("make-options.json"),
            &format!("{{\"tasks\": [{}]}}", list.join(", ")),
        );
    }

    #[test]
    fn test_build_alpha_and_beta() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        node_task(root, "Alpha", "Alpha", "3");
        write(&root.join("Tasks/Beta/readme.md"), "# Beta");
        write(&root.join("Tasks/Beta/run.sh"), "echo beta");
        write(&root.join("Tasks/Beta/Tests/L0.ts"), "");
        write(&root.join("tsconfig.json"), "{}");
        options_file(root, &["Alpha", "Beta"]);

        let runner = RecordingToolRunner::new();
        let (ctx, events) = context(root, &runner);
        let summary = build(&ctx, &BuildOptions::default()).unwrap();

        let alpha = root.join("_build/Tasks/Alpha");
        let beta = root.join("_build/Tasks/Beta");
        assert_eq!(summary.tasks.len(), 2);
        assert_eq!(summary.tasks[0].output_dir, alpha);

        assert!(alpha.join("alpha.js").is_file());
        assert!(alpha.join("task.json").is_file());
        assert!(alpha.join("task.loc.json").is_file());
        assert!(alpha.join("icon.png").is_file());
        assert!(alpha.join("Strings/resources.resjson/en-US/resources.resjson").is_file());
        assert!(beta.join("readme.md").is_file());
        assert!(beta.join("run.sh").is_file());
        assert!(!beta.join("Tests").exists());

        let loc = read_json(&root.join("Tasks/Alpha/task.loc.json"));
        assert_eq!(loc["friendlyName"], "ms-resource:loc.friendlyName");
        assert!(!root.join("Tasks/Alpha/tsconfig.json").exists());

        assert_eq!(runner.calls_to(ToolKind::Compiler).len(), 1);
        assert_eq!(runner.calls_to(ToolKind::PackageManager).len(), 1);
        assert!(!events.events().is_empty());
    }

    #[test]
    fn test_tsconfig_removed_when_compile_fails() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        node_task(root, "Alpha", "Alpha", "0");
        write(&root.join("tsconfig.json"), "{}");
        options_file(root, &["Alpha"]);

        let runner = RecordingToolRunner::new().failing(ToolKind::Compiler);
        let (ctx, _) = context(root, &runner);
        assert!(build(&ctx, &BuildOptions::default()).is_err());
        assert!(!root.join("Tasks/Alpha/tsconfig.json").exists());
    }

    #[test]
    fn test_missing_compiler_aborts_before_work() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        node_task(root, "Alpha", "Alpha", "0");
        options_file(root, &["Alpha"]);

        let runner = RecordingToolRunner::new().with_version(ToolKind::Compiler, "Version 1.8.6");
        let (ctx, _) = context(root, &runner);
        let err = build(&ctx, &BuildOptions::default()).unwrap_err();
        assert!(err.to_string().contains("tsc"));
        assert!(!root.join("_build").exists());
    }

    #[test]
    fn test_duplicate_output_names_both_tasks() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        node_task(root, "AlphaV1", "Alpha", "0");
        node_task(root, "AlphaV2", "Alpha", "0");
        options_file(root, &["AlphaV1", "AlphaV2"]);

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        match build(&ctx, &BuildOptions::default()).unwrap_err() {
            TaskpackError::Task(TaskError::DuplicateOutput { first, second, output }) => {
                assert_eq!(first, "AlphaV1");
                assert_eq!(second, "AlphaV2");
                assert_eq!(output, "Alpha");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(runner.calls_to(ToolKind::Compiler).is_empty());
    }

    #[test]
    fn test_skip_npm_copies_shared_modules() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        node_task(root, "Alpha", "Alpha", "0");
        write(&root.join("node_modules/shared-lib/index.js"), "");

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let options = BuildOptions {
            task: Some("Alpha".to_string()),
            skip_npm: true,
        };
        build(&ctx, &options).unwrap();

        assert!(runner.calls_to(ToolKind::PackageManager).is_empty());
        assert!(root.join("_build/Tasks/Alpha/node_modules/shared-lib/index.js").is_file());
    }

    #[test]
    fn test_skip_npm_without_cache() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        node_task(root, "Alpha", "Alpha", "0");
        let options = BuildOptions {
            task: Some("Alpha".to_string()),
            skip_npm: true,
        };

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        build(&ctx, &options).unwrap();
        assert_eq!(runner.calls_to(ToolKind::PackageManager).len(), 1);

        let strict = RecordingToolRunner::new();
        let (mut ctx, _) = context(root, &strict);
        ctx.config.build.skip_npm_fallback = SkipNpmFallback::Error;
        let err = build(&ctx, &options).unwrap_err();
        assert!(matches!(err, TaskpackError::Task(TaskError::Requirement { .. })));
    }

    #[test]
    fn test_script_task_stages_sdk() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let task = root.join("Tasks/PsTask");
        write(
            &task.join("task.json"),
            r#"{"name": "PsTask", "version": {"Major": 0, "Minor": 1, "Patch": 0},
                "execution": {"PowerShell3": {"target": "run.ps1"}}}"#,
        );
        write(&task.join("run.ps1"), "Write-Host hi");
        write(
            &task.join("package.json"),
            r#"{"name": "ps-task", "dependencies": {"vsts-task-sdk": "0.6.0"}}"#,
        );

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        build(
            &ctx,
            &BuildOptions {
                task: Some("PsTask".to_string()),
                skip_npm: false,
            },
        )
        .unwrap();

        let out = root.join("_build/Tasks/PsTask");
        assert!(out.join("run.ps1").is_file());
        assert!(out.join("ps_modules/vsts-task-sdk/package.json").is_file());
        assert!(runner.calls_to(ToolKind::Compiler).is_empty());
    }

    #[test]
    fn test_script_task_rejects_other_dependencies() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let task = root.join("Tasks/PsTask");
        write(
            &task.join("task.json"),
            r#"{"name": "PsTask", "version": {"Major": 0, "Minor": 1, "Patch": 0},
                "execution": {"PowerShell3": {"target": "run.ps1"}}}"#,
        );
        write(
            &task.join("package.json"),
            r#"{"dependencies": {"vsts-task-sdk": "0.6.0", "left-pad": "1.0.0"}}"#,
        );

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let err = build(
            &ctx,
            &BuildOptions {
                task: Some("PsTask".to_string()),
                skip_npm: false,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("left-pad"));
    }

    #[test]
    fn test_copy_and_remove_groups() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let task = root.join("Tasks/Gamma");
        write(&task.join("lib/data.json"), "{}");
        write(&task.join("notes.txt"), "keep");
        write(&task.join("draft.md"), "remove");
        write(
            &task.join("make.json"),
            r#"{"cp": [{"source": "lib/*.json", "dest": "lib"}], "rm": [{"items": ["draft.md"]}]}"#,
        );

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        build(
            &ctx,
            &BuildOptions {
                task: Some("Gamma".to_string()),
                skip_npm: false,
            },
        )
        .unwrap();

        let out = root.join("_build/Tasks/Gamma");
        assert!(out.join("lib/data.json").is_file());
        assert!(out.join("notes.txt").is_file());
        assert!(!out.join("draft.md").exists());
        assert!(!runner.calls().iter().any(|c| matches!(c, ToolCall::Compile { .. })));
    }
}
