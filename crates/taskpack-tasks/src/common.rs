//! Shared modules referenced from `make.json` `common` entries

use std::path::Path;

use serde_json::Value;
use taskpack_core::config::{MODULE_DESCRIPTOR, SCRIPT_MODULES_DIR, TESTS_DIR};
use taskpack_core::error::{Result, TaskError};
use taskpack_core::fsutil::{copy_matching, remove_dir_if_exists, CopyFilter};
use taskpack_core::jsonfile::read_json;
use taskpack_core::make::{BuildConfig, CommonModuleRef, ModuleType};
use taskpack_core::{loc, TaskManifest};
use taskpack_tools::{CompileRequest, ExternalsFetcher, Invocation};
use tracing::debug;

use crate::build::TaskBuilder;
use crate::reporter::StageEvent;

impl TaskBuilder<'_, '_> {
    /// Build a module once per run, then stage it for the task
    pub(crate) fn stage_module(
        &mut self,
        task: &TaskManifest,
        module: &CommonModuleRef,
        out_dir: &Path,
    ) -> Result<()> {
        let module_dir = task.dir.join(&module.module);
        let name = module.module_name();
        let module_out = self.ctx.layout.common_dir.join(&name);

        if module_out.is_dir() {
            debug!(module = %name, "module already built");
        } else {
            if !module_dir.is_dir() {
                return Err(TaskError::DirectoryNotFound {
                    task: task.name.clone(),
                    path: module_dir,
                }
                .into());
            }
            self.build_module(module, &name, &module_dir, &module_out)?;
            self.summary.modules.push(name.clone());
        }

        match module.module_type {
            ModuleType::Node if module.compile => {
                self.ctx.step(format!("installing module {} into task", name));
                let node_modules = task.dir.join("node_modules");
                std::fs::create_dir_all(&node_modules)?;
                remove_dir_if_exists(&node_modules.join(&name))?;
                self.ctx
                    .runner
                    .install(&Invocation::in_dir(&task.dir), Some(&module_out))?;
            }
            ModuleType::Ps => {
                self.ctx.step(format!("copying module {} resources to task", name));
                let dest = out_dir
                    .join(module.dest.as_deref().unwrap_or(SCRIPT_MODULES_DIR))
                    .join(&name);
                copy_matching(&module_out, &dest, &CopyFilter::all_except(&[TESTS_DIR.to_string()])?)?;
            }
            ModuleType::Node => {}
        }
        Ok(())
    }

    fn build_module(
        &self,
        module: &CommonModuleRef,
        name: &str,
        module_dir: &Path,
        module_out: &Path,
    ) -> Result<()> {
        self.ctx.report(StageEvent::ModuleStarted {
            module: name.to_string(),
        });

        // Only a complete build is moved to `module_out`, which marks it as built
        let staging = module_out.with_file_name(format!("{}.partial", name));
        remove_dir_if_exists(&staging)?;
        std::fs::create_dir_all(&staging)?;
        if let Err(err) = self.populate_module(module, name, module_dir, &staging) {
            if let Err(cleanup) = remove_dir_if_exists(&staging) {
                debug!(module = %name, error = %cleanup, "could not remove partial module output");
            }
            return Err(err);
        }
        std::fs::rename(&staging, module_out)?;
        Ok(())
    }

    fn populate_module(
        &self,
        module: &CommonModuleRef,
        name: &str,
        module_dir: &Path,
        module_out: &Path,
    ) -> Result<()> {

        let descriptor_path = module_dir.join(MODULE_DESCRIPTOR);
        if descriptor_path.is_file() {
            let descriptor: Value = read_json(&descriptor_path)?;
            loc::write_resjson(&descriptor, module_dir)?;
        }

        if module.is_compiled() || module_dir.join("tsconfig.json").is_file() {
            let _tsconfig = self.stage_tsconfig(module_dir)?;
            self.ctx.runner.compile(
                &Invocation::in_dir(module_dir),
                &CompileRequest::project(module_dir, module_out),
            )?;
        }

        self.ctx.step("copying module resources");
        let build = BuildConfig::load_from_dir(name, module_dir)?;
        self.copy_resources(module_dir, module_out, &build)?;

        if let Some(externals) = build.externals.as_ref().filter(|e| !e.is_empty()) {
            self.ctx.step("getting module externals");
            ExternalsFetcher::new(self.ctx.runner, &self.ctx.layout.download_dir)
                .fetch_all(externals, module_out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::build::{build, BuildOptions};
    use crate::context::testing::{context, node_task, write};
    use taskpack_core::ToolKind;
    use taskpack_tools::{RecordingToolRunner, ToolCall};
    use tempfile::TempDir;

    #[test]
    fn test_modules_built_once_and_staged_per_task() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        node_task(root, "Alpha", "Alpha", "0");
        node_task(root, "Beta", "Beta", "0");

        let common = root.join("Tasks/Common");
        write(&common.join("PsHelpers/Helpers.psm1"), "function Get-Help {}");
        write(&common.join("PsHelpers/module.json"), r#"{"messages": {"Oops": "Oops"}}"#);
        write(&common.join("PsHelpers/Tests/L0.ps1"), "");
        write(&common.join("NodeHelpers/helpers.ts"), "export {}");
        write(&common.join("NodeHelpers/package.json"), r#"{"name": "node-helpers"}"#);

        let make = r#"{"common": [
            {"module": "../Common/PsHelpers", "type": "ps"},
            {"module": "../Common/NodeHelpers", "type": "node", "compile": true}
        ]}"#;
        write(&root.join("Tasks/Alpha/make.json"), make);
        write(&root.join("Tasks/Beta/make.json"), make);
        write(&root.join("make-options.json"), r#"{"tasks": ["Alpha", "Beta"]}"#);

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let summary = build(&ctx, &BuildOptions::default()).unwrap();

        assert_eq!(summary.modules, vec!["PsHelpers", "NodeHelpers"]);

        let module_out = root.join("_build/Tasks/Common");
        assert!(module_out.join("NodeHelpers/helpers.js").is_file());
        assert!(!module_out.join("PsHelpers/Tests").exists());
        assert!(common.join("PsHelpers/Strings/resources.resjson/en-US/resources.resjson").is_file());

        for task in ["Alpha", "Beta"] {
            let staged = root.join("_build/Tasks").join(task).join("ps_modules/PsHelpers");
            assert!(staged.join("Helpers.psm1").is_file());
            assert!(!staged.join("Tests").exists());
        }

        let module_installs: Vec<_> = runner
            .calls_to(ToolKind::PackageManager)
            .into_iter()
            .filter(|c| matches!(c, ToolCall::Install { package: Some(_), .. }))
            .collect();
        assert_eq!(module_installs.len(), 2);

        // module compile + two task compiles
        assert_eq!(runner.calls_to(ToolKind::Compiler).len(), 3);
    }

    #[test]
    fn test_failed_module_build_is_retried() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        node_task(root, "Alpha", "Alpha", "0");
        let common = root.join("Tasks/Common");
        write(&common.join("NodeHelpers/helpers.ts"), "export {}");
        write(
            &root.join("Tasks/Alpha/make.json"),
            r#"{"common": [{"module": "../Common/NodeHelpers", "type": "node", "compile": true}]}"#,
        );
        let options = BuildOptions {
            task: Some("Alpha".to_string()),
            skip_npm: false,
        };

        let failing = RecordingToolRunner::new().failing(ToolKind::Compiler);
        let (ctx, _) = context(root, &failing);
        assert!(build(&ctx, &options).is_err());
        let module_root = root.join("_build/Tasks/Common");
        assert!(!module_root.join("NodeHelpers").exists());
        assert!(!module_root.join("NodeHelpers.partial").exists());

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let summary = build(&ctx, &options).unwrap();
        assert_eq!(summary.modules, vec!["NodeHelpers"]);
        assert!(module_root.join("NodeHelpers/helpers.js").is_file());
    }

    #[test]
    fn test_missing_module_names_task() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        node_task(root, "Alpha", "Alpha", "0");
        write(
            &root.join("Tasks/Alpha/make.json"),
            r#"{"common": [{"module": "../Common/Missing", "type": "ps"}]}"#,
        );

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let err = build(
            &ctx,
            &BuildOptions {
                task: Some("Alpha".to_string()),
                skip_npm: false,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("Alpha"));
    }
}
