//! Package stage
//!
//! Stages the built tasks twice (full content per task, and metadata only
//! with a layout marker), compresses both trees into one archive, writes the
//! nuspec and runs the packager into `_package/pack-target`.

use std::path::{Path, PathBuf};

use taskpack_core::config::{LAYOUT_MARKER, METADATA_FILES, TASK_DESCRIPTOR};
use taskpack_core::error::{InputError, NotFoundError, Result};
use taskpack_core::fsutil::{copy_dir_recursive, copy_entry, remove_dir_if_exists};
use taskpack_core::ToolKind;
use taskpack_tools::{CompressRequest, Invocation};
use tracing::info;

use crate::context::PipelineContext;
use crate::nuspec::render_nuspec;
use crate::reporter::Stage;

/// Package stage options
#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Package version; must be a strict semantic version
    pub version: Option<String>,
}

/// Files produced by the package stage
#[derive(Debug, Clone)]
pub struct PackageOutput {
    /// Task directories included, by output name
    pub tasks: Vec<String>,
    pub archive: PathBuf,
    pub nuspec: PathBuf,
    pub target_dir: PathBuf,
}

/// Validate the version argument
pub fn validate_version(version: Option<&str>) -> Result<semver::Version> {
    let version = version.ok_or_else(|| InputError::Missing("version with --version".to_string()))?;
    semver::Version::parse(version).map_err(|_| {
        InputError::InvalidSemver {
            version: version.to_string(),
        }
        .into()
    })
}

/// Build the package from `_build/Tasks`
pub fn package(ctx: &PipelineContext<'_>, options: &PackageOptions) -> Result<PackageOutput> {
    let version = validate_version(options.version.as_deref())?;
    ctx.ensure(ToolKind::Compressor)?;
    ctx.ensure(ToolKind::Packager)?;

    let layout = &ctx.layout;
    let settings = &ctx.config.package;
    if !layout.build_dir.is_dir() {
        return Err(NotFoundError::Path(layout.build_dir.clone()).into());
    }

    let tasks = built_tasks(&layout.build_dir, &layout.common_dir)?;
    let timer = ctx.start_stage(Stage::Package, tasks.len());
    remove_dir_if_exists(&layout.package_dir)?;

    let individual = layout.individual_staging_dir();
    let wrapper = layout.wrapper_staging_dir();
    std::fs::create_dir_all(&individual)?;
    std::fs::create_dir_all(&wrapper)?;

    ctx.step("staging content for individual task zips");
    for task in &tasks {
        copy_dir_recursive(&layout.build_dir.join(task), &individual.join(task))?;
    }

    ctx.step("staging metadata for wrapper zip");
    for task in &tasks {
        stage_metadata(&layout.build_dir.join(task), &wrapper.join(task))?;
    }
    std::fs::write(wrapper.join(LAYOUT_MARKER), &settings.layout_version)?;

    let archive = layout.pack_source_dir().join("contents").join(&settings.zip_name);
    if let Some(parent) = archive.parent() {
        std::fs::create_dir_all(parent)?;
    }
    ctx.step("creating tasks zip");
    ctx.runner.compress(
        &Invocation::in_dir(&layout.root),
        &CompressRequest {
            script: layout.root.join(&settings.compress_script),
            individual: individual.clone(),
            wrapper: wrapper.clone(),
            zip: archive.clone(),
        },
    )?;

    ctx.step("generating nuspec");
    let nuspec = layout.pack_source_dir().join(format!("{}.nuspec", settings.id));
    std::fs::write(&nuspec, render_nuspec(settings, &version.to_string()))?;

    let target_dir = layout.pack_target_dir();
    std::fs::create_dir_all(&target_dir)?;
    ctx.runner.pack(&Invocation::in_dir(&layout.root), &nuspec, &target_dir)?;

    info!(version = %version, tasks = tasks.len(), "package created");
    timer.finish(ctx);
    Ok(PackageOutput {
        tasks,
        archive,
        nuspec,
        target_dir,
    })
}

/// Built task directories that carry a descriptor, sorted, skipping shared modules
fn built_tasks(build_dir: &Path, common_dir: &Path) -> Result<Vec<String>> {
    let mut tasks = Vec::new();
    for entry in std::fs::read_dir(build_dir)? {
        let path = entry?.path();
        if !path.is_dir() || path == common_dir || !path.join(TASK_DESCRIPTOR).is_file() {
            continue;
        }
        if let Some(name) = path.file_name() {
            tasks.push(name.to_string_lossy().to_string());
        }
    }
    tasks.sort();
    Ok(tasks)
}

fn stage_metadata(task_dir: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    for name in METADATA_FILES {
        let source = task_dir.join(name);
        if source.exists() {
            copy_entry(&source, &dest.join(name))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{context, write};
    use taskpack_core::TaskpackError;
    use taskpack_tools::{RecordingToolRunner, ToolCall};
    use tempfile::TempDir;

    fn built_repo(root: &Path) {
        write(&root.join("_build/Tasks/Alpha/task.json"), "{}");
        write(&root.join("_build/Tasks/Alpha/alpha.js"), "");
        write(&root.join("_build/Tasks/Alpha/icon.png"), "");
        write(&root.join("_build/Tasks/Alpha/Strings/resources.resjson/en-US/resources.resjson"), "{}");
        write(&root.join("_build/Tasks/Common/Helpers/module.json"), "{}");
        write(&root.join("_build/Tasks/Scratch/notes.txt"), "");
    }

    fn options(version: &str) -> PackageOptions {
        PackageOptions {
            version: Some(version.to_string()),
        }
    }

    #[test]
    fn test_package_layout_and_nuspec() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        built_repo(root);

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let output = package(&ctx, &options("1.2.3")).unwrap();

        assert_eq!(output.tasks, vec!["Alpha"]);
        let pkg = root.join("_package");
        assert!(pkg.join("individual-zip-staging/Alpha/alpha.js").is_file());
        assert!(pkg.join("wrapper-zip-staging/Alpha/task.json").is_file());
        assert!(pkg.join("wrapper-zip-staging/Alpha/Strings").is_dir());
        assert!(!pkg.join("wrapper-zip-staging/Alpha/alpha.js").exists());
        assert!(!pkg.join("individual-zip-staging/Common").exists());
        assert_eq!(
            std::fs::read_to_string(pkg.join("wrapper-zip-staging/layout-version.txt")).unwrap(),
            "2"
        );

        let nuspec = std::fs::read_to_string(&output.nuspec).unwrap();
        assert!(nuspec.contains("<version>1.2.3</version>"));
        assert_eq!(
            output.nuspec,
            pkg.join("pack-source/OpenBank.Build.Tasks.nuspec")
        );
        assert!(pkg.join("pack-target/OpenBank.Build.Tasks.1.2.3.nupkg").is_file());

        let compress = runner.calls_to(ToolKind::Compressor);
        assert!(matches!(
            &compress[0],
            ToolCall::Compress(req) if req.zip.ends_with("pack-source/contents/Microsoft.TeamFoundation.Build.Tasks.zip")
        ));
        assert_eq!(runner.calls_to(ToolKind::Packager).len(), 1);
    }

    #[test]
    fn test_invalid_versions_abort_before_packing() {
        for bad in ["1.0", "abc"] {
            let temp = TempDir::new().unwrap();
            let root = temp.path();
            built_repo(root);
            std::fs::create_dir_all(root.join("_package/keep")).unwrap();

            let runner = RecordingToolRunner::new();
            let (ctx, _) = context(root, &runner);
            let err = package(&ctx, &options(bad)).unwrap_err();
            assert!(matches!(
                err,
                TaskpackError::Input(InputError::InvalidSemver { ref version }) if version == bad
            ));
            assert!(runner.calls_to(ToolKind::Packager).is_empty());
            assert!(runner.calls_to(ToolKind::Compressor).is_empty());
            assert!(root.join("_package/keep").is_dir());
        }
    }

    #[test]
    fn test_missing_version() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(temp.path(), &runner);
        let err = package(&ctx, &PackageOptions::default()).unwrap_err();
        assert!(matches!(err, TaskpackError::Input(InputError::Missing(_))));
        assert!(err.to_string().contains("--version"));
    }

    #[test]
    fn test_old_powershell_rejected() {
        let temp = TempDir::new().unwrap();
        built_repo(temp.path());
        let runner = RecordingToolRunner::new().with_version(ToolKind::Compressor, "4");
        let (ctx, _) = context(temp.path(), &runner);
        assert!(package(&ctx, &options("1.0.0")).is_err());
        assert!(!temp.path().join("_package").exists());
    }
}
