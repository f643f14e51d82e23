//! Publish stage: push the single package in `_package/pack-target`

use std::path::PathBuf;

use taskpack_core::error::{InputError, NotFoundError, Result};
use taskpack_core::ToolKind;
use taskpack_tools::Invocation;
use tracing::info;

use crate::context::PipelineContext;
use crate::reporter::Stage;

/// Publish stage options
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Feed to push to
    pub server: Option<String>,
}

/// Push the package; returns the published file
pub fn publish(ctx: &PipelineContext<'_>, options: &PublishOptions) -> Result<PathBuf> {
    let server = options
        .server
        .as_deref()
        .ok_or_else(|| InputError::Missing("server with --server".to_string()))?;

    let target = ctx.layout.pack_target_dir();
    if !target.is_dir() {
        return Err(NotFoundError::PackageDirectory(target).into());
    }

    let extension = ctx.config.publish.package_extension.as_str();
    let mut packages = Vec::new();
    for entry in std::fs::read_dir(&target)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            packages.push(path);
        }
    }
    if packages.len() != 1 {
        return Err(NotFoundError::PackageFileCount {
            dir: target,
            count: packages.len(),
        }
        .into());
    }
    let package = packages.remove(0);

    ctx.ensure(ToolKind::Publisher)?;
    let timer = ctx.start_stage(Stage::Publish, 1);
    info!(package = %package.display(), server, "publishing package");
    ctx.runner.push(
        &Invocation::in_dir(&ctx.layout.root),
        &package,
        server,
        ctx.config.publish.api_key.as_deref(),
    )?;
    timer.finish(ctx);
    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{context, write};
    use taskpack_core::TaskpackError;
    use taskpack_tools::{RecordingToolRunner, ToolCall};
    use tempfile::TempDir;

    fn server() -> PublishOptions {
        PublishOptions {
            server: Some("https://feed.example/nuget".to_string()),
        }
    }

    #[test]
    fn test_publishes_single_package_once() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(&root.join("_package/pack-target/Tasks.1.0.0.nupkg"), "PK");

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let package = publish(&ctx, &server()).unwrap();
        assert!(package.ends_with("Tasks.1.0.0.nupkg"));

        let pushes = runner.calls_to(ToolKind::Publisher);
        assert_eq!(pushes.len(), 1);
        assert!(matches!(
            &pushes[0],
            ToolCall::Push { server, api_key: None, .. } if server == "https://feed.example/nuget"
        ));
    }

    #[test]
    fn test_package_count_must_be_one() {
        for count in [0usize, 2] {
            let temp = TempDir::new().unwrap();
            let root = temp.path();
            std::fs::create_dir_all(root.join("_package/pack-target")).unwrap();
            for i in 0..count {
                write(&root.join(format!("_package/pack-target/Tasks.1.0.{i}.nupkg")), "PK");
            }

            let runner = RecordingToolRunner::new();
            let (ctx, _) = context(root, &runner);
            match publish(&ctx, &server()).unwrap_err() {
                TaskpackError::NotFound(NotFoundError::PackageFileCount { dir, count: found }) => {
                    assert_eq!(found, count);
                    assert!(dir.ends_with("pack-target"));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(runner.calls_to(ToolKind::Publisher).is_empty());
        }
    }

    #[test]
    fn test_missing_directory_and_server() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(temp.path(), &runner);

        assert!(matches!(
            publish(&ctx, &server()).unwrap_err(),
            TaskpackError::NotFound(NotFoundError::PackageDirectory(_))
        ));
        assert!(matches!(
            publish(&ctx, &PublishOptions::default()).unwrap_err(),
            TaskpackError::Input(InputError::Missing(_))
        ));
    }
}
