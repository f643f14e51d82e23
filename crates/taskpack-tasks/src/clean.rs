//! Clean stage

use taskpack_core::error::Result;
use taskpack_core::fsutil::remove_dir_if_exists;
use tracing::debug;

use crate::context::PipelineContext;
use crate::reporter::Stage;

/// Per-task directories produced by dependency installs
const TASK_SCRATCH_DIRS: [&str; 2] = ["node_modules", "typings"];

/// Remove build, test, package and temp output, then each resolved task's
/// installed dependencies. Returns the cleaned tasks.
pub fn clean(ctx: &PipelineContext<'_>, pattern: Option<&str>) -> Result<Vec<String>> {
    let tasks = ctx.resolve(pattern)?;
    let layout = &ctx.layout;
    let timer = ctx.start_stage(Stage::Clean, tasks.len());

    remove_dir_if_exists(layout.build_root())?;
    std::fs::create_dir_all(&layout.build_dir)?;
    for dir in [&layout.test_root, &layout.package_dir, &layout.temp_dir] {
        remove_dir_if_exists(dir)?;
    }

    for task in &tasks {
        ctx.run_task(Stage::Clean, task, || {
            let task_dir = layout.task_dir(task);
            for name in TASK_SCRATCH_DIRS {
                let dir = task_dir.join(name);
                debug!(path = %dir.display(), "removing");
                remove_dir_if_exists(&dir)?;
            }
            Ok(())
        })?;
    }

    timer.finish(ctx);
    Ok(tasks)
}
