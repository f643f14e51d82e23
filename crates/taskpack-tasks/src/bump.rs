//! Version bump: increment `version.Patch` of every resolved task

use std::path::PathBuf;

use serde_json::Value;
use taskpack_core::config::TASK_DESCRIPTOR;
use taskpack_core::error::{InputError, Result, TaskError};
use taskpack_core::jsonfile::write_json;
use tracing::info;

use crate::context::PipelineContext;
use crate::reporter::Stage;

/// One bumped descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpedTask {
    pub task: String,
    pub patch: u64,
}

/// Bump the patch version of every task matching `pattern`.
///
/// Every descriptor is read and checked before any file is written, so a
/// non-numeric `Patch` anywhere leaves all descriptors untouched.
pub fn bump(ctx: &PipelineContext<'_>, pattern: Option<&str>) -> Result<Vec<BumpedTask>> {
    let tasks = ctx.resolve(pattern)?;
    let timer = ctx.start_stage(Stage::Bump, tasks.len());

    let mut pending: Vec<(String, PathBuf, Value, u64)> = Vec::with_capacity(tasks.len());
    for task in &tasks {
        let path = ctx.layout.task_dir(task).join(TASK_DESCRIPTOR);
        if !path.is_file() {
            return Err(TaskError::FileNotFound {
                task: task.clone(),
                path,
            }
            .into());
        }
        let content = std::fs::read_to_string(&path)?;
        let descriptor: Value = serde_json::from_str(&content).map_err(|e| TaskError::ParseFailed {
            task: task.clone(),
            file: TASK_DESCRIPTOR.to_string(),
            message: e.to_string(),
        })?;
        let patch = descriptor
            .pointer("/version/Patch")
            .and_then(Value::as_u64)
            .ok_or_else(|| InputError::PatchNotNumeric { task: task.clone() })?;
        let next = patch.checked_add(1).ok_or_else(|| TaskError::InvalidField {
            task: task.clone(),
            field: "version.Patch".to_string(),
            message: format!("{} cannot be incremented", patch),
        })?;
        pending.push((task.clone(), path, descriptor, next));
    }

    let mut bumped = Vec::with_capacity(pending.len());
    for (task, path, mut descriptor, patch) in pending {
        descriptor["version"]["Patch"] = Value::from(patch);
        write_json(&path, &descriptor, 4)?;
        info!(task = %task, patch, "bumped patch version");
        bumped.push(BumpedTask { task, patch });
    }

    timer.finish(ctx);
    Ok(bumped)
}
