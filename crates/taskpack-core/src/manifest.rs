//! Manifest loading for a single task

use std::path::PathBuf;

use tracing::debug;

use crate::config::TASK_DESCRIPTOR;
use crate::descriptor::{RuntimeKind, TaskDescriptor};
use crate::error::{Result, TaskError};
use crate::layout::Layout;
use crate::make::BuildConfig;

/// Everything the pipeline knows about one task before building it
#[derive(Debug, Clone)]
pub struct TaskManifest {
    /// Task directory name, as resolved
    pub name: String,
    /// Task source directory
    pub dir: PathBuf,
    /// Name of the build output directory
    pub output_name: String,
    /// Parsed descriptor, when the task has one
    pub descriptor: Option<TaskDescriptor>,
    /// Parsed `make.json` (empty when absent)
    pub build: BuildConfig,
}

impl TaskManifest {
    /// Load the manifests of a resolved task
    pub fn load(layout: &Layout, task: &str) -> Result<Self> {
        let dir = layout.task_dir(task);
        if !dir.is_dir() {
            return Err(TaskError::DirectoryNotFound {
                task: task.to_string(),
                path: dir,
            }
            .into());
        }

        let descriptor_path = dir.join(TASK_DESCRIPTOR);
        let descriptor = if descriptor_path.is_file() {
            Some(TaskDescriptor::load(task, &descriptor_path)?)
        } else {
            None
        };

        let output_name = descriptor
            .as_ref()
            .map(|d| d.name.clone())
            .unwrap_or_else(|| task.to_string());

        let build = BuildConfig::load_from_dir(task, &dir)?;

        debug!(
            task,
            output = %output_name,
            has_descriptor = descriptor.is_some(),
            common = build.common.len(),
            "loaded task manifest"
        );

        Ok(Self {
            name: task.to_string(),
            dir,
            output_name,
            descriptor,
            build,
        })
    }

    /// Whether the task's sources are compiled.
    ///
    /// Tasks with a descriptor compile when they declare a compiled-runtime
    /// handler; tasks without one compile when they carry TypeScript sources
    /// or a compiler configuration.
    pub fn needs_compile(&self) -> bool {
        match &self.descriptor {
            Some(descriptor) => descriptor.has_runtime(RuntimeKind::Compiled),
            None => has_typescript(&self.dir),
        }
    }

    /// Whether the task's scripts are staged
    pub fn needs_script_staging(&self) -> bool {
        self.descriptor
            .as_ref()
            .is_some_and(|d| d.has_runtime(RuntimeKind::Script))
    }
}

fn has_typescript(dir: &std::path::Path) -> bool {
    if dir.join("tsconfig.json").is_file() {
        return true;
    }
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|e| {
                let path = e.path();
                path.is_file()
                    && path.extension().is_some_and(|ext| ext == "ts")
                    && !path.to_string_lossy().ends_with(".d.ts")
            })
        })
        .unwrap_or(false)
}
