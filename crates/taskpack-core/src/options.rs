//! Default task list file (`make-options.json`)

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::DEFAULT_TASK_RESOURCES;
use crate::error::{NotFoundError, Result};
use crate::jsonfile::{read_json, write_json};

/// Repository-wide task list and generator defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeOptions {
    /// Ordered task identifiers
    #[serde(default)]
    pub tasks: Vec<String>,

    /// Prefix for generated package names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,

    /// Author written into generated tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    /// License written into generated tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Override of the default resource globs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_resources: Option<Vec<String>>,

    /// Preserve other fields
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl MakeOptions {
    /// Load the options file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(NotFoundError::Path(path.to_path_buf()).into());
        }
        let options: Self = read_json(path)?;
        debug!(path = %path.display(), tasks = options.tasks.len(), "loaded make options");
        Ok(options)
    }

    /// Write the options file back with 4-space indentation
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self, 4)
    }

    /// Resource globs copied from every task and module
    pub fn resources(&self) -> Vec<String> {
        match &self.task_resources {
            Some(list) => list.clone(),
            None => DEFAULT_TASK_RESOURCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
