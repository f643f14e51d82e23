//! npm manifest (`package.json`) of a task

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TaskError};

/// The parts of `package.json` the pipeline reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub dependencies: Map<String, Value>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl PackageManifest {
    /// Load a task's `package.json`; `task` names the task in errors
    pub fn load(task: &str, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|_| TaskError::FileNotFound {
            task: task.to_string(),
            path: path.to_path_buf(),
        })?;
        serde_json::from_str(&content).map_err(|e| {
            TaskError::ParseFailed {
                task: task.to_string(),
                file: crate::config::PACKAGE_JSON.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Package name, required for marketplace contributions
    pub fn require_name(&self, task: &str) -> Result<&str> {
        self.name.as_deref().filter(|n| !n.is_empty()).ok_or_else(|| {
            TaskError::InvalidField {
                task: task.to_string(),
                field: "package.json name".to_string(),
                message: "must be a non-empty string".to_string(),
            }
            .into()
        })
    }

    /// Names of declared runtime dependencies, in declared order
    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }
}
