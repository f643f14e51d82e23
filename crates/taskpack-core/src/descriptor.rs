//! Task descriptor (`task.json`)
//!
//! Descriptors are validated field by field before being deserialized, so a
//! malformed manifest fails with an error naming the task and the field
//! instead of a generic serde message.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TaskError};

/// Task version (`version.Major/Minor/Patch`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskVersion {
    #[serde(rename = "Major")]
    pub major: u64,
    #[serde(rename = "Minor")]
    pub minor: u64,
    #[serde(rename = "Patch")]
    pub patch: u64,
}

impl fmt::Display for TaskVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// How a runtime kind is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    /// Sources are compiled (Node handlers)
    Compiled,
    /// Scripts are staged as-is (PowerShell3 handlers)
    Script,
    /// Neither compiled nor staged
    Other,
}

/// Key of the `execution` map
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExecutionKind {
    Node,
    Node10,
    Node16,
    Node20,
    PowerShell3,
    PowerShell,
    Process,
    /// Any handler this tool does not know how to build
    Other(String),
}

impl ExecutionKind {
    /// Get the handler name as written in the descriptor
    pub fn as_str(&self) -> &str {
        match self {
            Self::Node => "Node",
            Self::Node10 => "Node10",
            Self::Node16 => "Node16",
            Self::Node20 => "Node20",
            Self::PowerShell3 => "PowerShell3",
            Self::PowerShell => "PowerShell",
            Self::Process => "Process",
            Self::Other(name) => name,
        }
    }

    /// Build treatment for this handler
    pub fn runtime(&self) -> RuntimeKind {
        match self {
            Self::Node | Self::Node10 | Self::Node16 | Self::Node20 => RuntimeKind::Compiled,
            Self::PowerShell3 => RuntimeKind::Script,
            Self::PowerShell | Self::Process | Self::Other(_) => RuntimeKind::Other,
        }
    }
}

impl From<String> for ExecutionKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Node" => Self::Node,
            "Node10" => Self::Node10,
            "Node16" => Self::Node16,
            "Node20" => Self::Node20,
            "PowerShell3" => Self::PowerShell3,
            "PowerShell" => Self::PowerShell,
            "Process" => Self::Process,
            _ => Self::Other(s),
        }
    }
}

impl From<ExecutionKind> for String {
    fn from(kind: ExecutionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry point of one execution handler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionTarget {
    /// Entry file relative to the task directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Preserve other fields (argumentFormat, platforms, ...)
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Task input declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_mark_down: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Input group declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Parsed and validated `task.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_mark_down: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name_format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,

    pub version: TaskVersion,

    pub execution: BTreeMap<ExecutionKind, ExecutionTarget>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<TaskInput>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<TaskGroup>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub messages: Map<String, Value>,

    /// Preserve other fields
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl TaskDescriptor {
    /// Load and validate a descriptor file. `task` names the task in errors.
    pub fn load(task: &str, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|_| TaskError::FileNotFound {
            task: task.to_string(),
            path: path.to_path_buf(),
        })?;

        let value: Value = serde_json::from_str(&content).map_err(|e| TaskError::ParseFailed {
            task: task.to_string(),
            file: file_name(path),
            message: e.to_string(),
        })?;

        Self::from_value(task, value)
    }

    /// Validate and convert a raw JSON value
    pub fn from_value(task: &str, value: Value) -> Result<Self> {
        validate_descriptor(task, &value)?;

        serde_json::from_value(value).map_err(|e| {
            TaskError::ParseFailed {
                task: task.to_string(),
                file: crate::config::TASK_DESCRIPTOR.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Whether any handler has the given build treatment
    pub fn has_runtime(&self, runtime: RuntimeKind) -> bool {
        self.execution.keys().any(|k| k.runtime() == runtime)
    }

    /// Friendly name, falling back to the name
    pub fn display_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.name)
    }
}

/// Check the required shape of a descriptor before deserializing it
pub fn validate_descriptor(task: &str, value: &Value) -> Result<()> {
    let invalid = |field: &str, message: &str| TaskError::InvalidField {
        task: task.to_string(),
        field: field.to_string(),
        message: message.to_string(),
    };

    let obj = value
        .as_object()
        .ok_or_else(|| invalid("<root>", "descriptor must be a JSON object"))?;

    match obj.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => {}
        _ => return Err(invalid("name", "must be a non-empty string").into()),
    }

    let version = obj
        .get("version")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("version", "must be an object with Major, Minor and Patch"))?;
    for part in ["Major", "Minor", "Patch"] {
        if !version.get(part).is_some_and(Value::is_u64) {
            return Err(invalid(
                &format!("version.{}", part),
                "must be a non-negative integer",
            )
            .into());
        }
    }

    match obj.get("execution").and_then(Value::as_object) {
        Some(execution) if !execution.is_empty() => {}
        _ => return Err(invalid("execution", "must be a non-empty object").into()),
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
