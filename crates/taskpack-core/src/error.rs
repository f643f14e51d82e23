//! Error types for taskpack

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using TaskpackError
pub type Result<T> = std::result::Result<T, TaskpackError>;

/// Main error type for taskpack operations
#[derive(Debug, Error)]
pub enum TaskpackError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// External tool errors
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Errors tied to one task
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Nothing matched a search
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Invalid user input
    #[error(transparent)]
    Input(#[from] InputError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// External tool errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool is not installed or not on PATH
    #[error("Required tool '{tool}' not found (expected {expected})")]
    NotFound { tool: String, expected: String },

    /// Tool reported a version outside the requirement
    #[error("Tool '{tool}' has version {found}, expected {expected}")]
    VersionMismatch {
        tool: String,
        found: String,
        expected: String,
    },

    /// Tool version output could not be interpreted
    #[error("Could not determine version of '{tool}' from output: {output}")]
    UnknownVersion { tool: String, output: String },

    /// Tool could not be started
    #[error("Failed to launch '{command}': {reason}")]
    Launch { command: String, reason: String },

    /// Tool exited with a non-zero status
    #[error("'{tool}' failed with exit code {}: {command}", .code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    Failed {
        tool: String,
        command: String,
        code: Option<i32>,
    },

    /// Download of an external artifact failed
    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },
}

/// Errors that concern a specific task
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task directory does not exist
    #[error("Task '{task}': directory not found at {path}")]
    DirectoryNotFound { task: String, path: PathBuf },

    /// Required file is missing
    #[error("Task '{task}': required file not found at {path}")]
    FileNotFound { task: String, path: PathBuf },

    /// Descriptor failed to parse
    #[error("Task '{task}': failed to parse {file}: {message}")]
    ParseFailed {
        task: String,
        file: String,
        message: String,
    },

    /// Descriptor field is missing or malformed
    #[error("Task '{task}': invalid field '{field}' - {message}")]
    InvalidField {
        task: String,
        field: String,
        message: String,
    },

    /// Two tasks resolve to the same output directory
    #[error("Tasks '{first}' and '{second}' both build into output '{output}'")]
    DuplicateOutput {
        first: String,
        second: String,
        output: String,
    },

    /// Task already exists (generator)
    #[error("Task '{task}' already exists at {path}")]
    AlreadyExists { task: String, path: PathBuf },

    /// Build-time requirement not met for this task
    #[error("Task '{task}': {message}")]
    Requirement { task: String, message: String },
}

/// Searches that matched nothing (or the wrong number of things)
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// No task directory matched the pattern
    #[error("Unable to find any tasks matching pattern {pattern}")]
    NoTasks { pattern: String },

    /// No test specs matched
    #[error("Unable to find tests using the following patterns: {}", .patterns.join(", "))]
    NoTestSpecs { patterns: Vec<String> },

    /// Package output directory is missing
    #[error("Package directory does not exist: {0}")]
    PackageDirectory(PathBuf),

    /// Expected exactly one package file
    #[error("Expected exactly one package file under {dir}, found {count}")]
    PackageFileCount { dir: PathBuf, count: usize },

    /// Required repository file or directory is missing
    #[error("Required path not found: {0}")]
    Path(PathBuf),
}

/// Invalid user input
#[derive(Debug, Error)]
pub enum InputError {
    /// A required flag was not supplied
    #[error("Missing required input: supply {0}")]
    Missing(String),

    /// Version is not a valid semantic version
    #[error("Invalid semver version: {version}")]
    InvalidSemver { version: String },

    /// Patch field of a task version is not a number
    #[error("Error processing '{task}'. version.Patch should be a number.")]
    PatchNotNumeric { task: String },

    /// Malformed input value
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
