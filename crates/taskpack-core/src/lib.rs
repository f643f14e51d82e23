//! Taskpack Core - Core library for task repository builds
//!
//! This crate provides the foundational types, error handling, configuration,
//! manifests and task resolution shared by the taskpack pipeline stages.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod fsutil;
pub mod jsonfile;
pub mod layout;
pub mod loc;
pub mod make;
pub mod manifest;
pub mod options;
pub mod package;
pub mod resolver;

pub use config::{Config, ToolConfig, ToolKind};
pub use descriptor::{ExecutionKind, RuntimeKind, TaskDescriptor, TaskVersion};
pub use error::{
    ConfigError, InputError, NotFoundError, Result, TaskError, TaskpackError, ToolError,
};
pub use layout::Layout;
pub use make::{BuildConfig, CommonModuleRef, Externals, ModuleType};
pub use manifest::TaskManifest;
pub use options::MakeOptions;
pub use package::PackageManifest;
pub use resolver::resolve_tasks;
