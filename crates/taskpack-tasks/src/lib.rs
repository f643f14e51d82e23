//! Taskpack Tasks - Pipeline stages
//!
//! This crate implements the clean, build, test, package, publish, bump,
//! extension and generator stages over a [`PipelineContext`], reporting
//! progress through the [`StageReporter`] registry.

pub mod build;
pub mod bump;
pub mod clean;
mod common;
pub mod context;
pub mod extension;
pub mod generate;
pub mod legacy;
pub mod nuspec;
pub mod package;
pub mod publish;
pub mod reporter;

pub use build::{build, BuildOptions, BuildSummary, BuiltTask};
pub use bump::{bump, BumpedTask};
pub use clean::clean;
pub use context::PipelineContext;
pub use extension::{make_extensions, ExtensionManifest, ExtensionOptions};
pub use generate::{generate, GenerateOptions, GeneratedTask};
pub use legacy::{run_legacy_tests, LegacyTestOptions};
pub use package::{package, PackageOptions, PackageOutput};
pub use publish::{publish, PublishOptions};
pub use reporter::{
    CollectingReporter, Stage, StageEvent, StageReporter, StageReporterRegistry, TracingReporter,
};
pub use run_tests::{run_tests, TestOptions};
