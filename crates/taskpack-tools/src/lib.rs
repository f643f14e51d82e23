//! Taskpack Tools - External tool invocation
//!
//! This crate runs the compiler, package manager, test runner, compressor,
//! packager, publisher and extension bundler behind the [`ToolRunner`] trait,
//! checks tool version requirements, and fetches declared externals.

#[cfg(any(test, feature = "testing"))]
pub mod fake;
pub mod fetch;
pub mod process;
pub mod requirement;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub use fake::{RecordingToolRunner, ToolCall};
pub use fetch::ExternalsFetcher;
pub use process::ProcessToolRunner;
pub use requirement::{ensure_tool, extract_version, ToolStatus};
pub use traits::{CompileRequest, CompressRequest, Invocation, ToolRunner};
