//! Tool runner trait

use std::path::{Path, PathBuf};

use taskpack_core::error::Result;
use taskpack_core::ToolKind;

/// Working directory and extra environment of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Directory the tool runs in
    pub cwd: PathBuf,
    /// Variables added to the inherited environment
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Invocation in a directory with no extra environment
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            env: Vec::new(),
        }
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Compiler request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Explicit source files; empty compiles the project in the working directory
    pub sources: Vec<PathBuf>,
    /// Output directory
    pub out_dir: PathBuf,
    /// Root of the source tree, mirrored under `out_dir`
    pub root_dir: Option<PathBuf>,
}

impl CompileRequest {
    /// Compile a whole project rooted at `root_dir` into `out_dir`
    pub fn project(root_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources: Vec::new(),
            out_dir: out_dir.into(),
            root_dir: Some(root_dir.into()),
        }
    }

    /// Compile specific files into `out_dir`
    pub fn files(sources: Vec<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            out_dir: out_dir.into(),
            root_dir: None,
        }
    }
}

/// Compression request for the package archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressRequest {
    /// Compression script
    pub script: PathBuf,
    /// Staging tree with full content per task
    pub individual: PathBuf,
    /// Staging tree with metadata per task
    pub wrapper: PathBuf,
    /// Archive to create
    pub zip: PathBuf,
}

/// Everything the pipeline asks of external tools.
///
/// Implementations block until the tool exits; a non-zero exit is an error.
pub trait ToolRunner: Send + Sync {
    /// Raw version output of a tool, or `None` when it is not available
    fn version(&self, kind: ToolKind) -> Result<Option<String>>;

    /// Compile sources
    fn compile(&self, invocation: &Invocation, request: &CompileRequest) -> Result<()>;

    /// Install dependencies of the package in the working directory, or
    /// install `package` into it
    fn install(&self, invocation: &Invocation, package: Option<&Path>) -> Result<()>;

    /// Run the test runner once over all specs
    fn run_tests(&self, invocation: &Invocation, specs: &[PathBuf]) -> Result<()>;

    /// Produce the package archive from the staging trees
    fn compress(&self, invocation: &Invocation, request: &CompressRequest) -> Result<()>;

    /// Create a package from a nuspec into `out_dir`
    fn pack(&self, invocation: &Invocation, nuspec: &Path, out_dir: &Path) -> Result<()>;

    /// Push a package file to a feed
    fn push(
        &self,
        invocation: &Invocation,
        package: &Path,
        server: &str,
        api_key: Option<&str>,
    ) -> Result<()>;

    /// Bundle an extension from a manifest in the working directory
    fn bundle(&self, invocation: &Invocation, manifest: &str) -> Result<()>;

    /// Download `url` to the file `dest`
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}
