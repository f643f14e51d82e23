//! Absolute repository layout derived from configuration

use std::path::{Path, PathBuf};

use crate::config::PathsConfig;

/// Resolved directories of a task repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub tasks_dir: PathBuf,
    pub build_dir: PathBuf,
    pub common_dir: PathBuf,
    pub build_tests_dir: PathBuf,
    pub tests_dir: PathBuf,
    pub test_root: PathBuf,
    pub package_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub download_dir: PathBuf,
    pub codegen_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub options_file: PathBuf,
    pub tsconfig: PathBuf,
    pub node_modules: PathBuf,
}

impl Layout {
    /// Resolve every configured path against the repository root
    pub fn new(root: impl Into<PathBuf>, paths: &PathsConfig) -> Self {
        let root = root.into();
        let build_dir = root.join(&paths.build);
        Self {
            tasks_dir: root.join(&paths.tasks),
            common_dir: build_dir.join(&paths.common),
            build_dir,
            build_tests_dir: root.join(&paths.build_tests),
            tests_dir: root.join(&paths.tests),
            test_root: root.join(&paths.test_root),
            package_dir: root.join(&paths.package),
            temp_dir: root.join(&paths.temp),
            download_dir: root.join(&paths.download),
            codegen_dir: root.join(&paths.codegen),
            assets_dir: root.join(&paths.assets),
            options_file: root.join(&paths.options),
            tsconfig: root.join(&paths.tsconfig),
            node_modules: root.join(&paths.node_modules),
            root,
        }
    }

    /// Source directory of a task
    pub fn task_dir(&self, task: &str) -> PathBuf {
        self.tasks_dir.join(task)
    }

    /// Build output directory for an output name
    pub fn output_dir(&self, output_name: &str) -> PathBuf {
        self.build_dir.join(output_name)
    }

    /// Top-level build directory (parent of the task build root)
    pub fn build_root(&self) -> &Path {
        self.build_dir.parent().unwrap_or(&self.root)
    }

    /// Isolated task copies used by the legacy test stage
    pub fn test_tasks_dir(&self) -> PathBuf {
        self.test_root.join("Tasks")
    }

    /// Compiled test tree used by the legacy test stage
    pub fn test_output_dir(&self) -> PathBuf {
        self.test_root.join("Tests")
    }

    /// Staging tree with full content per task
    pub fn individual_staging_dir(&self) -> PathBuf {
        self.package_dir.join("individual-zip-staging")
    }

    /// Staging tree with metadata only per task
    pub fn wrapper_staging_dir(&self) -> PathBuf {
        self.package_dir.join("wrapper-zip-staging")
    }

    /// Input directory for the packager
    pub fn pack_source_dir(&self) -> PathBuf {
        self.package_dir.join("pack-source")
    }

    /// Output directory of the packager; consumed by publish
    pub fn pack_target_dir(&self) -> PathBuf {
        self.package_dir.join("pack-target")
    }
}
