//! Build configuration (`make.json`) for tasks and common modules

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TaskError};

/// Parsed `make.json`; every section is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Artifacts downloaded into the output directory
    pub externals: Option<Externals>,

    /// Shared modules this task depends on
    pub common: Vec<CommonModuleRef>,

    /// Extra copy rules applied after the default resources
    pub cp: Vec<CopyGroup>,

    /// Remove rules applied to the output directory last
    pub rm: Vec<RemoveGroup>,
}

impl BuildConfig {
    /// Load `make.json` from a directory; a missing file is an empty config.
    /// `owner` names the task or module in errors.
    pub fn load_from_dir(owner: &str, dir: &Path) -> Result<Self> {
        let path = dir.join(crate::config::BUILD_CONFIG);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            TaskError::ParseFailed {
                task: owner.to_string(),
                file: crate::config::BUILD_CONFIG.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Whether any externals are declared
    pub fn has_externals(&self) -> bool {
        self.externals.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// External artifacts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Externals {
    /// Zip archives extracted into `dest`
    pub archive_packages: Vec<ArchivePackage>,

    /// Single files downloaded to `dest`
    pub files: Vec<ExternalFile>,

    /// NuGet v2 packages whose content is copied by `cp` rules
    pub nugetv2: Vec<NugetPackage>,
}

impl Externals {
    /// Whether nothing is declared
    pub fn is_empty(&self) -> bool {
        self.archive_packages.is_empty() && self.files.is_empty() && self.nugetv2.is_empty()
    }
}

/// Zip archive to download and extract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivePackage {
    pub url: String,
    /// Extraction directory relative to the output directory
    pub dest: String,
}

/// Single file to download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFile {
    pub url: String,
    /// Destination file relative to the output directory
    pub dest: String,
}

/// NuGet v2 package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NugetPackage {
    pub name: String,
    pub version: String,
    /// Feed base URL
    pub repository: String,
    /// Copy rules from the extracted package into the output directory
    #[serde(default)]
    pub cp: Vec<CopyGroup>,
}

impl NugetPackage {
    /// Download URL of the package on a v2 feed
    pub fn download_url(&self) -> String {
        format!(
            "{}/package/{}/{}",
            self.repository.trim_end_matches('/'),
            self.name,
            self.version
        )
    }
}

/// Kind of a common module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    /// Compiled-runtime module, installed as a nested dependency
    Node,
    /// Script module, copied into the task output
    Ps,
}

/// Reference from a task to a shared module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonModuleRef {
    /// Module directory relative to the task directory
    pub module: String,

    #[serde(rename = "type")]
    pub module_type: ModuleType,

    /// Whether the module is compiled
    #[serde(default)]
    pub compile: bool,

    /// Staging subpath for script modules (default `ps_modules`)
    #[serde(default)]
    pub dest: Option<String>,
}

impl CommonModuleRef {
    /// Module directory name, used as its output name
    pub fn module_name(&self) -> String {
        Path::new(&self.module)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.module.clone())
    }

    /// Whether the module is installed as a compiled dependency
    pub fn is_compiled(&self) -> bool {
        self.module_type == ModuleType::Node && self.compile
    }
}

/// Copy rule: glob patterns relative to the source root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyGroup {
    #[serde(deserialize_with = "one_or_many")]
    pub source: Vec<String>,

    /// Destination relative to the output directory
    #[serde(default)]
    pub dest: Option<String>,

    /// Copy options; `-R` copies directories recursively
    #[serde(default)]
    pub options: Option<String>,
}

impl CopyGroup {
    /// Whether directories are copied recursively
    pub fn recursive(&self) -> bool {
        self.options
            .as_deref()
            .is_some_and(|o| o.contains('R') || o.contains('r'))
    }
}

/// Remove rule: glob patterns relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveGroup {
    #[serde(deserialize_with = "one_or_many")]
    pub items: Vec<String>,

    #[serde(default)]
    pub options: Option<String>,
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}
