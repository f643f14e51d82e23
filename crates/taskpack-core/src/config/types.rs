//! Configuration types

use serde::{Deserialize, Serialize};

/// Main configuration for taskpack
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Repository layout
    pub paths: PathsConfig,

    /// External tool commands and version requirements
    pub tools: ToolsConfig,

    /// Build stage settings
    pub build: BuildSettings,

    /// Package metadata and layout
    pub package: PackageConfig,

    /// Publishing settings
    pub publish: PublishConfig,

    /// Extension generator settings
    pub extension: ExtensionConfig,
}

/// Repository layout, relative to the repository root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding one subdirectory per task
    pub tasks: String,
    /// Build output root for tasks
    pub build: String,
    /// Subdirectory of the build root for common modules
    pub common: String,
    /// Build output for the test-support library
    pub build_tests: String,
    /// Test sources
    pub tests: String,
    /// Isolated tree used by the legacy test stage
    pub test_root: String,
    /// Package staging and output root
    pub package: String,
    /// Scratch directory
    pub temp: String,
    /// Download cache for externals
    pub download: String,
    /// Template directory used by the task generator
    pub codegen: String,
    /// Extension assets
    pub assets: String,
    /// Default task list file
    pub options: String,
    /// Shared compiler configuration staged into each task
    pub tsconfig: String,
    /// Repository-wide dependency cache used with --skip-npm
    pub node_modules: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tasks: "Tasks".to_string(),
            build: "_build/Tasks".to_string(),
            common: "Common".to_string(),
            build_tests: "_build/Tests".to_string(),
            tests: "Tests".to_string(),
            test_root: "_test".to_string(),
            package: "_package".to_string(),
            temp: "_temp".to_string(),
            download: "_download".to_string(),
            codegen: "codegen/task".to_string(),
            assets: "assets".to_string(),
            options: "make-options.json".to_string(),
            tsconfig: "tsconfig.json".to_string(),
            node_modules: "node_modules".to_string(),
        }
    }
}

/// Kinds of external tools the pipeline drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolKind {
    /// Source compiler (tsc)
    Compiler,
    /// Package manager (npm)
    PackageManager,
    /// Test runner (mocha)
    TestRunner,
    /// Archive compressor (PowerShell script host)
    Compressor,
    /// Package creator (nuget pack)
    Packager,
    /// Package publisher (nuget push)
    Publisher,
    /// Extension bundler (tfx)
    Bundler,
}

impl ToolKind {
    /// All tool kinds, in pipeline order
    pub const ALL: [ToolKind; 7] = [
        ToolKind::Compiler,
        ToolKind::PackageManager,
        ToolKind::TestRunner,
        ToolKind::Compressor,
        ToolKind::Packager,
        ToolKind::Publisher,
        ToolKind::Bundler,
    ];

    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compiler => "compiler",
            Self::PackageManager => "package-manager",
            Self::TestRunner => "test-runner",
            Self::Compressor => "compressor",
            Self::Packager => "packager",
            Self::Publisher => "publisher",
            Self::Bundler => "bundler",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single external tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable name or path
    pub command: String,

    /// Semver requirement the tool's reported version must satisfy.
    /// `None` only checks that the tool exists.
    #[serde(default)]
    pub version: Option<String>,

    /// Arguments that make the tool print its version
    #[serde(default = "default_version_args")]
    pub version_args: Vec<String>,
}

fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}

impl ToolConfig {
    /// Tool with the default `--version` probe
    pub fn new(command: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            command: command.into(),
            version: version.map(str::to_string),
            version_args: default_version_args(),
        }
    }
}

/// External tool table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub compiler: ToolConfig,
    pub package_manager: ToolConfig,
    pub test_runner: ToolConfig,
    pub compressor: ToolConfig,
    pub packager: ToolConfig,
    pub publisher: ToolConfig,
    pub bundler: ToolConfig,
}

impl ToolsConfig {
    /// Look up the configuration for a tool kind
    pub fn get(&self, kind: ToolKind) -> &ToolConfig {
        match kind {
            ToolKind::Compiler => &self.compiler,
            ToolKind::PackageManager => &self.package_manager,
            ToolKind::TestRunner => &self.test_runner,
            ToolKind::Compressor => &self.compressor,
            ToolKind::Packager => &self.packager,
            ToolKind::Publisher => &self.publisher,
            ToolKind::Bundler => &self.bundler,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        let mut compressor = ToolConfig::new("powershell.exe", Some(">=5"));
        compressor.version_args = super::defaults::POWERSHELL_ARGS
            .iter()
            .chain(["$PSVersionTable.PSVersion.Major"].iter())
            .map(|s| s.to_string())
            .collect();

        let mut packager = ToolConfig::new("nuget.exe", None);
        packager.version_args = Vec::new();
        let mut publisher = ToolConfig::new("nuget3.exe", None);
        publisher.version_args = Vec::new();
        let mut bundler = ToolConfig::new("tfx", None);
        bundler.version_args = Vec::new();

        Self {
            compiler: ToolConfig::new("tsc", Some(">=1.8.7")),
            package_manager: ToolConfig::new("npm", Some(">=3.0.0")),
            test_runner: ToolConfig::new("mocha", Some(">=2.3.3")),
            compressor,
            packager,
            publisher,
            bundler,
        }
    }
}

/// What to do when --skip-npm is requested but no shared dependency cache exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipNpmFallback {
    /// Quietly install dependencies for the task instead
    #[default]
    Install,
    /// Abort the run
    Error,
}

/// Build stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Behaviour of --skip-npm without a shared node_modules
    pub skip_npm_fallback: SkipNpmFallback,

    /// The only dependency a script-runtime task may declare
    pub script_sdk: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            skip_npm_fallback: SkipNpmFallback::Install,
            script_sdk: "vsts-task-sdk".to_string(),
        }
    }
}

/// Package metadata written to the nuspec and package layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    pub id: String,
    pub authors: String,
    pub owners: String,
    pub description: String,
    pub tags: String,
    pub require_license_acceptance: bool,
    /// Name of the combined archive
    pub zip_name: String,
    /// Contents of the layout marker in the wrapper tree
    pub layout_version: String,
    /// Compression script, relative to the repository root
    pub compress_script: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            id: "OpenBank.Build.Tasks".to_string(),
            authors: "bigbldt".to_string(),
            owners: "bigbldt,Microsoft".to_string(),
            description: "For VSS internal use only".to_string(),
            tags: "VSSInternal".to_string(),
            require_license_acceptance: false,
            zip_name: "Microsoft.TeamFoundation.Build.Tasks.zip".to_string(),
            layout_version: "2".to_string(),
            compress_script: "Compress-Tasks.ps1".to_string(),
        }
    }
}

/// Publishing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// API key passed to the publisher
    pub api_key: Option<String>,

    /// Extension of package files to publish
    pub package_extension: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            package_extension: "nupkg".to_string(),
        }
    }
}

/// Extension generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Composite manifest in the assets directory
    pub manifest: String,
    /// Per-task manifest template in the assets directory
    pub template: String,
    /// Icon file name (per task and default)
    pub icon: String,
    /// Markdown file copied to the overview in composite mode
    pub overview_source: String,
    /// Overview file name referenced by the composite manifest
    pub overview: String,
    /// Contribution type for task contributions
    pub contribution_type: String,
    /// Contribution target for task contributions
    pub contribution_target: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            manifest: "vss-extension.json".to_string(),
            template: "vss-extension-template.json".to_string(),
            icon: "extension-icon.png".to_string(),
            overview_source: "ParallelBuilds.md".to_string(),
            overview: "overview.md".to_string(),
            contribution_type: "ms.vss-distributed-task.task".to_string(),
            contribution_target: "ms.vss-distributed-task.tasks".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_lookup() {
        let tools = ToolsConfig::default();
        assert_eq!(tools.get(ToolKind::Compiler).command, "tsc");
        assert_eq!(tools.get(ToolKind::PackageManager).version.as_deref(), Some(">=3.0.0"));
        assert!(tools.get(ToolKind::Packager).version.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[package]
id = "Contoso.Tasks"

[tools.compiler]
command = "node_modules/.bin/tsc"
version = ">=2.0.0"
"#,
        )
        .unwrap();

        assert_eq!(config.package.id, "Contoso.Tasks");
        assert_eq!(config.package.layout_version, "2");
        assert_eq!(config.tools.compiler.command, "node_modules/.bin/tsc");
        assert_eq!(config.tools.compiler.version_args, vec!["--version"]);
        assert_eq!(config.tools.test_runner.command, "mocha");
        assert_eq!(config.paths.tasks, "Tasks");
    }

    #[test]
    fn test_skip_npm_fallback_parse() {
        let config: Config = serde_yaml::from_str("build:\n  skip_npm_fallback: error\n").unwrap();
        assert_eq!(config.build.skip_npm_fallback, SkipNpmFallback::Error);
    }
}
