//! Default configuration values and well-known file names

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "taskpack.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "taskpack.yaml";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".taskpack.toml",
        ".taskpack.yaml",
    ]
}

/// Per-task descriptor
pub const TASK_DESCRIPTOR: &str = "task.json";

/// Localised copy of the descriptor
pub const TASK_LOC_DESCRIPTOR: &str = "task.loc.json";

/// Per-task or per-module build configuration
pub const BUILD_CONFIG: &str = "make.json";

/// Common module descriptor
pub const MODULE_DESCRIPTOR: &str = "module.json";

/// npm manifest
pub const PACKAGE_JSON: &str = "package.json";

/// Directory holding test sources inside a task or module
pub const TESTS_DIR: &str = "Tests";

/// Layout marker written into the wrapper staging tree
pub const LAYOUT_MARKER: &str = "layout-version.txt";

/// Default staging subpath for script common modules
pub const SCRIPT_MODULES_DIR: &str = "ps_modules";

/// Non-interactive PowerShell host arguments
pub const POWERSHELL_ARGS: &[&str] = &[
    "-NoLogo",
    "-Sta",
    "-NoProfile",
    "-NonInteractive",
    "-ExecutionPolicy",
    "Unrestricted",
    "-Command",
];

/// Resources copied from every task and module directory unless
/// `taskResources` overrides them
pub const DEFAULT_TASK_RESOURCES: &[&str] = &[
    "*.md",
    "*.png",
    "*.svg",
    "*.ps1",
    "*.psm1",
    "*.sh",
    "*.txt",
    "task.json",
    "task.loc.json",
    "module.json",
    "package.json",
    "Strings",
    "node_modules",
];

/// Files that make up a task's metadata in the wrapper staging tree
pub const METADATA_FILES: &[&str] = &[
    "task.json",
    "task.loc.json",
    "icon.png",
    "icon.svg",
    "Strings",
];
