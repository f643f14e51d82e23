//! Marketplace extension manifests
//!
//! Two modes share one output location. The composite mode bundles every
//! task with a descriptor into a single extension built from the assets
//! manifest; the per-task mode fills the template once per task and bundles
//! each separately. Both write `vss-extension.json` into the task build root
//! and run the bundler there.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use taskpack_core::config::{ExtensionConfig, PACKAGE_JSON, TASK_DESCRIPTOR};
use taskpack_core::error::{NotFoundError, Result, TaskError};
use taskpack_core::fsutil::{copy_dir_recursive, copy_file, find_paths};
use taskpack_core::jsonfile::{read_json, write_json};
use taskpack_core::{PackageManifest, TaskDescriptor, ToolKind};
use taskpack_tools::Invocation;
use tracing::info;

use crate::context::PipelineContext;
use crate::reporter::Stage;

/// `vss-extension.json`, with the fields the generator edits typed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionManifest {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub icons: Map<String, Value>,

    #[serde(default)]
    pub files: Vec<ManifestFile>,

    #[serde(default)]
    pub contributions: Vec<Contribution>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Entry of the manifest `files` list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestFile {
    pub path: String,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Contribution of one task to the extension
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contribution {
    #[serde(default)]
    pub id: String,

    #[serde(rename = "type", default)]
    pub contribution_type: String,

    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(default)]
    pub properties: ContributionProperties,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContributionProperties {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "friendlyName", default)]
    pub friendly_name: String,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Contribution {
    /// Task contribution with the configured type and target
    pub fn task(config: &ExtensionConfig, id: &str, name: &str, friendly_name: &str) -> Self {
        Self {
            id: id.to_string(),
            contribution_type: config.contribution_type.clone(),
            targets: vec![config.contribution_target.clone()],
            properties: ContributionProperties {
                name: name.to_string(),
                friendly_name: friendly_name.to_string(),
                other: Map::new(),
            },
            other: Map::new(),
        }
    }
}

/// Extension generator options
#[derive(Debug, Clone, Default)]
pub struct ExtensionOptions {
    /// Task name pattern
    pub task: Option<String>,
    /// Build one composite extension
    pub all: bool,
    /// Comma-separated task list for the per-task mode
    pub exts: Option<String>,
}

/// Identity of a task as it appears in a manifest
struct TaskEntry {
    descriptor: TaskDescriptor,
    package_name: String,
}

/// Generate and bundle extensions; returns the tasks that were included
pub fn make_extensions(ctx: &PipelineContext<'_>, options: &ExtensionOptions) -> Result<Vec<String>> {
    ctx.ensure(ToolKind::Bundler)?;

    let tasks = match options.exts.as_deref().filter(|_| !options.all) {
        Some(list) => split_list(list),
        None => ctx.resolve(options.task.as_deref())?,
    };
    let timer = ctx.start_stage(Stage::Extensions, tasks.len());
    std::fs::create_dir_all(&ctx.layout.build_dir)?;

    let included = if options.all {
        composite_extension(ctx, &tasks)?
    } else {
        let mut included = Vec::new();
        for task in &tasks {
            let bundled = ctx.run_task(Stage::Extensions, task, || task_extension(ctx, task))?;
            if bundled {
                included.push(task.clone());
            }
        }
        included
    };

    timer.finish(ctx);
    Ok(included)
}

fn composite_extension(ctx: &PipelineContext<'_>, tasks: &[String]) -> Result<Vec<String>> {
    let layout = &ctx.layout;
    let settings = &ctx.config.extension;
    let dest = &layout.build_dir;

    ctx.step("copying extension assets");
    if let Some(name) = layout.assets_dir.file_name() {
        copy_dir_recursive(&layout.assets_dir, &dest.join(name))?;
    }
    let pattern = layout.root.join("*.md").to_string_lossy().to_string();
    for doc in find_paths(&pattern)? {
        if let Some(name) = doc.file_name() {
            copy_file(&doc, &dest.join(name))?;
        }
    }
    let overview_source = dest.join(&settings.overview_source);
    if !overview_source.is_file() {
        return Err(NotFoundError::Path(overview_source).into());
    }
    copy_file(&overview_source, &dest.join(&settings.overview))?;

    let mut manifest = load_manifest(&layout.assets_dir.join(&settings.manifest))?;
    manifest.contributions.clear();
    manifest.files = vec![ManifestFile {
        path: settings.overview.clone(),
        other: Map::new(),
    }];

    let mut included = Vec::new();
    for task in tasks {
        let Some(entry) = load_task_entry(ctx, task)? else {
            continue;
        };
        info!(task = %entry.descriptor.name, "adding task to composite manifest");
        manifest.files.push(ManifestFile {
            path: entry.descriptor.name.clone(),
            other: Map::new(),
        });
        manifest.contributions.push(Contribution::task(
            settings,
            &entry.package_name,
            &entry.descriptor.name,
            entry.descriptor.display_name(),
        ));
        included.push(task.clone());
    }

    write_and_bundle(ctx, &manifest)?;
    Ok(included)
}

/// Fill the template for one task; `false` when the task has no descriptor
fn task_extension(ctx: &PipelineContext<'_>, task: &str) -> Result<bool> {
    let layout = &ctx.layout;
    let settings = &ctx.config.extension;

    let task_dir = layout.task_dir(task);
    if !task_dir.is_dir() {
        return Err(TaskError::DirectoryNotFound {
            task: task.to_string(),
            path: task_dir,
        }
        .into());
    }
    let Some(entry) = load_task_entry(ctx, task)? else {
        info!(task, "no descriptor, skipping extension");
        return Ok(false);
    };
    let descriptor = &entry.descriptor;

    let mut manifest = load_manifest(&layout.assets_dir.join(&settings.template))?;
    manifest.version = Some(descriptor.version.to_string());
    manifest.id = format!("{}-{}", manifest.id, descriptor.name);
    manifest.name = format!("{} {}", manifest.name, descriptor.display_name());

    match manifest.files.first_mut() {
        Some(file) => file.path = descriptor.name.clone(),
        None => manifest.files.push(ManifestFile {
            path: descriptor.name.clone(),
            other: Map::new(),
        }),
    }
    match manifest.contributions.first_mut() {
        Some(contribution) => {
            contribution.id = entry.package_name.clone();
            contribution.properties.name = descriptor.name.clone();
            contribution.properties.friendly_name = descriptor.display_name().to_string();
        }
        None => manifest.contributions.push(Contribution::task(
            settings,
            &entry.package_name,
            &descriptor.name,
            descriptor.display_name(),
        )),
    }

    let mut icon = layout.output_dir(task).join(&settings.icon);
    if !icon.is_file() {
        manifest
            .icons
            .insert("default".to_string(), Value::String(settings.icon.clone()));
        icon = layout.assets_dir.join(&settings.icon);
    }
    ctx.step(format!("using icon {}", icon.display()));
    copy_file(&icon, &layout.build_dir.join(&settings.icon))?;

    write_and_bundle(ctx, &manifest)?;
    Ok(true)
}

fn load_task_entry(ctx: &PipelineContext<'_>, task: &str) -> Result<Option<TaskEntry>> {
    let task_dir = ctx.layout.task_dir(task);
    let descriptor_path = task_dir.join(TASK_DESCRIPTOR);
    if !descriptor_path.is_file() {
        return Ok(None);
    }
    let descriptor = TaskDescriptor::load(task, &descriptor_path)?;
    let package = PackageManifest::load(task, &task_dir.join(PACKAGE_JSON))?;
    let package_name = package.require_name(task)?.to_string();
    Ok(Some(TaskEntry {
        descriptor,
        package_name,
    }))
}

fn load_manifest(path: &Path) -> Result<ExtensionManifest> {
    if !path.is_file() {
        return Err(NotFoundError::Path(path.to_path_buf()).into());
    }
    read_json(path)
}

fn write_and_bundle(ctx: &PipelineContext<'_>, manifest: &ExtensionManifest) -> Result<()> {
    let name = &ctx.config.extension.manifest;
    write_json(&ctx.layout.build_dir.join(name), manifest, 4)?;
    ctx.runner
        .bundle(&Invocation::in_dir(&ctx.layout.build_dir), name)
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{context, node_task, read_json, write};
    use taskpack_tools::{RecordingToolRunner, ToolCall};
    use tempfile::TempDir;

    const TEMPLATE: &str = r#"{
    "manifestVersion": 1,
    "id": "build-task",
    "name": "Build Task",
    "publisher": "openbank",
    "version": "0.0.0",
    "files": [{ "path": "placeholder", "addressable": true }],
    "contributions": [{
        "id": "placeholder",
        "type": "ms.vss-distributed-task.task",
        "targets": ["ms.vss-distributed-task.tasks"],
        "properties": { "name": "placeholder" }
    }]
}"#;

    fn assets(root: &Path) {
        write(&root.join("assets/vss-extension-template.json"), TEMPLATE);
        write(
            &root.join("assets/vss-extension.json"),
            r#"{"id": "all-tasks", "name": "All Tasks", "files": [{"path": "old"}], "contributions": [{"id": "old"}]}"#,
        );
        write(&root.join("assets/extension-icon.png"), "default-icon");
        write(&root.join("ParallelBuilds.md"), "# Overview");
        write(&root.join("README.md"), "# Readme");
    }

    #[test]
    fn test_per_task_manifest_from_template() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        assets(root);
        node_task(root, "Alpha", "Alpha", "4");
        write(&root.join("_build/Tasks/Alpha/extension-icon.png"), "alpha-icon");

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let options = ExtensionOptions {
            exts: Some("Alpha".to_string()),
            ..Default::default()
        };
        assert_eq!(make_extensions(&ctx, &options).unwrap(), vec!["Alpha"]);

        let manifest = read_json(&root.join("_build/Tasks/vss-extension.json"));
        assert_eq!(manifest["version"], "1.2.4");
        assert_eq!(manifest["id"], "build-task-Alpha");
        assert_eq!(manifest["name"], "Build Task Alpha Task");
        assert_eq!(manifest["files"][0]["path"], "Alpha");
        assert_eq!(manifest["files"][0]["addressable"], true);
        assert_eq!(manifest["contributions"][0]["id"], "vsts-alpha");
        assert_eq!(manifest["contributions"][0]["properties"]["friendlyName"], "Alpha Task");
        assert_eq!(manifest["publisher"], "openbank");
        assert!(manifest.get("icons").is_none());
        assert_eq!(
            std::fs::read_to_string(root.join("_build/Tasks/extension-icon.png")).unwrap(),
            "alpha-icon"
        );

        let bundles = runner.calls_to(ToolKind::Bundler);
        assert_eq!(bundles.len(), 1);
        assert!(matches!(
            &bundles[0],
            ToolCall::Bundle { invocation, manifest }
                if manifest == "vss-extension.json"
                    && invocation.cwd == root.join("_build/Tasks")
        ));
    }

    #[test]
    fn test_default_icon_fallback() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        assets(root);
        node_task(root, "Beta", "Beta", "0");
        write(&root.join("make-options.json"), r#"{"tasks": ["Beta"]}"#);

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        make_extensions(&ctx, &ExtensionOptions::default()).unwrap();

        let manifest = read_json(&root.join("_build/Tasks/vss-extension.json"));
        assert_eq!(manifest["icons"]["default"], "extension-icon.png");
        assert_eq!(
            std::fs::read_to_string(root.join("_build/Tasks/extension-icon.png")).unwrap(),
            "default-icon"
        );
    }

    #[test]
    fn test_composite_manifest() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        assets(root);
        node_task(root, "Alpha", "Alpha", "0");
        node_task(root, "Beta", "Beta", "0");
        std::fs::create_dir_all(root.join("Tasks/Gamma")).unwrap();
        write(&root.join("make-options.json"), r#"{"tasks": ["Beta", "Gamma", "Alpha"]}"#);

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let options = ExtensionOptions {
            all: true,
            ..Default::default()
        };
        assert_eq!(make_extensions(&ctx, &options).unwrap(), vec!["Beta", "Alpha"]);

        let build = root.join("_build/Tasks");
        assert!(build.join("assets/vss-extension.json").is_file());
        assert!(build.join("README.md").is_file());
        assert_eq!(std::fs::read_to_string(build.join("overview.md")).unwrap(), "# Overview");

        let manifest = read_json(&build.join("vss-extension.json"));
        let files: Vec<_> = manifest["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["path"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(files, vec!["overview.md", "Beta", "Alpha"]);
        let contributions = manifest["contributions"].as_array().unwrap();
        assert_eq!(contributions.len(), 2);
        assert_eq!(contributions[0]["id"], "vsts-beta");
        assert_eq!(contributions[0]["type"], "ms.vss-distributed-task.task");
        assert_eq!(contributions[0]["targets"][0], "ms.vss-distributed-task.tasks");
        assert_eq!(contributions[1]["properties"]["name"], "Alpha");
        assert_eq!(runner.calls_to(ToolKind::Bundler).len(), 1);
    }

    #[test]
    fn test_missing_task_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        assets(root);

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let options = ExtensionOptions {
            exts: Some("Nope".to_string()),
            ..Default::default()
        };
        assert!(make_extensions(&ctx, &options).unwrap_err().to_string().contains("Nope"));
        assert!(runner.calls_to(ToolKind::Bundler).is_empty());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("Alpha, Beta,,"), vec!["Alpha", "Beta"]);
    }
}
