//! Task generator: scaffold a new task from the codegen template

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use taskpack_core::config::{PACKAGE_JSON, TASK_DESCRIPTOR};
use taskpack_core::error::{InputError, NotFoundError, Result, TaskError};
use taskpack_core::fsutil::{copy_matching, CopyFilter};
use taskpack_core::jsonfile::{read_json, write_json};
use taskpack_core::options::MakeOptions;
use tracing::info;

use crate::context::PipelineContext;
use crate::reporter::Stage;

/// Template entry point renamed after the task
const TEMPLATE_SOURCE: &str = "task.ts";

/// Generator options
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Name of the new task
    pub name: Option<String>,
}

/// A generated task
#[derive(Debug, Clone)]
pub struct GeneratedTask {
    pub name: String,
    pub dir: PathBuf,
    pub id: uuid::Uuid,
    /// Entry source file, `<name lowercase>.ts`
    pub source: String,
}

/// Create `Tasks/<name>` from the template and register it in the options file
pub fn generate(ctx: &PipelineContext<'_>, options: &GenerateOptions) -> Result<GeneratedTask> {
    let name = options
        .name
        .as_deref()
        .ok_or_else(|| InputError::Missing("task name with --name".to_string()))?;
    validate_name(name)?;

    let layout = &ctx.layout;
    let task_dir = layout.task_dir(name);
    let descriptor_path = task_dir.join(TASK_DESCRIPTOR);
    if descriptor_path.exists() {
        return Err(TaskError::AlreadyExists {
            task: name.to_string(),
            path: descriptor_path,
        }
        .into());
    }
    if !layout.codegen_dir.is_dir() {
        return Err(NotFoundError::Path(layout.codegen_dir.clone()).into());
    }
    let mut make_options = MakeOptions::load(&layout.options_file)?;

    let timer = ctx.start_stage(Stage::Generate, 1);
    ctx.step("copying template");
    std::fs::create_dir_all(&task_dir)?;
    copy_matching(&layout.codegen_dir, &task_dir, &CopyFilter::new(&["*.*".to_string()])?)?;

    let source = format!("{}.ts", name.to_lowercase());
    let template_source = task_dir.join(TEMPLATE_SOURCE);
    if template_source.is_file() {
        std::fs::rename(&template_source, task_dir.join(&source))?;
    }

    let id = uuid::Uuid::new_v4();
    ctx.step("writing package.json");
    update_package(name, &task_dir.join(PACKAGE_JSON), &source, &make_options)?;
    ctx.step("writing task.json");
    update_descriptor(name, &descriptor_path, &source, &id, &make_options)?;

    if !make_options.tasks.iter().any(|t| t == name) {
        make_options.tasks.push(name.to_string());
        make_options.save(&layout.options_file)?;
    }

    info!(task = name, id = %id, "task created");
    timer.finish(ctx);
    Ok(GeneratedTask {
        name: name.to_string(),
        dir: task_dir,
        id,
        source,
    })
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_whitespace);
    if invalid {
        return Err(InputError::InvalidValue {
            field: "--name".to_string(),
            message: format!("'{}' is not a valid task directory name", name),
        }
        .into());
    }
    Ok(())
}

fn update_package(task: &str, path: &Path, source: &str, options: &MakeOptions) -> Result<()> {
    let mut package = load_object(task, path, PACKAGE_JSON)?;
    let prefix = options.package_name.as_deref().unwrap_or("");
    package.insert(
        "name".to_string(),
        Value::String(format!("{}{}", prefix, task.to_lowercase())),
    );
    package.insert("main".to_string(), Value::String(source.to_string()));
    if let Some(author) = &options.author_name {
        package.insert("author".to_string(), Value::String(author.clone()));
    }
    if let Some(license) = &options.license {
        package.insert("license".to_string(), Value::String(license.clone()));
    }
    write_json(path, &package, 4)
}

fn update_descriptor(
    task: &str,
    path: &Path,
    source: &str,
    id: &uuid::Uuid,
    options: &MakeOptions,
) -> Result<()> {
    let mut descriptor = load_object(task, path, TASK_DESCRIPTOR)?;
    descriptor.insert("id".to_string(), Value::String(id.to_string()));
    for field in ["name", "friendlyName", "description"] {
        descriptor.insert(field.to_string(), Value::String(task.to_string()));
    }
    if let Some(author) = &options.author_name {
        descriptor.insert("author".to_string(), Value::String(author.clone()));
    }
    descriptor.insert(
        "instanceNameFormat".to_string(),
        Value::String(format!("{} $(testparam)", task)),
    );

    let execution = child_object(task, &mut descriptor, "execution")?;
    let node = child_object(task, execution, "Node")?;
    node.insert("target".to_string(), Value::String(source.to_string()));

    write_json(path, &descriptor, 4)
}

fn load_object(task: &str, path: &Path, file: &str) -> Result<Map<String, Value>> {
    if !path.is_file() {
        return Err(TaskError::FileNotFound {
            task: task.to_string(),
            path: path.to_path_buf(),
        }
        .into());
    }
    match read_json::<Value>(path)? {
        Value::Object(map) => Ok(map),
        _ => Err(TaskError::ParseFailed {
            task: task.to_string(),
            file: file.to_string(),
            message: "expected a JSON object".to_string(),
        }
        .into()),
    }
}

/// Object under `key`, created when absent
fn child_object<'m>(
    task: &str,
    map: &'m mut Map<String, Value>,
    key: &str,
) -> Result<&'m mut Map<String, Value>> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    entry.as_object_mut().ok_or_else(|| {
        TaskError::InvalidField {
            task: task.to_string(),
            field: key.to_string(),
            message: "must be an object".to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{context, read_json, write};
    use taskpack_core::TaskpackError;
    use taskpack_tools::RecordingToolRunner;
    use tempfile::TempDir;

    fn codegen(root: &Path) {
        let dir = root.join("codegen/task");
        write(&dir.join("task.ts"), "import tl = require('vsts-task-lib/task');");
        write(
            &dir.join("package.json"),
            r#"{"name": "template", "version": "1.0.0", "main": "task.js", "author": "Template", "license": "MIT"}"#,
        );
        write(
            &dir.join("task.json"),
            r#"{
    "id": "00000000-0000-0000-0000-000000000000",
    "name": "Template",
    "friendlyName": "Template",
    "description": "Template",
    "author": "Template",
    "version": { "Major": 0, "Minor": 1, "Patch": 0 },
    "instanceNameFormat": "Template",
    "execution": { "Node": { "target": "task.js" } }
}"#,
        );
        write(&dir.join("README"), "no extension");
    }

    #[test]
    fn test_generate_then_resolve_includes_task() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        codegen(root);
        write(
            &root.join("make-options.json"),
            r#"{"tasks": ["Alpha"], "packageName": "vsts-tasks-", "authorName": "Build Team"}"#,
        );

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let options = GenerateOptions {
            name: Some("DeployWeb".to_string()),
        };
        let generated = generate(&ctx, &options).unwrap();
        assert_eq!(generated.source, "deployweb.ts");

        let dir = root.join("Tasks/DeployWeb");
        assert!(dir.join("deployweb.ts").is_file());
        assert!(!dir.join("task.ts").exists());
        assert!(!dir.join("README").exists());

        let package = read_json(&dir.join("package.json"));
        assert_eq!(package["name"], "vsts-tasks-deployweb");
        assert_eq!(package["main"], "deployweb.ts");
        assert_eq!(package["author"], "Build Team");
        assert_eq!(package["license"], "MIT");

        let descriptor = read_json(&dir.join("task.json"));
        assert_eq!(descriptor["id"], generated.id.to_string());
        assert_eq!(descriptor["friendlyName"], "DeployWeb");
        assert_eq!(descriptor["description"], "DeployWeb");
        assert_eq!(descriptor["instanceNameFormat"], "DeployWeb $(testparam)");
        assert_eq!(descriptor["execution"]["Node"]["target"], "deployweb.ts");
        assert_eq!(descriptor["author"], "Build Team");

        assert_eq!(ctx.resolve(None).unwrap(), vec!["Alpha", "DeployWeb"]);
    }

    #[test]
    fn test_listed_task_without_descriptor_not_duplicated() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        codegen(root);
        write(&root.join("make-options.json"), r#"{"tasks": ["Alpha"]}"#);
        std::fs::create_dir_all(root.join("Tasks/Alpha")).unwrap();

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let options = GenerateOptions {
            name: Some("Alpha".to_string()),
        };
        generate(&ctx, &options).unwrap();

        assert!(root.join("Tasks/Alpha/task.json").is_file());
        assert_eq!(read_json(&root.join("make-options.json"))["tasks"], serde_json::json!(["Alpha"]));
        assert_eq!(ctx.resolve(None).unwrap(), vec!["Alpha"]);
    }

    #[test]
    fn test_existing_task_rejected() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        codegen(root);
        write(&root.join("make-options.json"), r#"{"tasks": []}"#);
        write(&root.join("Tasks/Alpha/task.json"), "{}");

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let options = GenerateOptions {
            name: Some("Alpha".to_string()),
        };
        assert!(matches!(
            generate(&ctx, &options).unwrap_err(),
            TaskpackError::Task(TaskError::AlreadyExists { .. })
        ));
        assert_eq!(std::fs::read_to_string(root.join("Tasks/Alpha/task.json")).unwrap(), "{}");
    }

    #[test]
    fn test_name_required_and_validated() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(temp.path(), &runner);

        assert!(matches!(
            generate(&ctx, &GenerateOptions::default()).unwrap_err(),
            TaskpackError::Input(InputError::Missing(_))
        ));
        let options = GenerateOptions {
            name: Some("../Escape".to_string()),
        };
        assert!(matches!(
            generate(&ctx, &options).unwrap_err(),
            TaskpackError::Input(InputError::InvalidValue { .. })
        ));
    }
}
