//! Task resolution: which tasks a command operates on

use std::collections::HashSet;
use std::path::Path;

use glob::Pattern;
use tracing::{debug, info};

use crate::error::{InputError, NotFoundError, Result};
use crate::layout::Layout;
use crate::options::MakeOptions;

/// Resolve the ordered task list.
///
/// With a pattern, every immediate child directory of the tasks directory
/// whose name matches is returned, sorted by name. Without one, the default
/// list from the options file is returned in declared order.
pub fn resolve_tasks(layout: &Layout, pattern: Option<&str>) -> Result<Vec<String>> {
    match pattern {
        Some(pattern) => match_task_dirs(&layout.tasks_dir, pattern),
        None => default_tasks(&layout.options_file),
    }
}

/// Match task directories by name, non-recursively
pub fn match_task_dirs(tasks_dir: &Path, pattern: &str) -> Result<Vec<String>> {
    debug!(dir = %tasks_dir.display(), pattern, "matching task directories");
    let matcher = Pattern::new(pattern).map_err(|e| InputError::InvalidValue {
        field: "--task".to_string(),
        message: format!("'{}' is not a valid pattern: {}", pattern, e),
    })?;

    let mut tasks = Vec::new();
    if tasks_dir.is_dir() {
        for entry in std::fs::read_dir(tasks_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if matcher.matches(&name) {
                tasks.push(name);
            }
        }
    }

    if tasks.is_empty() {
        return Err(NotFoundError::NoTasks {
            pattern: pattern.to_string(),
        }
        .into());
    }

    tasks.sort();
    info!(count = tasks.len(), pattern, "resolved tasks from pattern");
    Ok(tasks)
}

/// Load the default task list, rejecting duplicates
pub fn default_tasks(options_file: &Path) -> Result<Vec<String>> {
    let options = MakeOptions::load(options_file)?;

    let mut seen = HashSet::new();
    for task in &options.tasks {
        if !seen.insert(task.as_str()) {
            return Err(InputError::InvalidValue {
                field: "tasks".to_string(),
                message: format!("task '{}' is listed more than once", task),
            }
            .into());
        }
    }

    info!(count = options.tasks.len(), "resolved tasks from default list");
    Ok(options.tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use crate::error::TaskpackError;
    use tempfile::TempDir;

    fn layout(temp: &TempDir) -> Layout {
        Layout::new(temp.path(), &PathsConfig::default())
    }

    #[test]
    fn test_default_list_preserves_order() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("make-options.json"),
            r#"{"tasks": ["Zulu", "Alpha", "Mike"]}"#,
        )
        .unwrap();

        let tasks = resolve_tasks(&layout(&temp), None).unwrap();
        assert_eq!(tasks, vec!["Zulu", "Alpha", "Mike"]);
    }

    #[test]
    fn test_default_list_rejects_duplicates() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("make-options.json"),
            r#"{"tasks": ["Alpha", "Alpha"]}"#,
        )
        .unwrap();

        assert!(resolve_tasks(&layout(&temp), None).is_err());
    }

    #[test]
    fn test_pattern_matches_immediate_children_only() {
        let temp = TempDir::new().unwrap();
        let tasks = temp.path().join("Tasks");
        std::fs::create_dir_all(tasks.join("ShellScript")).unwrap();
        std::fs::create_dir_all(tasks.join("ShellCheck")).unwrap();
        std::fs::create_dir_all(tasks.join("Other").join("ShellNested")).unwrap();
        std::fs::write(tasks.join("ShellFile"), "").unwrap();

        let resolved = resolve_tasks(&layout(&temp), Some("Shell*")).unwrap();
        assert_eq!(resolved, vec!["ShellCheck", "ShellScript"]);
    }

    #[test]
    fn test_pattern_without_match_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("Tasks").join("Alpha")).unwrap();

        let err = resolve_tasks(&layout(&temp), Some("Nope*")).unwrap_err();
        assert!(matches!(
            err,
            TaskpackError::NotFound(NotFoundError::NoTasks { ref pattern }) if pattern == "Nope*"
        ));
    }

    #[test]
    fn test_missing_options_file() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            resolve_tasks(&layout(&temp), None).unwrap_err(),
            TaskpackError::NotFound(NotFoundError::Path(_))
        ));
    }
}
