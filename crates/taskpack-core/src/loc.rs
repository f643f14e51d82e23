//! Localisation resources generated from task and module descriptors.
//!
//! Two files are produced in the source directory: `task.loc.json`, where
//! every localisable string is replaced by an `ms-resource:` reference, and
//! the English resource table `Strings/resources.resjson/en-US/resources.resjson`.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::TASK_LOC_DESCRIPTOR;
use crate::error::Result;
use crate::jsonfile::write_json;

const RESOURCE_PREFIX: &str = "ms-resource:";

/// Top-level localisable fields, in resource order
const TOP_LEVEL_FIELDS: &[&str] = &[
    "friendlyName",
    "helpMarkDown",
    "description",
    "instanceNameFormat",
    "releaseNotes",
];

/// Path of the English resource table under a source directory
pub fn resjson_path(dir: &Path) -> PathBuf {
    dir.join("Strings")
        .join("resources.resjson")
        .join("en-US")
        .join("resources.resjson")
}

/// Build the `loc.* -> English string` table for a descriptor value
pub fn resource_strings(descriptor: &Value) -> Map<String, Value> {
    let mut resources = Map::new();

    for field in TOP_LEVEL_FIELDS {
        if let Some(value) = descriptor.get(*field) {
            resources.insert(format!("loc.{}", field), value.clone());
        }
    }

    for group in array(descriptor, "groups") {
        if let Some(name) = group.get("name").and_then(Value::as_str) {
            let display = group.get("displayName").cloned().unwrap_or(Value::Null);
            resources.insert(format!("loc.group.displayName.{}", name), display);
        }
    }

    for input in array(descriptor, "inputs") {
        if let Some(name) = input.get("name").and_then(Value::as_str) {
            let label = input.get("label").cloned().unwrap_or(Value::Null);
            resources.insert(format!("loc.input.label.{}", name), label);
            if let Some(help) = input.get("helpMarkDown") {
                resources.insert(format!("loc.input.help.{}", name), help.clone());
            }
        }
    }

    if let Some(messages) = descriptor.get("messages").and_then(Value::as_object) {
        for (key, message) in messages {
            resources.insert(format!("loc.messages.{}", key), message.clone());
        }
    }

    resources
}

/// Rewrite a task descriptor so every localisable string is a resource reference
pub fn localized_descriptor(descriptor: &Value) -> Value {
    let mut loc = descriptor.clone();
    let Some(obj) = loc.as_object_mut() else {
        return loc;
    };

    for field in ["friendlyName", "helpMarkDown", "description", "instanceNameFormat"] {
        obj.insert(field.to_string(), reference(&format!("loc.{}", field)));
    }
    if obj.contains_key("releaseNotes") {
        obj.insert("releaseNotes".to_string(), reference("loc.releaseNotes"));
    }

    if let Some(groups) = obj.get_mut("groups").and_then(Value::as_array_mut) {
        for group in groups.iter_mut().filter_map(Value::as_object_mut) {
            if let Some(name) = group.get("name").and_then(Value::as_str).map(str::to_string) {
                group.insert(
                    "displayName".to_string(),
                    reference(&format!("loc.group.displayName.{}", name)),
                );
            }
        }
    }

    if let Some(inputs) = obj.get_mut("inputs").and_then(Value::as_array_mut) {
        for input in inputs.iter_mut().filter_map(Value::as_object_mut) {
            if let Some(name) = input.get("name").and_then(Value::as_str).map(str::to_string) {
                input.insert(
                    "label".to_string(),
                    reference(&format!("loc.input.label.{}", name)),
                );
                input.insert(
                    "helpMarkDown".to_string(),
                    reference(&format!("loc.input.help.{}", name)),
                );
            }
        }
    }

    if let Some(messages) = obj.get_mut("messages").and_then(Value::as_object_mut) {
        for (key, message) in messages.iter_mut() {
            *message = reference(&format!("loc.messages.{}", key));
        }
    }

    loc
}

/// Write the English resource table for a task or module directory
pub fn write_resjson(descriptor: &Value, dir: &Path) -> Result<()> {
    let path = resjson_path(dir);
    debug!(path = %path.display(), "writing resource strings");
    write_json(&path, &Value::Object(resource_strings(descriptor)), 2)
}

/// Write `task.loc.json` into a task directory
pub fn write_task_loc_json(descriptor: &Value, dir: &Path) -> Result<()> {
    let path = dir.join(TASK_LOC_DESCRIPTOR);
    debug!(path = %path.display(), "writing localized descriptor");
    write_json(&path, &localized_descriptor(descriptor), 2)
}

fn reference(key: &str) -> Value {
    Value::String(format!("{}{}", RESOURCE_PREFIX, key))
}

fn array<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}
