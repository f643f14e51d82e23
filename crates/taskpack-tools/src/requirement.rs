//! Tool presence and version requirements

use std::sync::LazyLock;

use regex::Regex;
use semver::{Version, VersionReq};
use taskpack_core::config::ToolConfig;
use taskpack_core::error::{ConfigError, Result, ToolError};
use taskpack_core::ToolKind;
use tracing::debug;

use crate::traits::ToolRunner;

/// First dotted number in a tool's version output
static VERSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("Invalid regex"));

/// Extract the first `x[.y[.z]]` number from tool output, padding missing
/// components with zero
pub fn extract_version(output: &str) -> Option<Version> {
    let caps = VERSION_REGEX.captures(output)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Outcome of a successful tool check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub kind: ToolKind,
    pub command: String,
    /// Parsed version, when the tool reports one
    pub version: Option<Version>,
}

/// Check that a tool exists and satisfies its configured version requirement
pub fn ensure_tool(runner: &dyn ToolRunner, kind: ToolKind, tool: &ToolConfig) -> Result<ToolStatus> {
    let expected = tool.version.clone().unwrap_or_else(|| "on PATH".to_string());

    let output = runner.version(kind)?.ok_or_else(|| ToolError::NotFound {
        tool: tool.command.clone(),
        expected: expected.clone(),
    })?;

    let Some(requirement) = &tool.version else {
        debug!(tool = %tool.command, "tool present");
        return Ok(ToolStatus {
            kind,
            command: tool.command.clone(),
            version: extract_version(&output),
        });
    };

    let req = VersionReq::parse(requirement).map_err(|e| ConfigError::InvalidValue {
        field: format!("tools.{}.version", kind.as_str().replace('-', "_")),
        message: e.to_string(),
    })?;

    let found = extract_version(&output).ok_or_else(|| ToolError::UnknownVersion {
        tool: tool.command.clone(),
        output: output.clone(),
    })?;

    if !req.matches(&found) {
        return Err(ToolError::VersionMismatch {
            tool: tool.command.clone(),
            found: found.to_string(),
            expected,
        }
        .into());
    }

    debug!(tool = %tool.command, version = %found, requirement, "tool satisfies requirement");
    Ok(ToolStatus {
        kind,
        command: tool.command.clone(),
        version: Some(found),
    })
}
