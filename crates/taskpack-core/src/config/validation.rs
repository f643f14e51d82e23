//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::{Config, ToolKind};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_paths(config)?;
    validate_tools(config)?;
    validate_package(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_paths(config: &Config) -> Result<()> {
    let paths = &config.paths;
    let required = [
        ("paths.tasks", &paths.tasks),
        ("paths.build", &paths.build),
        ("paths.common", &paths.common),
        ("paths.package", &paths.package),
        ("paths.options", &paths.options),
    ];

    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: "path cannot be empty".to_string(),
            }
            .into());
        }
    }

    Ok(())
}

fn validate_tools(config: &Config) -> Result<()> {
    for kind in ToolKind::ALL {
        let tool = config.tools.get(kind);
        let field = format!("tools.{}", kind.as_str().replace('-', "_"));

        if tool.command.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.command", field),
                message: "command cannot be empty".to_string(),
            }
            .into());
        }

        if let Some(ref requirement) = tool.version {
            if let Err(e) = semver::VersionReq::parse(requirement) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.version", field),
                    message: format!("'{}' is not a valid version requirement: {}", requirement, e),
                }
                .into());
            }
        }
    }

    Ok(())
}

fn validate_package(config: &Config) -> Result<()> {
    if config.package.id.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "package.id".to_string(),
            message: "package id cannot be empty".to_string(),
        }
        .into());
    }

    if config.package.layout_version.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "package.layout_version".to_string(),
            message: "layout version cannot be empty".to_string(),
        }
        .into());
    }

    Ok(())
}
