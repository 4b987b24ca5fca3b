// src/config/validate.rs

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{
    ConfigFile, OperationConfig, RasterSection, RawConfigFile, SupervisorSettings,
};
use crate::errors::{Result, SupervisorError};
use crate::types::TaskKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SupervisorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let supervisor = validate_supervisor(&raw)?;
        validate_toolkit(&raw)?;
        let operations = validate_operations(&raw)?;
        let raster = validate_raster(&raw)?;

        Ok(ConfigFile {
            supervisor,
            toolkit: raw.toolkit,
            operations,
            raster,
        })
    }
}

fn config_error(msg: impl Into<String>) -> SupervisorError {
    SupervisorError::ConfigError(msg.into())
}

fn duration_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| config_error(format!("[supervisor].{field}: {e}")))
}

fn validate_supervisor(cfg: &RawConfigFile) -> Result<SupervisorSettings> {
    let section = &cfg.supervisor;
    let poll_interval = duration_field("poll_interval", &section.poll_interval)?;
    let time_budget = duration_field("time_budget", &section.time_budget)?;

    if poll_interval.is_zero() {
        return Err(config_error("[supervisor].poll_interval must be > 0"));
    }
    if time_budget < poll_interval {
        return Err(config_error(format!(
            "[supervisor].time_budget ({}) must be >= poll_interval ({})",
            section.time_budget, section.poll_interval
        )));
    }
    if section.event_buffer == 0 {
        return Err(config_error("[supervisor].event_buffer must be >= 1 (got 0)"));
    }

    let settings = SupervisorSettings {
        poll_interval,
        time_budget,
        ramp_polls: section.ramp_polls,
        event_buffer: section.event_buffer,
    };

    let ceiling = settings.max_polls();
    if section.ramp_polls < 2 || section.ramp_polls >= ceiling {
        return Err(config_error(format!(
            "[supervisor].ramp_polls must be in 2..{ceiling} for the configured budget (got {})",
            section.ramp_polls
        )));
    }

    Ok(settings)
}

fn validate_toolkit(cfg: &RawConfigFile) -> Result<()> {
    if cfg.toolkit.program.trim().is_empty() {
        return Err(config_error("[toolkit].program must not be empty"));
    }
    if cfg.toolkit.database_env.trim().is_empty() {
        return Err(config_error("[toolkit].database_env must not be empty"));
    }
    Ok(())
}

fn validate_operations(cfg: &RawConfigFile) -> Result<BTreeMap<TaskKind, OperationConfig>> {
    let mut operations = BTreeMap::new();
    for (name, op) in cfg.operation.iter() {
        let kind: TaskKind = name
            .parse()
            .map_err(|e: String| config_error(format!("[operation.{name}]: {e}")))?;
        if let Some(sub) = &op.subcommand {
            if sub.trim().is_empty() {
                return Err(config_error(format!(
                    "[operation.{name}].subcommand must not be empty"
                )));
            }
        }
        operations.insert(kind, op.clone());
    }
    Ok(operations)
}

/// Accepts `"nc"` as well as `".nc"`; the stored extension has no dot.
fn validate_raster(cfg: &RawConfigFile) -> Result<RasterSection> {
    let ext = cfg.raster.extension.trim().trim_start_matches('.');
    if ext.is_empty() {
        return Err(config_error("[raster].extension must not be empty"));
    }
    Ok(RasterSection {
        extension: ext.to_string(),
    })
}
