//! TOML configuration loading and validation for [`MachineConfig`] (spec §7,
//! "Configuration & Ambient Stack").
//!
//! Mirrors the teacher's `evo_control_unit::config` `LoadedConfig`/`ConfigError`
//! split: parse with `toml`, then run semantic validation that a TOML schema
//! can't express (axis count bounds, positive rates, a homing cycle actually
//! assigned). A validation failure here is what drives the runtime into
//! `MachineState::ConfigAlarm` at boot (C10).

use std::fmt;
use std::path::Path;

use thiserror::Error as ThisError;
use tracing::{info, warn};

use crate::axis::{MachineConfig, MAX_AXES, MAX_MOTORS_PER_AXIS};

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("config validation failed: {0}")]
    Invalid(String),
}

/// A successfully parsed and validated config, with the path it came from
/// retained for diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: String,
    pub machine: MachineConfig,
}

impl fmt::Display for LoadedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} axes, {:?} kinematics)",
            self.machine.name,
            self.machine.axis_count(),
            self.machine.kinematics
        )
    }
}

/// Load and validate a machine config from a TOML file on disk.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<LoadedConfig, ConfigError> {
    let path_ref = path.as_ref();
    let path_str = path_ref.display().to_string();
    let text = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
        path: path_str.clone(),
        source,
    })?;
    load_from_str(&text, &path_str)
}

/// Parse and validate a machine config already held in memory (used by
/// tests and by `$config` reload handling, which reads the file itself
/// before calling in to avoid holding a lock across I/O).
pub fn load_from_str(text: &str, origin: &str) -> Result<LoadedConfig, ConfigError> {
    let machine: MachineConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: origin.to_string(),
        source,
    })?;
    validate(&machine)?;
    info!(origin, axes = machine.axis_count(), "config loaded");
    Ok(LoadedConfig {
        path: origin.to_string(),
        machine,
    })
}

/// Semantic checks a TOML schema cannot express on its own.
fn validate(cfg: &MachineConfig) -> Result<(), ConfigError> {
    if cfg.axes.is_empty() {
        return Err(ConfigError::Invalid("machine declares no axes".into()));
    }
    if cfg.axes.len() > MAX_AXES {
        return Err(ConfigError::Invalid(format!(
            "machine declares {} axes, maximum is {MAX_AXES}",
            cfg.axes.len()
        )));
    }
    for axis in &cfg.axes {
        if axis.motor_count == 0 || axis.motor_count as usize > MAX_MOTORS_PER_AXIS {
            return Err(ConfigError::Invalid(format!(
                "axis {} has invalid motor_count {}",
                axis.id.letter(),
                axis.motor_count
            )));
        }
        for m in 0..axis.motor_count as usize {
            if !(axis.steps_per_mm[m].is_finite() && axis.steps_per_mm[m] > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "axis {} motor {m} has non-positive steps_per_mm",
                    axis.id.letter()
                )));
            }
        }
        if axis.max_rate_mm_per_min <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "axis {} has non-positive max_rate_mm_per_min",
                axis.id.letter()
            )));
        }
        if axis.acceleration_mm_per_min2 <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "axis {} has non-positive acceleration_mm_per_min2",
                axis.id.letter()
            )));
        }
    }
    if cfg.junction_deviation_mm <= 0.0 {
        return Err(ConfigError::Invalid(
            "junction_deviation_mm must be positive".into(),
        ));
    }
    if cfg.arc_tolerance_mm <= 0.0 {
        return Err(ConfigError::Invalid(
            "arc_tolerance_mm must be positive".into(),
        ));
    }
    if cfg.planner_buffer_capacity < 16 {
        return Err(ConfigError::Invalid(
            "planner_buffer_capacity must be at least 16".into(),
        ));
    }
    if !cfg.axes.iter().any(|a| a.homing.is_some()) {
        warn!("no axis has a homing configuration; $H will be unavailable");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        r#"
        name = "test-mill"
        kinematics = "cartesian"
        junction_deviation_mm = 0.01
        arc_tolerance_mm = 0.002
        report_interval_ms = 200
        planner_buffer_capacity = 32

        [[axes]]
        id = 0
        steps_per_mm = [80.0, 0.0]
        motor_count = 1
        max_rate_mm_per_min = 5000.0
        acceleration_mm_per_min2 = 200.0
        max_travel_mm = 300.0
        "#
    }

    #[test]
    fn rejects_zero_axes() {
        let cfg = MachineConfig {
            name: "empty".into(),
            axes: vec![],
            kinematics: crate::axis::KinematicsKind::Cartesian,
            junction_deviation_mm: 0.01,
            arc_tolerance_mm: 0.002,
            report_interval_ms: 200,
            planner_buffer_capacity: 32,
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn rejects_small_planner_buffer() {
        let mut cfg: MachineConfig = toml::from_str(sample()).expect("parses");
        cfg.planner_buffer_capacity = 4;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }
}
