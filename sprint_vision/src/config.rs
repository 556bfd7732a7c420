use crate::core_modules::debouncer::{DEFAULT_COOLDOWN, DEFAULT_MOTION_THRESHOLD_PERCENT};
use crate::core_modules::zone::{DetectionZone, FULL_FRAME, ZoneBounds};
use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SENSITIVITY: f64 = 30.0;
pub const MIN_SENSITIVITY: f64 = 10.0;
pub const MAX_SENSITIVITY: f64 = 100.0;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "SPRINT_VISION_CONFIG";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct EngineConfigFile {
    sensitivity: Option<f64>,
    motion_threshold_percent: Option<f64>,
    cooldown_ms: Option<u64>,
    zone: Option<DetectionZone>,
    zone_bounds: Option<ZoneBounds>,
}

/// Tunable parameters of the sprint engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Per-pixel channel difference that counts as change, 10..=100.
    pub sensitivity: f64,
    /// Zone in effect when the engine starts.
    pub zone: DetectionZone,
    /// Limits the zone editor resizes within.
    pub zone_bounds: ZoneBounds,
    /// Percent of zone pixels that must change to count as motion.
    pub motion_threshold_percent: f64,
    /// Minimum gap between two detections.
    pub cooldown: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            zone: DetectionZone::default(),
            zone_bounds: ZoneBounds::default(),
            motion_threshold_percent: DEFAULT_MOTION_THRESHOLD_PERCENT,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl EngineConfig {
    /// Loads from the file named by `SPRINT_VISION_CONFIG` (if set), then applies
    /// `SPRINT_*` environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load_with(path.as_deref().map(Path::new), |key| std::env::var(key).ok())
    }

    /// Loads from an optional file and resolves overrides through `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => EngineConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_overrides(lookup)?;
        cfg.validate();
        Ok(cfg)
    }

    fn from_file(file: EngineConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            sensitivity: file.sensitivity.unwrap_or(defaults.sensitivity),
            zone: file.zone.unwrap_or(defaults.zone),
            zone_bounds: file.zone_bounds.unwrap_or(defaults.zone_bounds),
            motion_threshold_percent: file
                .motion_threshold_percent
                .unwrap_or(defaults.motion_threshold_percent),
            cooldown: file
                .cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.cooldown),
        }
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = non_empty(lookup("SPRINT_SENSITIVITY")) {
            self.sensitivity = parse_number("SPRINT_SENSITIVITY", &value)?;
        }
        if let Some(value) = non_empty(lookup("SPRINT_MOTION_THRESHOLD")) {
            self.motion_threshold_percent = parse_number("SPRINT_MOTION_THRESHOLD", &value)?;
        }
        if let Some(value) = non_empty(lookup("SPRINT_COOLDOWN_MS")) {
            let millis: u64 = value.trim().parse().map_err(|_| {
                EngineError::Config(
                    "SPRINT_COOLDOWN_MS must be an integer number of milliseconds".to_string(),
                )
            })?;
            self.cooldown = Duration::from_millis(millis);
        }
        Ok(())
    }

    /// Saturates every field into its documented range.
    fn validate(&mut self) {
        self.sensitivity = Self::saturate_sensitivity(self.sensitivity);
        self.motion_threshold_percent = if self.motion_threshold_percent.is_nan() {
            DEFAULT_MOTION_THRESHOLD_PERCENT
        } else {
            self.motion_threshold_percent.clamp(0.0, FULL_FRAME)
        };
        self.zone_bounds = self.zone_bounds.normalized();
        let zone = DetectionZone::new(self.zone.x, self.zone.y, self.zone.width, self.zone.height);
        self.zone = zone.resized(zone.width, zone.height, &self.zone_bounds);
    }

    pub fn saturate_sensitivity(sensitivity: f64) -> f64 {
        if sensitivity.is_nan() {
            DEFAULT_SENSITIVITY
        } else {
            sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY)
        }
    }
}

fn read_config_file(path: &Path) -> Result<EngineConfigFile> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        EngineError::Config(format!("failed to read config file {}: {}", path.display(), e))
    })?;
    toml::from_str(&raw)
        .map_err(|e| EngineError::Config(format!("invalid config file {}: {}", path.display(), e)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_number(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::Config(format!("{key} must be a number, got {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let cfg = EngineConfig::load_with(None, env(&[])).unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.sensitivity, 30.0);
        assert_eq!(cfg.cooldown, Duration::from_millis(500));
        assert_eq!(cfg.zone, DetectionZone::default());
    }

    #[test]
    fn env_overrides_apply() {
        let cfg = EngineConfig::load_with(
            None,
            env(&[
                ("SPRINT_SENSITIVITY", "45"),
                ("SPRINT_MOTION_THRESHOLD", " 7.5 "),
                ("SPRINT_COOLDOWN_MS", "750"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.sensitivity, 45.0);
        assert_eq!(cfg.motion_threshold_percent, 7.5);
        assert_eq!(cfg.cooldown, Duration::from_millis(750));
    }

    #[test]
    fn out_of_range_values_saturate() {
        let cfg = EngineConfig::load_with(
            None,
            env(&[("SPRINT_SENSITIVITY", "400"), ("SPRINT_MOTION_THRESHOLD", "-3")]),
        )
        .unwrap();
        assert_eq!(cfg.sensitivity, MAX_SENSITIVITY);
        assert_eq!(cfg.motion_threshold_percent, 0.0);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let cfg = EngineConfig::load_with(None, env(&[("SPRINT_SENSITIVITY", "  ")])).unwrap();
        assert_eq!(cfg.sensitivity, DEFAULT_SENSITIVITY);
    }

    #[test]
    fn unparsable_env_value_is_an_error() {
        let err = EngineConfig::load_with(None, env(&[("SPRINT_COOLDOWN_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(msg) if msg.contains("SPRINT_COOLDOWN_MS")));
    }
}
