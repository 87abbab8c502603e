use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use anyhow::{Context, Result};

use crate::error::SentinelError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub alert: AlertConfig,
}

/// Thresholds and timers for the fall state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Frames averaged by the landmark smoother
    pub smoothing_window: usize,
    /// Head drop speed (normalized units/s) that counts as falling
    pub drop_velocity_threshold: f32,
    /// Torso angle below which the subject is considered horizontal
    pub fall_angle_threshold_deg: f32,
    /// Time spent horizontal before a fall is confirmed
    pub lying_confirm_secs: f64,
    /// Time without a horizontal reading before a suspected fall is dropped
    pub potential_fall_timeout_secs: f64,
    /// Minimum body height to enter a suspected fall
    pub entry_height_gate: f32,
    /// Minimum body height, while upright, to recover from a fall
    pub recovery_height_gate: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            drop_velocity_threshold: 0.3,
            fall_angle_threshold_deg: 45.0,
            lying_confirm_secs: 3.0,
            potential_fall_timeout_secs: 1.5,
            entry_height_gate: 0.4,
            recovery_height_gate: 0.5,
        }
    }
}

impl DetectionConfig {
    pub fn lying_confirm(&self) -> Result<Duration, SentinelError> {
        seconds("lying_confirm_secs", self.lying_confirm_secs)
    }

    pub fn potential_fall_timeout(&self) -> Result<Duration, SentinelError> {
        seconds("potential_fall_timeout_secs", self.potential_fall_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), SentinelError> {
        if self.smoothing_window == 0 {
            return Err(invalid("smoothing_window must be at least 1"));
        }
        positive("drop_velocity_threshold", self.drop_velocity_threshold as f64)?;
        positive("lying_confirm_secs", self.lying_confirm_secs)?;
        positive("potential_fall_timeout_secs", self.potential_fall_timeout_secs)?;
        self.lying_confirm()?;
        self.potential_fall_timeout()?;
        // 0 disables a height gate.
        non_negative("entry_height_gate", self.entry_height_gate as f64)?;
        non_negative("recovery_height_gate", self.recovery_height_gate as f64)?;

        let angle = self.fall_angle_threshold_deg;
        if !angle.is_finite() || angle <= 0.0 || angle > 90.0 {
            return Err(invalid(format!(
                "fall_angle_threshold_deg must be in (0, 90], got {angle}"
            )));
        }
        Ok(())
    }
}

/// Notification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum spacing between dispatched alerts
    pub cooldown_secs: f64,
    /// Where the camera is, included in the alert message
    pub location: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 10.0,
            location: "Living Room (Camera 1)".to_string(),
        }
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Result<Duration, SentinelError> {
        seconds("cooldown_secs", self.cooldown_secs)
    }

    pub fn validate(&self) -> Result<(), SentinelError> {
        non_negative("cooldown_secs", self.cooldown_secs)?;
        self.cooldown().map(|_| ())
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SentinelError> {
        self.detection.validate()?;
        self.alert.validate()
    }
}

fn invalid(message: impl Into<String>) -> SentinelError {
    SentinelError::InvalidConfig(message.into())
}

fn positive(name: &str, value: f64) -> Result<(), SentinelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be positive, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), SentinelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be non-negative, got {value}")))
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration, SentinelError> {
    Duration::try_from_secs_f64(secs).map_err(|e| invalid(format!("{name} = {secs}: {e}")))
}
