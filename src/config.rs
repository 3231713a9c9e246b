//! Bootstrap configuration. Engine settings are the fixed `VENDOR_SETTINGS` table.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::messages::Topic;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub engine: EngineConfig,
    pub update: UpdateConfig,
    pub topics: TopicNames,
    pub logging: LoggingConfig,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineBackend {
    #[default]
    Sim,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub backend: EngineBackend,
    pub sim: SimConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks between injected license faults, 0 disables injection.
    pub license_fault_every: u64,
    /// Uniform depth noise amplitude in millimeters.
    pub depth_noise_mm: f32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct UpdateConfig {
    pub rate_hz: f64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self { rate_hz: 30.0 }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TopicNames {
    pub color_image: String,
    pub depth_points: String,
    pub skeletons: String,
    pub users: String,
    pub person_appeared: String,
    pub person_disappeared: String,
}

impl Default for TopicNames {
    fn default() -> Self {
        Self {
            color_image: "/nuitrack/rgb/image_raw".to_string(),
            depth_points: "/nuitrack/depth/points".to_string(),
            skeletons: "/nuitrack/skeletons".to_string(),
            users: "/nuitrack/detected_users".to_string(),
            person_appeared: "/nuitrack/event/person_appeared".to_string(),
            person_disappeared: "/nuitrack/event/person_disappeared".to_string(),
        }
    }
}

impl TopicNames {
    pub fn name(&self, topic: Topic) -> &str {
        match topic {
            Topic::ColorImage => &self.color_image,
            Topic::DepthPoints => &self.depth_points,
            Topic::Skeletons => &self.skeletons,
            Topic::Users => &self.users,
            Topic::PersonAppeared => &self.person_appeared,
            Topic::PersonDisappeared => &self.person_disappeared,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter (trace, debug, info, warn, error); `RUST_LOG` wins.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: BridgeConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let rate = self.update.rate_hz;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(anyhow!("update.rate_hz must be positive, got {rate}"));
        }
        if !self.engine.sim.depth_noise_mm.is_finite() || self.engine.sim.depth_noise_mm < 0.0 {
            return Err(anyhow!(
                "engine.sim.depth_noise_mm must be non-negative, got {}",
                self.engine.sim.depth_noise_mm
            ));
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.update.rate_hz)
    }
}
