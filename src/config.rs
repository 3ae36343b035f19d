//! # Engine Configuration
//!
//! Tunables read at startup. Every field has a default so a partial (or missing)
//! `config.json` is fine.

use anyhow::Context;
use serde::Deserialize;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "assets/config.json";

/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "VOXEL_BUILDER_CONFIG";

/// Top-level configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Cells along each side of the surface grid.
    pub world_size: usize,
    pub terrain: TerrainConfig,
    pub camera: CameraConfig,
}

/// Controls terrain randomization.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    pub mountains: usize,
    pub ridges: usize,
    pub ridge_steps: usize,
    pub max_mountain_radius: usize,

    /// Fixed seed for reproducible terrain. Random when absent.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Movement speed in world units per second.
    pub speed: f32,

    /// Mouse look sensitivity.
    pub sensitivity: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            world_size: 40,
            terrain: TerrainConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        TerrainConfig {
            mountains: 6,
            ridges: 4,
            ridge_steps: 40,
            max_mountain_radius: 4,
            seed: None,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            speed: 8.0,
            sensitivity: 0.4,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(text).context("Failed to parse engine configuration")?;
        Ok(config.sanitized())
    }

    /// Loads the configuration file named by `VOXEL_BUILDER_CONFIG`, falling
    /// back to `assets/config.json`.
    ///
    /// A missing file yields the defaults. A malformed one is reported and
    /// also yields the defaults.
    #[cfg(not(target_family = "wasm"))]
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        match std::fs::read_to_string(&path) {
            Ok(text) => match Self::from_json(&text) {
                Ok(config) => {
                    log::info!("Loaded configuration from {path}");
                    config
                }
                Err(err) => {
                    log::warn!("{err:#} ({path}), using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No configuration at {path}, using defaults");
                Self::default()
            }
        }
    }

    /// Replaces values the engine cannot run with.
    fn sanitized(mut self) -> Self {
        if self.world_size == 0 {
            log::warn!("world_size must be positive, using {}", Self::default().world_size);
            self.world_size = Self::default().world_size;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.world_size, 40);
        assert_eq!(config.terrain.mountains, 6);
        assert_eq!(config.terrain.ridges, 4);
        assert_eq!(config.terrain.ridge_steps, 40);
        assert_eq!(config.terrain.max_mountain_radius, 4);
        assert_eq!(config.terrain.seed, None);
        assert_approx_eq!(config.camera.speed, 8.0);
        assert_approx_eq!(config.camera.sensitivity, 0.4);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = EngineConfig::from_json(r#"{ "world_size": 12, "terrain": { "seed": 9 } }"#)
            .unwrap();
        assert_eq!(config.world_size, 12);
        assert_eq!(config.terrain.seed, Some(9));
        assert_eq!(config.terrain.mountains, 6);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn zero_world_size_is_replaced() {
        let config = EngineConfig::from_json(r#"{ "world_size": 0 }"#).unwrap();
        assert_eq!(config.world_size, 40);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EngineConfig::from_json("{ world_size: ").is_err());
        assert!(EngineConfig::from_json(r#"{ "world_size": "big" }"#).is_err());
    }
}
