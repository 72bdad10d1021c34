//! Orchestrator configuration with documented constants
//!
//! Values here govern how a mini-game session interacts with the camera
//! layer and how mechanic randomness is seeded.

use serde::{Deserialize, Serialize};

use crate::core::error::{MiniGameError, Result};

/// Tunables for a `MiniGameOrchestrator`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    // === CAMERA ===
    /// Priority attached to every camera request a mini-game makes
    ///
    /// Gameplay modes sit well below this, cinematics above it. The
    /// arbitration service resolves ties in favour of the newest request.
    pub camera_priority: i32,

    /// Blend time into the mini-game camera mode (seconds)
    pub camera_request_blend: f32,

    /// Blend time back to the previous mode on release (seconds)
    pub camera_release_blend: f32,

    // === RANDOMNESS ===
    /// Seed for mechanic randomness (sweetspot and calibration targets)
    ///
    /// `None` seeds from entropy. Set this for reproducible runs and tests.
    pub rng_seed: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            camera_priority: 100,
            camera_request_blend: 0.3,
            camera_release_blend: 0.3,
            rng_seed: None,
        }
    }
}

impl OrchestratorConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config with a fixed RNG seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Self::default()
        }
    }

    /// Parse a config from TOML; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: OrchestratorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.camera_request_blend < 0.0 || self.camera_release_blend < 0.0 {
            return Err(MiniGameError::InvalidDefinition(format!(
                "camera blend times must be non-negative (request {}, release {})",
                self.camera_request_blend, self.camera_release_blend
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(OrchestratorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = OrchestratorConfig::from_toml_str("rng_seed = 7").unwrap();
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.camera_priority, 100);
    }

    #[test]
    fn test_negative_blend_rejected() {
        let result = OrchestratorConfig::from_toml_str("camera_release_blend = -1.0");
        assert!(result.is_err());
    }
}
