//! Node configuration (SPEC_FULL.md §1 ambient stack): a single
//! `KudzuConfig`, serde-derived and loadable from a file with
//! environment-variable overrides, generalizing the teacher's
//! `CognitiveConfig` pattern (plain struct, `Default` impl, named
//! constructors, validated setters) to Kudzu's options (spec.md §6).

use serde::{Deserialize, Serialize};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApiAuthConfig {
    pub enabled: bool,
}

impl Default for ApiAuthConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationSettings {
    pub light_interval_ms: u64,
    pub deep_interval_ms: u64,
}

impl Default for ConsolidationSettings {
    fn default() -> Self {
        Self { light_interval_ms: 600_000, deep_interval_ms: 21_600_000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    pub hot_to_warm_seconds: u64,
    pub warm_to_cold_seconds: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { hot_to_warm_seconds: 3600, warm_to_cold_seconds: 604_800 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrrSettings {
    pub dimension: usize,
}

impl Default for HrrSettings {
    fn default() -> Self {
        Self { dimension: 512 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub blend_strength: f32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self { blend_strength: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub name: String,
    pub budget_limit_monthly_usd: f64,
    pub max_turns: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self { name: "claude-sonnet".to_string(), budget_limit_monthly_usd: 20.0, max_turns: 6 }
    }
}

/// All recognized options (spec.md §6's Configuration table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct KudzuConfig {
    pub api_auth: ApiAuthConfig,
    pub cycle_interval_ms: CycleInterval,
    pub consolidation: ConsolidationSettings,
    pub storage: StorageSettings,
    pub hrr: HrrSettings,
    pub encoder: EncoderSettings,
    pub model: ModelSettings,
}

/// Wraps the bare `cycle_interval_ms` integer so it carries its own
/// `Default`, matching the brain's stand-alone constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleInterval(pub u64);

impl Default for CycleInterval {
    fn default() -> Self {
        Self(300_000)
    }
}

impl KudzuConfig {
    /// Load from a TOML file, falling back to defaults for anything
    /// the file omits is not supported by partial merge here — the
    /// file must be a complete document. Environment variables
    /// prefixed `KUDZU_` override individual leaf values after load.
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not valid TOML for this shape.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        let mut config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("KUDZU_CYCLE_INTERVAL_MS") {
            if let Ok(parsed) = raw.parse() {
                self.cycle_interval_ms = CycleInterval(parsed);
            }
        }
        if let Ok(raw) = std::env::var("KUDZU_HRR_DIMENSION") {
            if let Ok(parsed) = raw.parse() {
                self.hrr.dimension = parsed;
            }
        }
        if let Ok(raw) = std::env::var("KUDZU_MODEL_NAME") {
            self.model.name = raw;
        }
    }

    /// Validate invariants not expressible in the type system:
    /// `hrr.dimension` must be positive, `encoder.blend_strength` must
    /// be in `[0, 1]`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first violated
    /// invariant found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hrr.dimension == 0 {
            return Err(ConfigError::Invalid("hrr.dimension must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.encoder.blend_strength) {
            return Err(ConfigError::Invalid("encoder.blend_strength must be in [0, 1]".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = KudzuConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_dimension_is_invalid() {
        let mut config = KudzuConfig::default();
        config.hrr.dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_blend_strength_is_invalid() {
        let mut config = KudzuConfig::default();
        config.encoder.blend_strength = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn serde_roundtrip_preserves_values() {
        let config = KudzuConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: KudzuConfig = toml::from_str(&text).unwrap();
        assert_eq!(config, parsed);
    }
}
