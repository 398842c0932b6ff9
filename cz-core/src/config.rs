//! Craft parameters: recipe- and character-derived constants, immutable for
//! the lifetime of a run.
//!
//! The canonical instantiation (a level-70 three-star recipe) is compiled in
//! as `Default`; a YAML file with the same keys may override it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid craft parameters: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CraftParams {
    pub max_cp: i16,
    pub max_durability: i16,
    pub base_control: i16,
    pub max_progress: i16,
    pub max_quality: i16,
    /// Progress quantum for a 100%-efficiency action.
    pub base_progress: i16,
    /// Progress quantum while ingenuity is active.
    pub ingenuity_progress: i16,
    /// Quality coefficients, fitted from game data.
    pub base_quality_coef: f64,
    pub ingenuity_quality_coef: f64,
}

impl Default for CraftParams {
    fn default() -> Self {
        Self {
            max_cp: 522,
            max_durability: 70,
            base_control: 1476,
            max_progress: 3548,
            max_quality: 25881,
            base_progress: 465,
            ingenuity_progress: 559,
            base_quality_coef: 15.5163,
            ingenuity_quality_coef: 26.3881,
        }
    }
}

impl CraftParams {
    /// Load parameters from a YAML file and validate them.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse parameters from a YAML string and validate them.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let params: CraftParams = serde_yaml::from_str(yaml)?;
        params.validate()?;
        Ok(params)
    }

    /// Range checks backing the packed state key's bit budget and the
    /// simulator's integer arithmetic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..1024).contains(&self.max_cp) {
            return Err(ConfigError::Invalid("max_cp must be in 1..1024"));
        }
        if !(5..=120).contains(&self.max_durability) {
            return Err(ConfigError::Invalid("max_durability must be in 5..=120"));
        }
        if self.max_durability % 5 != 0 {
            return Err(ConfigError::Invalid("max_durability must be divisible by 5"));
        }
        if !(1..8192).contains(&self.max_progress) {
            return Err(ConfigError::Invalid("max_progress must be in 1..8192"));
        }
        if self.max_quality < 1 {
            return Err(ConfigError::Invalid("max_quality must be positive"));
        }
        if self.base_control < 1 {
            return Err(ConfigError::Invalid("base_control must be positive"));
        }
        if self.base_progress < 1 || self.ingenuity_progress < 1 {
            return Err(ConfigError::Invalid("progress quanta must be positive"));
        }
        if self.base_quality_coef <= 0.0 || self.ingenuity_quality_coef <= 0.0 {
            return Err(ConfigError::Invalid("quality coefficients must be positive"));
        }
        Ok(())
    }
}
