//! Runner configuration file.
use std::{fs, path::Path};

use c8vm::prelude::{Chip8Conf, KeyCode};
use serde::Deserialize;

use crate::error::AppError;

/// Settings for a single run, loaded from YAML.
///
/// ```yaml
/// vm:
///   clock_frequency: 700
///   timers: external
///   quirks:
///     shift_uses_vy: true
///   rng_seed: 42
/// frames: 120
/// throttle: false
/// keys: [5, 15]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub vm: Chip8Conf,
    /// Number of 60Hz frames to run before exiting.
    pub frames: u64,
    /// Hold each frame to 1/60th of a second.
    pub throttle: bool,
    /// Keypad keys held down for the whole run.
    pub keys: Vec<KeyCode>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            vm: Chip8Conf::default(),
            frames: 600,
            throttle: true,
            keys: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, AppError> {
        Ok(serde_yaml::from_str(contents)?)
    }
}
