use paper_core::FaultPolicy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::player::{DEFAULT_RELEASE_TEXTURE, DEFAULT_SPEED};

/// Which script drives the player entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptChoice {
    Native,
    Lua(PathBuf),
}

impl ScriptChoice {
    /// `"native"` selects the Rust script, anything else is a Lua path.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("native") {
            Self::Native
        } else {
            Self::Lua(PathBuf::from(value))
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_release_texture")]
    pub release_texture: String,
    #[serde(default = "default_script")]
    pub script: String,
    #[serde(default)]
    pub replay: Option<PathBuf>,
    #[serde(default)]
    pub fault_policy: FaultPolicy,
    #[serde(default)]
    pub hot_reload: bool,
}

impl RunnerConfig {
    pub fn script_choice(&self) -> ScriptChoice {
        ScriptChoice::parse(&self.script)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            release_texture: default_release_texture(),
            script: default_script(),
            replay: None,
            fault_policy: FaultPolicy::default(),
            hot_reload: false,
        }
    }
}

pub fn load_config_from_path(path: &Path) -> Result<RunnerConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
    let config: RunnerConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &RunnerConfig) -> Result<(), String> {
    if !config.speed.is_finite() {
        return Err("Config validation failed: speed must be finite".to_string());
    }
    if config.release_texture.trim().is_empty() {
        return Err("Config validation failed: release_texture is empty".to_string());
    }
    if config.script.trim().is_empty() {
        return Err("Config validation failed: script is empty".to_string());
    }
    Ok(())
}

const fn default_speed() -> f32 {
    DEFAULT_SPEED
}

fn default_release_texture() -> String {
    DEFAULT_RELEASE_TEXTURE.to_string()
}

fn default_script() -> String {
    "native".to_string()
}
