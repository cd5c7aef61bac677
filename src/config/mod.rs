//! Configuration management for padpilot
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.
//! Every section and field is optional; a missing file behaves like an empty
//! one and yields the built-in mapping table.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::input::gamepad::conditioning::{
    Conditioning, StickDeadzone, DEFAULT_STICK_DEADZONE_RAW, DEFAULT_TRIGGER_THRESHOLD,
};
use crate::input::gamepad::{default_mappings, BackendKind, Button, ButtonMapping, EngineSettings, PointerSettings};

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default = "default_mappings")]
    pub mappings: Vec<ButtonMapping>,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub pointer: PointerConfig,
}

/// Controller polling and signal conditioning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub backend: BackendKind,
    /// Stick deadzone in raw units (0-32767)
    #[serde(default = "default_deadzone")]
    pub deadzone: i32,
    #[serde(default)]
    pub deadzone_shape: StickDeadzone,
    #[serde(default = "default_trigger_threshold")]
    pub trigger_threshold: u8,
    /// Conditioned trigger value above which a trigger clicks (0.0-1.0)
    #[serde(default = "default_click_threshold")]
    pub click_threshold: f32,
    #[serde(default = "default_mouse_sensitivity")]
    pub mouse_sensitivity: f32,
    #[serde(default = "default_scroll_sensitivity")]
    pub scroll_sensitivity: f32,
    /// Button that toggles gamepad/desktop mode while the overlay is shown
    #[serde(default = "default_mode_toggle_button")]
    pub mode_toggle_button: Button,
}

/// Parameters of the desktop action executor
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionsConfig {
    /// Volume change per press (fraction of full scale)
    #[serde(default = "default_volume_step")]
    pub volume_step: f32,
    /// Brightness change per press (percent)
    #[serde(default = "default_brightness_step")]
    pub brightness_step: u8,
    /// Shell command run for `brightness_up`; `{step}` is replaced by the step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness_up_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness_down_command: Option<String>,
    /// Power actions only log unless this is set
    #[serde(default)]
    pub allow_power: bool,
    #[serde(default = "default_osk_command")]
    pub osk_command: String,
}

/// Virtual screen used when no real input injection is available
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PointerConfig {
    #[serde(default = "default_screen_width")]
    pub screen_width: i32,
    #[serde(default = "default_screen_height")]
    pub screen_height: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            mappings: default_mappings(),
            actions: ActionsConfig::default(),
            pointer: PointerConfig::default(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            backend: BackendKind::default(),
            deadzone: default_deadzone(),
            deadzone_shape: StickDeadzone::default(),
            trigger_threshold: default_trigger_threshold(),
            click_threshold: default_click_threshold(),
            mouse_sensitivity: default_mouse_sensitivity(),
            scroll_sensitivity: default_scroll_sensitivity(),
            mode_toggle_button: default_mode_toggle_button(),
        }
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            volume_step: default_volume_step(),
            brightness_step: default_brightness_step(),
            brightness_up_command: None,
            brightness_down_command: None,
            allow_power: false,
            osk_command: default_osk_command(),
        }
    }
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse, sanitize and validate YAML text
    pub fn parse(contents: &str) -> Result<Self> {
        // An empty document is a valid all-defaults config
        let mut config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };

        config.sanitize();
        config.validate()?;

        for mapping in config.inert_power_bindings() {
            info!(
                "Power binding {} → {} is a no-op while actions.allow_power is false",
                mapping.button, mapping.action
            );
        }

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Reset recoverable out-of-range values to their defaults
    pub fn sanitize(&mut self) {
        if !(0..=i16::MAX as i32).contains(&self.input.deadzone) {
            warn!(
                "⚠️  Invalid deadzone {} (must be 0-32767), using default {}",
                self.input.deadzone, DEFAULT_STICK_DEADZONE_RAW
            );
            self.input.deadzone = default_deadzone();
        }
    }

    /// Power bindings that will only log because power actions are disabled
    pub fn inert_power_bindings(&self) -> Vec<&ButtonMapping> {
        if self.actions.allow_power {
            return Vec::new();
        }
        self.mappings.iter().filter(|m| m.action.is_power()).collect()
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        let input = &self.input;
        if !(0.0..=1.0).contains(&input.click_threshold) {
            anyhow::bail!(
                "input.click_threshold {} is invalid (must be 0.0-1.0)",
                input.click_threshold
            );
        }
        if !(input.mouse_sensitivity > 0.0) {
            anyhow::bail!("input.mouse_sensitivity must be positive");
        }
        if !(input.scroll_sensitivity > 0.0) {
            anyhow::bail!("input.scroll_sensitivity must be positive");
        }

        if !(self.actions.volume_step > 0.0 && self.actions.volume_step <= 1.0) {
            anyhow::bail!(
                "actions.volume_step {} is invalid (must be in (0.0, 1.0])",
                self.actions.volume_step
            );
        }
        if self.actions.brightness_step == 0 || self.actions.brightness_step > 100 {
            anyhow::bail!(
                "actions.brightness_step {} is invalid (must be 1-100)",
                self.actions.brightness_step
            );
        }

        if self.pointer.screen_width <= 0 || self.pointer.screen_height <= 0 {
            anyhow::bail!(
                "pointer screen size {}x{} is invalid",
                self.pointer.screen_width,
                self.pointer.screen_height
            );
        }

        for (idx, mapping) in self.mappings.iter().enumerate() {
            if mapping.action.needs_payload()
                && mapping.payload.as_deref().map_or(true, |p| p.trim().is_empty())
            {
                anyhow::bail!(
                    "Mapping {} ({} → {}) requires a payload",
                    idx,
                    mapping.button,
                    mapping.action
                );
            }
        }

        Ok(())
    }

    /// Engine settings derived from this config
    pub fn engine_settings(&self) -> EngineSettings {
        let input = &self.input;
        EngineSettings {
            backend: input.backend,
            conditioning: Conditioning::from_raw(
                input.deadzone.clamp(0, i16::MAX as i32) as i16,
                input.deadzone_shape,
                input.trigger_threshold,
            ),
            pointer: PointerSettings {
                click_threshold: input.click_threshold,
                mouse_sensitivity: input.mouse_sensitivity,
                scroll_sensitivity: input.scroll_sensitivity,
            },
            mode_toggle_button: input.mode_toggle_button,
            mappings: self.mappings.clone(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_deadzone() -> i32 { DEFAULT_STICK_DEADZONE_RAW as i32 }
fn default_trigger_threshold() -> u8 { DEFAULT_TRIGGER_THRESHOLD }
fn default_click_threshold() -> f32 { 0.5 }
fn default_mouse_sensitivity() -> f32 { 20.0 }
fn default_scroll_sensitivity() -> f32 { 15.0 }
fn default_mode_toggle_button() -> Button { Button::A }
fn default_volume_step() -> f32 { 0.1 }
fn default_brightness_step() -> u8 { 10 }
fn default_screen_width() -> i32 { 1920 }
fn default_screen_height() -> i32 { 1080 }

#[cfg(windows)]
fn default_osk_command() -> String { "osk.exe".to_string() }
#[cfg(not(windows))]
fn default_osk_command() -> String { "onboard".to_string() }
