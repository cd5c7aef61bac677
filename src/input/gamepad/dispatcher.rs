//! Button → action dispatch
//!
//! Runs once per tick on the active device's slot. The mapping table is fixed
//! for the dispatcher's lifetime; a config reload builds a new engine.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::buttons::Button;
use super::edges::Edges;
use super::slot::ControllerSlot;
use crate::actions::{ActionExecutor, ActionId};
use crate::mode::ModeControl;

/// A single button binding
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ButtonMapping {
    pub button: Button,
    pub action: ActionId,
    /// Program path or shell command for `launch_app` / `custom_command`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Declared hold requirement (see [`ButtonMapping::should_fire`])
    #[serde(default)]
    pub requires_hold: bool,
    #[serde(default)]
    pub hold_duration_ms: u32,
}

impl ButtonMapping {
    pub fn new(button: Button, action: ActionId) -> Self {
        Self {
            button,
            action,
            payload: None,
            requires_hold: false,
            hold_duration_ms: 0,
        }
    }

    pub fn held(mut self, duration_ms: u32) -> Self {
        self.requires_hold = true;
        self.hold_duration_ms = duration_ms;
        self
    }

    /// Whether this binding fires on the given slot this tick
    ///
    /// Hold bindings fire on the initial press like any other binding; the
    /// hold duration is not measured.
    pub fn should_fire(&self, slot: &ControllerSlot) -> bool {
        if self.action == ActionId::None {
            return false;
        }
        if self.requires_hold {
            slot.is_button_pressed(self.button) && slot.is_button_just_pressed(self.button)
        } else {
            slot.is_button_just_pressed(self.button)
        }
    }
}

/// Built-in binding table used when the config has no `mappings` section
pub fn default_mappings() -> Vec<ButtonMapping> {
    vec![
        ButtonMapping::new(Button::Start, ActionId::ToggleOverlay),
        ButtonMapping::new(Button::Back, ActionId::VolumeMute),
        ButtonMapping::new(Button::Y, ActionId::PowerSleep).held(2000),
        ButtonMapping::new(Button::X, ActionId::ToggleOsk),
        ButtonMapping::new(Button::LeftShoulder, ActionId::BrowserBack),
        ButtonMapping::new(Button::RightShoulder, ActionId::BrowserForward),
        ButtonMapping::new(Button::B, ActionId::None),
    ]
}

/// Turns edge events on the active slot into action executions
pub struct ActionDispatcher {
    mappings: Vec<ButtonMapping>,
    mode_toggle_button: Button,
    executor: Box<dyn ActionExecutor>,
}

impl ActionDispatcher {
    /// Create a dispatcher
    ///
    /// # Arguments
    /// * `mappings` - Binding table, iterated in order
    /// * `mode_toggle_button` - Button that toggles the mode while the overlay is shown
    /// * `executor` - Where fired actions go
    pub fn new(
        mappings: Vec<ButtonMapping>,
        mode_toggle_button: Button,
        executor: Box<dyn ActionExecutor>,
    ) -> Self {
        if mappings.iter().any(|m| m.requires_hold && m.action != ActionId::None) {
            warn!("⚠️  Hold bindings fire on first press; hold duration is not evaluated");
        }
        Self {
            mappings,
            mode_toggle_button,
            executor,
        }
    }

    /// Process one tick for the active slot
    ///
    /// While the overlay is visible, a press of the mode-toggle button toggles
    /// the mode and nothing else fires that tick. Executor failures are logged
    /// and do not stop later bindings.
    ///
    /// # Returns
    /// The actions that fired, in table order (a mode toggle is reported as
    /// no actions).
    pub fn process(&mut self, slot: &ControllerSlot, mode: &dyn ModeControl) -> Vec<ActionId> {
        if !slot.connected {
            return Vec::new();
        }

        let edges = Edges::between(&slot.current, &slot.previous);
        if edges.is_empty() {
            return Vec::new();
        }
        trace!(
            controller = slot.index,
            pressed = edges.pressed,
            released = edges.released,
            "Button edges"
        );
        if edges.pressed == 0 {
            return Vec::new();
        }

        if mode.is_overlay_visible() && slot.is_button_just_pressed(self.mode_toggle_button) {
            debug!(
                "Mode toggle via {} on controller {}",
                self.mode_toggle_button, slot.index
            );
            mode.request_mode_toggle();
            return Vec::new();
        }

        let mut fired = Vec::new();
        for mapping in &self.mappings {
            if !mapping.should_fire(slot) {
                continue;
            }

            debug!(
                controller = slot.index,
                button = mapping.button.name(),
                action = mapping.action.name(),
                "Executing action"
            );
            if let Err(e) = self.executor.execute(mapping.action, mapping.payload.as_deref()) {
                warn!("⚠️  Action {} failed: {}", mapping.action, e);
            }
            fired.push(mapping.action);
        }
        fired
    }
}
