//! Console executor - logs all actions for testing and debugging

use std::sync::Arc;
use tracing::{debug, info};

use super::{require_payload, ActionError, ActionExecutor, ActionId};
use crate::mode::ModeControl;

/// ConsoleActions logs every action instead of performing it
///
/// This is useful for:
/// - Trying a mapping table without touching the desktop
/// - Debugging dispatch order and payloads
///
/// With a mode collaborator attached, `toggle_overlay` still flips the
/// overlay, so a dry run can reach desktop-control mode.
pub struct ConsoleActions {
    name: String,
    mode: Option<Arc<dyn ModeControl>>,
    /// Execution counter for debugging
    execution_count: u64,
}

impl ConsoleActions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: None,
            execution_count: 0,
        }
    }

    /// Route `toggle_overlay` to `mode` instead of only logging it
    pub fn with_mode(mut self, mode: Arc<dyn ModeControl>) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }
}

impl ActionExecutor for ConsoleActions {
    fn execute(&mut self, action: ActionId, payload: Option<&str>) -> Result<(), ActionError> {
        // Same payload contract as the real executor
        if action.needs_payload() {
            require_payload(action, payload)?;
        }

        self.execution_count += 1;

        info!(
            "🎮 [{}] '{}' → {} ({}) [exec #{}]",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.name,
            action,
            payload.unwrap_or("no payload"),
            self.execution_count
        );

        debug!(
            executor = self.name.as_str(),
            action = action.name(),
            payload = ?payload,
            exec_count = self.execution_count,
            "ConsoleActions execution"
        );

        if let (ActionId::ToggleOverlay, Some(mode)) = (action, &self.mode) {
            mode.request_overlay_toggle();
        }

        Ok(())
    }
}

impl Drop for ConsoleActions {
    fn drop(&mut self) {
        info!(
            "🛑 ConsoleActions '{}' shutting down (executed {} actions)",
            self.name, self.execution_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::SharedMode;

    #[test]
    fn test_counts_executions() {
        let mut actions = ConsoleActions::new("test");
        actions.execute(ActionId::VolumeUp, None).unwrap();
        actions.execute(ActionId::LaunchApp, Some("notepad.exe")).unwrap();
        assert_eq!(actions.execution_count(), 2);
    }

    #[test]
    fn test_missing_payload_is_rejected_and_not_counted() {
        let mut actions = ConsoleActions::new("test");
        let result = actions.execute(ActionId::CustomCommand, Some(""));
        assert!(matches!(result, Err(ActionError::MissingPayload(ActionId::CustomCommand))));
        assert_eq!(actions.execution_count(), 0);
    }

    #[test]
    fn test_overlay_toggle_reaches_attached_mode() {
        let mode = Arc::new(SharedMode::new());
        let mut actions = ConsoleActions::new("test").with_mode(mode.clone());
        actions.execute(ActionId::ToggleOverlay, None).unwrap();
        assert!(mode.is_overlay_visible());
        actions.execute(ActionId::ToggleOverlay, None).unwrap();
        assert!(!mode.is_overlay_visible());
        assert_eq!(actions.execution_count(), 2);
    }

    #[test]
    fn test_overlay_toggle_without_mode_only_logs() {
        let mut actions = ConsoleActions::new("test");
        actions.execute(ActionId::ToggleOverlay, None).unwrap();
        assert_eq!(actions.execution_count(), 1);
    }

    #[test]
    fn test_power_actions_are_logged_like_any_other() {
        let mut actions = ConsoleActions::new("test");
        for _ in 0..3 {
            actions.execute(ActionId::PowerSleep, None).unwrap();
        }
        assert_eq!(actions.execution_count(), 3);
    }
}
