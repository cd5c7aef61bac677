//! Desktop action executor
//!
//! Performs actions against the running desktop:
//! - overlay toggle through the mode collaborator
//! - volume through media keys, browser navigation through key taps
//! - brightness through user-configured commands
//! - program launch and custom commands as detached processes
//! - on-screen keyboard toggle (close the open one, else launch)
//!
//! Power actions are disabled unless `actions.allow_power` is set.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{require_payload, ActionError, ActionExecutor, ActionId};
use crate::config::ActionsConfig;
use crate::emulation::{InputSink, Key};
use crate::mode::ModeControl;

/// Windows moves the master volume by 2% per volume key press
const VOLUME_PER_KEY_PRESS: f32 = 0.02;

pub struct DesktopActions {
    config: ActionsConfig,
    sink: Arc<dyn InputSink>,
    mode: Arc<dyn ModeControl>,
}

impl DesktopActions {
    pub fn new(config: ActionsConfig, sink: Arc<dyn InputSink>, mode: Arc<dyn ModeControl>) -> Self {
        Self { config, sink, mode }
    }

    /// Number of volume key presses for one configured step
    fn volume_presses(&self) -> u32 {
        ((self.config.volume_step / VOLUME_PER_KEY_PRESS).round() as u32).max(1)
    }

    fn volume(&self, key: Key) {
        let presses = self.volume_presses();
        for _ in 0..presses {
            self.sink.tap_key(key);
        }
        debug!("{:?} x{}", key, presses);
    }

    fn brightness(&self, action: ActionId) -> Result<(), ActionError> {
        let template = match action {
            ActionId::BrightnessUp => self.config.brightness_up_command.as_deref(),
            _ => self.config.brightness_down_command.as_deref(),
        };
        let Some(template) = template.filter(|t| !t.trim().is_empty()) else {
            return Err(ActionError::Unsupported(action));
        };
        let command = template.replace("{step}", &self.config.brightness_step.to_string());
        run_shell(&command)
    }

    fn power(&self, action: ActionId) -> Result<(), ActionError> {
        if !self.config.allow_power {
            info!("Power action '{}' disabled", action);
            return Ok(());
        }
        let command = match action {
            ActionId::PowerShutdown => POWER_SHUTDOWN_COMMAND,
            _ => POWER_SLEEP_COMMAND,
        };
        info!("⏻ Executing power action '{}'", action);
        run_shell(command)
    }

    fn toggle_osk(&self) -> Result<(), ActionError> {
        if close_on_screen_keyboard() {
            debug!("On-screen keyboard close command sent");
            return Ok(());
        }
        open_program(ActionId::ToggleOsk, &self.config.osk_command)?;
        debug!("On-screen keyboard launched: {}", self.config.osk_command);
        Ok(())
    }
}

impl ActionExecutor for DesktopActions {
    fn execute(&mut self, action: ActionId, payload: Option<&str>) -> Result<(), ActionError> {
        match action {
            ActionId::None => Ok(()),
            ActionId::ToggleOverlay => {
                self.mode.request_overlay_toggle();
                Ok(())
            }
            ActionId::VolumeUp => {
                self.volume(Key::VolumeUp);
                Ok(())
            }
            ActionId::VolumeDown => {
                self.volume(Key::VolumeDown);
                Ok(())
            }
            ActionId::VolumeMute => {
                self.sink.tap_key(Key::VolumeMute);
                Ok(())
            }
            ActionId::BrightnessUp | ActionId::BrightnessDown => self.brightness(action),
            ActionId::PowerShutdown | ActionId::PowerSleep => self.power(action),
            ActionId::LaunchApp => open_program(action, require_payload(action, payload)?),
            ActionId::CustomCommand => run_shell(require_payload(action, payload)?),
            ActionId::BrowserBack => {
                self.sink.tap_key(Key::BrowserBack);
                debug!("Browser back");
                Ok(())
            }
            ActionId::BrowserForward => {
                self.sink.tap_key(Key::BrowserForward);
                debug!("Browser forward");
                Ok(())
            }
            ActionId::ToggleOsk => self.toggle_osk(),
            ActionId::NextDisplay | ActionId::TvPower | ActionId::TvInput => {
                Err(ActionError::Unsupported(action))
            }
        }
    }
}

#[cfg(windows)]
const POWER_SHUTDOWN_COMMAND: &str = "shutdown /s /t 0";
#[cfg(windows)]
const POWER_SLEEP_COMMAND: &str = "rundll32.exe powrprof.dll,SetSuspendState 0,1,0";
#[cfg(not(windows))]
const POWER_SHUTDOWN_COMMAND: &str = "systemctl poweroff";
#[cfg(not(windows))]
const POWER_SLEEP_COMMAND: &str = "systemctl suspend";

/// Open a program, document or URL through the shell
///
/// ShellExecute honours application manifests (osk.exe needs uiAccess) and
/// file associations.
#[cfg(windows)]
fn open_program(action: ActionId, target: &str) -> Result<(), ActionError> {
    use windows::core::{w, HSTRING, PCWSTR};
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Shell::ShellExecuteW;
    use windows::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

    let file = HSTRING::from(target);
    let instance = unsafe {
        ShellExecuteW(
            HWND::default(),
            w!("open"),
            PCWSTR(file.as_ptr()),
            PCWSTR::null(),
            PCWSTR::null(),
            SW_SHOWNORMAL,
        )
    };
    shell_execute_result(action, target, instance.0 as isize)
}

/// Start a program without waiting for it
#[cfg(not(windows))]
fn open_program(_action: ActionId, program: &str) -> Result<(), ActionError> {
    let child = Command::new(program)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ActionError::Spawn {
            command: program.to_string(),
            source,
        })?;
    debug!("Launched '{}' (pid {})", program, child.id());
    reap(child);
    Ok(())
}

/// ShellExecute reports success with a value above 32
#[cfg_attr(not(windows), allow(dead_code))]
fn shell_execute_result(action: ActionId, target: &str, code: isize) -> Result<(), ActionError> {
    if code > 32 {
        debug!("Opened '{}'", target);
        return Ok(());
    }
    let reason = match code {
        0 => "out of memory or resources".to_string(),
        2 => format!("'{}' not found", target),
        3 => format!("path of '{}' not found", target),
        5 => "access denied".to_string(),
        31 => format!("no application is associated with '{}'", target),
        other => format!("ShellExecute error {}", other),
    };
    Err(ActionError::Failed { action, reason })
}

/// Wait for a detached child on a helper thread so it does not linger as a zombie
fn reap(mut child: Child) -> Option<JoinHandle<Option<ExitStatus>>> {
    let pid = child.id();
    let spawned = std::thread::Builder::new()
        .name(format!("padpilot-reap-{}", pid))
        .spawn(move || match child.wait() {
            Ok(status) => {
                trace!("Process {} exited: {}", pid, status);
                Some(status)
            }
            Err(e) => {
                warn!("Failed to wait for process {}: {}", pid, e);
                None
            }
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Failed to start reaper for process {}: {}", pid, e);
            None
        }
    }
}

/// Run a command line through the platform shell without waiting for it
fn run_shell(command: &str) -> Result<(), ActionError> {
    #[cfg(windows)]
    let mut cmd = {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    };
    #[cfg(not(windows))]
    let mut cmd = {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        c
    };

    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ActionError::Spawn {
            command: command.to_string(),
            source,
        })?;
    debug!("Started '{}' (pid {})", command, child.id());
    reap(child);
    Ok(())
}

/// Ask an open on-screen keyboard to close
///
/// # Returns
/// `true` if a keyboard window was found and told to close
#[cfg(windows)]
fn close_on_screen_keyboard() -> bool {
    use windows::core::{w, PCWSTR};
    use windows::Win32::Foundation::{LPARAM, WPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{FindWindowW, PostMessageW, SC_CLOSE, WM_SYSCOMMAND};

    let hwnd = unsafe { FindWindowW(w!("OSKMainClass"), PCWSTR::null()) };
    if hwnd.0 == 0 {
        return false;
    }
    if let Err(e) = unsafe { PostMessageW(hwnd, WM_SYSCOMMAND, WPARAM(SC_CLOSE as usize), LPARAM(0)) } {
        warn!("Failed to close on-screen keyboard: {}", e);
    }
    true
}

#[cfg(not(windows))]
fn close_on_screen_keyboard() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::{ButtonDirection, SinkEvent, VirtualSink};
    use crate::mode::SharedMode;

    fn desktop(config: ActionsConfig) -> (DesktopActions, Arc<VirtualSink>, Arc<SharedMode>) {
        let sink = Arc::new(VirtualSink::new(100, 100));
        let mode = Arc::new(SharedMode::new());
        (DesktopActions::new(config, sink.clone(), mode.clone()), sink, mode)
    }

    fn key_downs(events: &[SinkEvent], key: Key) -> usize {
        events
            .iter()
            .filter(|e| **e == SinkEvent::Key(key, ButtonDirection::Down))
            .count()
    }

    #[test]
    fn test_volume_step_becomes_key_presses() {
        let (mut actions, sink, _) = desktop(ActionsConfig::default());
        actions.execute(ActionId::VolumeUp, None).unwrap();
        let events = sink.take_events();
        assert_eq!(key_downs(&events, Key::VolumeUp), 5);
        assert_eq!(events.len(), 10);

        actions.execute(ActionId::VolumeMute, None).unwrap();
        assert_eq!(key_downs(&sink.take_events(), Key::VolumeMute), 1);
    }

    #[test]
    fn test_tiny_volume_step_still_presses_once() {
        let config = ActionsConfig { volume_step: 0.001, ..ActionsConfig::default() };
        let (mut actions, sink, _) = desktop(config);
        actions.execute(ActionId::VolumeDown, None).unwrap();
        assert_eq!(key_downs(&sink.events(), Key::VolumeDown), 1);
    }

    #[test]
    fn test_browser_navigation_taps_keys() {
        let (mut actions, sink, _) = desktop(ActionsConfig::default());
        actions.execute(ActionId::BrowserBack, None).unwrap();
        actions.execute(ActionId::BrowserForward, None).unwrap();
        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::Key(Key::BrowserBack, ButtonDirection::Down),
                SinkEvent::Key(Key::BrowserBack, ButtonDirection::Up),
                SinkEvent::Key(Key::BrowserForward, ButtonDirection::Down),
                SinkEvent::Key(Key::BrowserForward, ButtonDirection::Up),
            ]
        );
    }

    #[test]
    fn test_overlay_toggle_goes_through_mode() {
        let (mut actions, _, mode) = desktop(ActionsConfig::default());
        actions.execute(ActionId::ToggleOverlay, None).unwrap();
        assert!(mode.is_overlay_visible());
    }

    #[test]
    fn test_power_is_disabled_by_default() {
        let (mut actions, sink, _) = desktop(ActionsConfig::default());
        assert!(actions.execute(ActionId::PowerShutdown, None).is_ok());
        assert!(actions.execute(ActionId::PowerSleep, None).is_ok());
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_unsupported_actions() {
        let (mut actions, _, _) = desktop(ActionsConfig::default());
        for action in [ActionId::NextDisplay, ActionId::TvPower, ActionId::TvInput, ActionId::BrightnessUp] {
            assert!(matches!(
                actions.execute(action, None),
                Err(ActionError::Unsupported(a)) if a == action
            ));
        }
    }

    #[test]
    fn test_payload_actions_need_payload() {
        let (mut actions, _, _) = desktop(ActionsConfig::default());
        assert!(matches!(
            actions.execute(ActionId::LaunchApp, None),
            Err(ActionError::MissingPayload(ActionId::LaunchApp))
        ));
        assert!(matches!(
            actions.execute(ActionId::CustomCommand, Some("")),
            Err(ActionError::MissingPayload(ActionId::CustomCommand))
        ));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_launch_of_missing_program_reports_spawn_error() {
        let (mut actions, _, _) = desktop(ActionsConfig::default());
        let result = actions.execute(ActionId::LaunchApp, Some("padpilot-no-such-program"));
        assert!(matches!(result, Err(ActionError::Spawn { .. })));
    }

    #[test]
    fn test_shell_execute_codes() {
        assert!(shell_execute_result(ActionId::ToggleOsk, "osk.exe", 42).is_ok());
        match shell_execute_result(ActionId::LaunchApp, "report.xyz", 31) {
            Err(ActionError::Failed { action, reason }) => {
                assert_eq!(action, ActionId::LaunchApp);
                assert!(reason.contains("report.xyz"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            shell_execute_result(ActionId::ToggleOsk, "osk.exe", 5),
            Err(ActionError::Failed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_detached_children_are_reaped() {
        let child = Command::new("sh").args(["-c", "exit 3"]).spawn().unwrap();
        let status = reap(child).unwrap().join().unwrap().unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn test_none_is_a_no_op() {
        let (mut actions, sink, _) = desktop(ActionsConfig::default());
        actions.execute(ActionId::None, None).unwrap();
        assert!(sink.events().is_empty());
    }
}
