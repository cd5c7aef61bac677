//! Controller diagnostics tool for troubleshooting detection issues

use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

use super::buttons::Button;
use super::device::{open_backend, BackendKind};
use super::report::GamepadReport;
use super::slot::MAX_CONTROLLERS;

/// How long to scan before reporting
const SCAN_DURATION: Duration = Duration::from_secs(5);

/// Print what the selected backend sees on every slot
///
/// Scans for a few seconds first so Bluetooth controllers have time to wake
/// up, then prints each connected slot's last report.
pub fn print_controller_diagnostics(kind: BackendKind) {
    info!("=== Controller Diagnostics ===");
    info!("Platform: {}", std::env::consts::OS);
    info!("Requested backend: {:?}", kind);

    let mut backend = match open_backend(kind) {
        Ok(b) => {
            info!("✅ {} backend initialized successfully", b.name());
            b
        }
        Err(e) => {
            info!("❌ Failed to open backend: {}", e);
            info!("This may indicate missing system libraries or permissions issues.");
            return;
        }
    };

    info!("⏳ Scanning for controllers ({} seconds)...", SCAN_DURATION.as_secs());
    info!("   (Bluetooth controllers may take a moment to wake up)");

    let mut last: [Option<GamepadReport>; MAX_CONTROLLERS] = [None; MAX_CONTROLLERS];
    let start = Instant::now();
    while start.elapsed() < SCAN_DURATION {
        backend.begin_tick();
        for (index, slot) in last.iter_mut().enumerate() {
            let report = backend.query(index).ok();
            match (slot.is_some(), report.is_some()) {
                (false, true) => info!("   📶 Controller {} detected", index),
                (true, false) => info!("   📵 Controller {} lost", index),
                _ => {}
            }
            *slot = report;
        }
        thread::sleep(Duration::from_millis(100));
    }

    info!("");
    info!("📋 Scan complete.");
    info!("");

    let connected: Vec<_> = last
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.map(|r| (i, r)))
        .collect();

    if connected.is_empty() {
        info!("⚠️  No controllers detected");
        info!("   Please check:");
        info!("   - Controller is connected (USB or Bluetooth paired)");
        info!("   - Drivers are installed");
        info!("   - Another backend sees it (--diagnostics with input.backend: gilrs)");
        return;
    }

    info!("✅ Found {} controller(s):", connected.len());
    info!("");

    for (index, report) in connected {
        info!("📋 Slot {}", index);
        if let Some(description) = backend.describe(index) {
            info!("   Device: {}", description);
        }
        info!("   Packet: {}", report.packet_number);
        for line in describe_report(&report) {
            info!("   {}", line);
        }
        info!("");
        info!("   ─────────────────────────────────");
        info!("");
    }

    info!("=== End Diagnostics ===");
    info!("");
    info!("💡 Tips:");
    info!("   - Only the lowest connected slot drives actions and the pointer");
    info!("   - Button names shown here are the names to use in `mappings`");
    info!("");
}

/// Human-readable lines for one report
fn describe_report(report: &GamepadReport) -> Vec<String> {
    let pressed: Vec<&str> = Button::pressed_in(report.buttons).map(Button::name).collect();
    vec![
        if pressed.is_empty() {
            "🎮 Buttons: (none pressed)".to_string()
        } else {
            format!("🎮 Buttons: {}", pressed.join(", "))
        },
        format!("🔫 Triggers: L={} R={}", report.left_trigger, report.right_trigger),
        format!("🕹️  Left stick: ({}, {})", report.thumb_lx, report.thumb_ly),
        format!("🕹️  Right stick: ({}, {})", report.thumb_rx, report.thumb_ry),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_report() {
        let report = GamepadReport {
            buttons: Button::A.mask() | Button::LeftShoulder.mask(),
            left_trigger: 10,
            thumb_ry: -5,
            ..Default::default()
        };
        let lines = describe_report(&report);
        assert_eq!(lines[0], "🎮 Buttons: left_shoulder, a");
        assert_eq!(lines[1], "🔫 Triggers: L=10 R=0");
        assert_eq!(lines[3], "🕹️  Right stick: (0, -5)");

        let idle = describe_report(&GamepadReport::default());
        assert_eq!(idle[0], "🎮 Buttons: (none pressed)");
    }
}
