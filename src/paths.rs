//! Application path management for portable and installed modes.
//!
//! ## Mode Detection
//!
//! - **Portable mode**: If a `.portable` marker file exists next to the
//!   executable, `config.yaml` is read from the same directory.
//! - **Installed mode** (default): `config.yaml` lives in the per-user data
//!   directory (`%APPDATA%\padpilot`, `~/.local/share/padpilot`, ...).

use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "padpilot";

const CONFIG_FILE: &str = "config.yaml";

/// Application paths
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Whether running in portable mode (config next to exe)
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect the appropriate paths based on environment.
    ///
    /// **Debug mode**: If `config.yaml` exists in the current working directory
    /// (typical when running with `cargo run`), use it.
    ///
    /// Note: This is called before logging is initialized, so we use eprintln
    /// for early diagnostic output.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        #[cfg(debug_assertions)]
        {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            let cwd_config = cwd.join(CONFIG_FILE);
            if cwd_config.exists() {
                eprintln!(
                    "[paths] Running in DEV mode (config.yaml found in cwd: {})",
                    cwd.display()
                );
                return Self::portable(&cwd);
            }
        }

        Self::resolve(&exe_dir, dirs::data_dir())
    }

    /// Pick portable or installed layout
    ///
    /// # Arguments
    /// * `exe_dir` - Directory holding the executable
    /// * `data_dir` - Per-user data directory, if the platform has one
    pub fn resolve(exe_dir: &Path, data_dir: Option<PathBuf>) -> Self {
        if exe_dir.join(".portable").exists() {
            #[cfg(debug_assertions)]
            eprintln!("[paths] Running in PORTABLE mode (.portable marker found)");
            return Self::portable(exe_dir);
        }

        let app_data = data_dir
            .unwrap_or_else(|| {
                eprintln!("[paths] WARNING: no user data directory, falling back to exe dir");
                exe_dir.to_path_buf()
            })
            .join(APP_NAME);

        Self {
            config: app_data.join(CONFIG_FILE),
            is_portable: false,
        }
    }

    fn portable(dir: &Path) -> Self {
        Self {
            config: dir.join(CONFIG_FILE),
            is_portable: true,
        }
    }

    /// Get the base directory (for displaying in logs)
    pub fn base_dir(&self) -> PathBuf {
        self.config
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Ensure the config directory exists.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        let dir = self.base_dir();
        if !dir.exists() {
            debug!("Creating config directory: {}", dir.display());
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_portable_marker_keeps_config_next_to_exe() {
        let exe_dir = TempDir::new().unwrap();
        std::fs::write(exe_dir.path().join(".portable"), "").unwrap();

        let paths = AppPaths::resolve(exe_dir.path(), Some(PathBuf::from("/unused")));
        assert!(paths.is_portable);
        assert_eq!(paths.config, exe_dir.path().join("config.yaml"));
    }

    #[test]
    fn test_installed_mode_uses_data_dir() {
        let exe_dir = TempDir::new().unwrap();
        let data_dir = TempDir::new().unwrap();

        let paths = AppPaths::resolve(exe_dir.path(), Some(data_dir.path().to_path_buf()));
        assert!(!paths.is_portable);
        assert_eq!(paths.config, data_dir.path().join("padpilot").join("config.yaml"));

        paths.ensure_directories().unwrap();
        assert!(paths.base_dir().is_dir());
    }

    #[test]
    fn test_installed_mode_without_data_dir_falls_back_to_exe_dir() {
        let exe_dir = TempDir::new().unwrap();
        let paths = AppPaths::resolve(exe_dir.path(), None);
        assert_eq!(paths.config, exe_dir.path().join("padpilot").join("config.yaml"));
    }
}
