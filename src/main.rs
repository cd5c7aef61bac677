//! padpilot - drive the desktop from a game controller

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use padpilot::actions::{ActionExecutor, ConsoleActions, DesktopActions};
use padpilot::config::{AppConfig, ConfigWatcher};
use padpilot::emulation::platform_sink;
use padpilot::input::gamepad::{print_controller_diagnostics, InputEngine};
use padpilot::mode::{ModeControl, SharedMode};
use padpilot::paths::AppPaths;

/// padpilot - Control the desktop with a game controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to the detected app location)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log actions and emulated input instead of performing them
    #[arg(long)]
    dry_run: bool,

    /// Scan for controllers, print what the backend sees, and exit
    #[arg(long)]
    diagnostics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting padpilot v{}...", env!("CARGO_PKG_VERSION"));

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let paths = AppPaths::detect();
            info!(
                "Using {} config directory: {}",
                if paths.is_portable { "portable" } else { "installed" },
                paths.base_dir().display()
            );
            paths.ensure_directories()?;
            paths.config.to_string_lossy().to_string()
        }
    };
    info!("Configuration file: {}", config_path);

    if !std::path::Path::new(&config_path).exists() {
        info!("No config found, writing defaults to {}", config_path);
        AppConfig::default().save(&config_path).await?;
    }

    if args.diagnostics {
        let config = AppConfig::load(&config_path).await?;
        tokio::task::spawn_blocking(move || print_controller_diagnostics(config.input.backend))
            .await
            .context("Diagnostics task failed")?;
        return Ok(());
    }

    // Load configuration with hot-reload watcher
    let (config_watcher, initial_config) = ConfigWatcher::new(config_path.clone()).await?;
    info!("Configuration loaded successfully with hot-reload enabled");

    if args.dry_run {
        info!("🧪 Dry run: actions and emulated input are only logged");
    }

    let mode = Arc::new(SharedMode::new());
    run_app((*initial_config).clone(), config_watcher, mode, args.dry_run).await?;

    info!("padpilot shutdown complete");
    Ok(())
}

/// Run the engine until Ctrl+C, restarting it on every config reload
async fn run_app(
    mut config: AppConfig,
    mut config_watcher: ConfigWatcher,
    mode: Arc<SharedMode>,
    dry_run: bool,
) -> Result<()> {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let engine = start_engine(&config, mode.clone(), dry_run).await?;
        info!("🎮 Mode: {}", mode.current_mode());

        tokio::select! {
            _ = &mut shutdown => {
                stop_engine(engine).await;
                return Ok(());
            }
            new_config = config_watcher.next_config() => {
                stop_engine(engine).await;
                match new_config {
                    Some(new_config) => {
                        info!("🔄 Restarting input engine with new configuration");
                        config = new_config;
                    }
                    None => {
                        warn!("Config watcher closed, exiting");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Build collaborators and start the engine on a blocking thread
async fn start_engine(
    config: &AppConfig,
    mode: Arc<SharedMode>,
    dry_run: bool,
) -> Result<Option<InputEngine>> {
    if !config.input.enabled {
        warn!("⚠️  Controller input disabled in config (input.enabled: false)");
        return Ok(None);
    }

    let sink = platform_sink(
        dry_run,
        (config.pointer.screen_width, config.pointer.screen_height),
    );
    let mode: Arc<dyn ModeControl> = mode;
    let executor: Box<dyn ActionExecutor> = if dry_run {
        Box::new(ConsoleActions::new("dry-run").with_mode(mode.clone()))
    } else {
        Box::new(DesktopActions::new(config.actions.clone(), sink.clone(), mode.clone()))
    };

    let builder = InputEngine::builder(config.engine_settings())
        .mode(mode)
        .executor(executor)
        .sink(sink);

    let engine = tokio::task::spawn_blocking(move || builder.start())
        .await
        .context("Engine start task failed")?
        .context("Failed to start input engine")?;

    Ok(Some(engine))
}

async fn stop_engine(engine: Option<InputEngine>) {
    let Some(mut engine) = engine else {
        return;
    };
    match tokio::task::spawn_blocking(move || engine.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Input engine did not stop cleanly: {}", e),
        Err(e) => warn!("Engine shutdown task failed: {}", e),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C ({}), running until killed", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
