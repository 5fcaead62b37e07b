use std::sync::Arc;

use assistant_core::assistant::Assistant;
use assistant_core::config::{AssistantSettings, ConfigError, JarvisPaths, load_dotenv};
use assistant_core::config_env::ProcessEnv;
use assistant_core::telemetry::LogContext;
use tokio::signal;
use tracing::{error, info, warn};

mod console;
mod desktop;

use console::{ConsoleInput, ConsoleOutput};
use desktop::SystemDesktop;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "jarvis=info,assistant_core=info".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = load_dotenv() {
        warn!("failed to load .env: {err}");
    }

    let paths = match JarvisPaths::from_env(&ProcessEnv) {
        Ok(paths) => paths,
        Err(err) => {
            error!("failed to resolve assistant home: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = paths.ensure_data_dirs() {
        error!("failed to prepare data directories: {err}");
        std::process::exit(1);
    }

    let settings = match load_settings(&paths) {
        Ok(settings) => settings,
        Err(err) => {
            error!("invalid settings: {err}");
            std::process::exit(1);
        }
    };

    let log = LogContext::session(&format!("pid-{}", std::process::id()));
    let desktop = Arc::new(SystemDesktop::new(log.component("desktop")));
    let mut assistant = match Assistant::new(settings, paths, desktop, log.clone()) {
        Ok(assistant) => assistant,
        Err(err) => {
            error!("failed to start assistant: {err}");
            std::process::exit(1);
        }
    };

    let mut input = ConsoleInput::new(log.component("speech_input"));
    let mut output = ConsoleOutput::new(log.component("speech_output"));

    info!("jarvis starting");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        _ = assistant.run(&mut input, &mut output) => {}
    }
    info!("jarvis stopped");
}

/// Malformed settings are reported and replaced by defaults for this run;
/// the file itself is left alone.
fn load_settings(paths: &JarvisPaths) -> Result<AssistantSettings, ConfigError> {
    let mut settings = match AssistantSettings::load_or_init(&paths.settings_file) {
        Ok(settings) => settings,
        Err(err @ ConfigError::ParseJson { .. }) => {
            error!("settings file ignored: {err}");
            AssistantSettings::default()
        }
        Err(err) => return Err(err),
    };

    settings.apply_env_overrides(&ProcessEnv)?;
    Ok(settings)
}
