use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::desktop::{DesktopActionError, DesktopActions, PowerAction};
use crate::telemetry::LogContext;

/// Grace period before a scheduled shutdown or restart takes effect.
pub const POWER_ACTION_DELAY_SECONDS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAction {
    Shutdown,
    CancelShutdown,
    Restart,
    TakeScreenshot,
    LockComputer,
}

/// Power, lock and screenshot commands with their spoken confirmations.
#[derive(Debug, Clone)]
pub struct SystemCommands {
    media_dir: PathBuf,
    log: LogContext,
}

impl SystemCommands {
    pub fn new(media_dir: impl Into<PathBuf>, log: LogContext) -> Self {
        Self {
            media_dir: media_dir.into(),
            log,
        }
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    pub fn execute(&self, action: SystemAction, desktop: &dyn DesktopActions) -> String {
        match action {
            SystemAction::Shutdown => self.shutdown(desktop),
            SystemAction::CancelShutdown => self.cancel_shutdown(desktop),
            SystemAction::Restart => self.restart(desktop),
            SystemAction::TakeScreenshot => self.take_screenshot(desktop, Utc::now()),
            SystemAction::LockComputer => self.lock_computer(desktop),
        }
    }

    pub fn shutdown(&self, desktop: &dyn DesktopActions) -> String {
        info!(parent: self.log.span(), "scheduling shutdown");
        match desktop.power(PowerAction::Shutdown {
            delay_seconds: POWER_ACTION_DELAY_SECONDS,
        }) {
            Ok(()) => format!(
                "Компьютер будет выключен через {POWER_ACTION_DELAY_SECONDS} секунд. Скажите 'отмени выключение', чтобы отменить."
            ),
            Err(err) => self.failure("shutdown", &err, "Не удалось выключить компьютер"),
        }
    }

    pub fn cancel_shutdown(&self, desktop: &dyn DesktopActions) -> String {
        info!(parent: self.log.span(), "cancelling pending shutdown");
        match desktop.power(PowerAction::CancelPending) {
            Ok(()) => "Выключение отменено".to_string(),
            Err(err) => self.failure("cancel_shutdown", &err, "Не удалось отменить выключение"),
        }
    }

    pub fn restart(&self, desktop: &dyn DesktopActions) -> String {
        info!(parent: self.log.span(), "scheduling restart");
        match desktop.power(PowerAction::Restart {
            delay_seconds: POWER_ACTION_DELAY_SECONDS,
        }) {
            Ok(()) => format!(
                "Компьютер будет перезагружен через {POWER_ACTION_DELAY_SECONDS} секунд. Скажите 'отмени перезагрузку', чтобы отменить."
            ),
            Err(err) => self.failure("restart", &err, "Не удалось перезагрузить компьютер"),
        }
    }

    /// Saves `screenshot_<unix seconds>.png` into the media directory.
    pub fn take_screenshot(&self, desktop: &dyn DesktopActions, now: DateTime<Utc>) -> String {
        let destination = self.screenshot_path(now);
        info!(parent: self.log.span(), path = %destination.display(), "taking screenshot");

        if let Err(err) = fs::create_dir_all(&self.media_dir) {
            error!(parent: self.log.span(), error = %err, "failed to create media directory");
            return format!("Не удалось сделать скриншот: {err}");
        }

        match desktop.capture_screen(&destination) {
            Ok(()) => format!("Скриншот сохранен: {}", destination.display()),
            Err(err) => self.failure("take_screenshot", &err, "Не удалось сделать скриншот"),
        }
    }

    pub fn lock_computer(&self, desktop: &dyn DesktopActions) -> String {
        info!(parent: self.log.span(), "locking session");
        match desktop.power(PowerAction::Lock) {
            Ok(()) => "Компьютер заблокирован".to_string(),
            Err(err) => self.failure("lock_computer", &err, "Не удалось заблокировать компьютер"),
        }
    }

    pub fn screenshot_path(&self, now: DateTime<Utc>) -> PathBuf {
        self.media_dir
            .join(format!("screenshot_{}.png", now.timestamp()))
    }

    fn failure(&self, action: &'static str, err: &DesktopActionError, prefix: &str) -> String {
        error!(parent: self.log.span(), action, error = %err, "system command failed");
        format!("{prefix}: {err}")
    }
}
