use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};

use assistant_core::desktop::{DesktopActionError, DesktopActions, PowerAction};
use assistant_core::telemetry::LogContext;
use tracing::{debug, info};

/// Desktop effects carried out with the platform's own tools.
pub struct SystemDesktop {
    log: LogContext,
}

impl SystemDesktop {
    pub fn new(log: LogContext) -> Self {
        Self { log }
    }

    fn open_target(&self, target: impl AsRef<OsStr>) -> Result<(), DesktopActionError> {
        let target = target.as_ref();
        debug!(parent: self.log.span(), target = %target.to_string_lossy(), "opening");
        open::that_detached(target).map_err(|err| DesktopActionError::Open {
            target: target.to_string_lossy().into_owned(),
            reason: err.to_string(),
        })
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<(), DesktopActionError> {
        info!(parent: self.log.span(), program, ?args, "running system tool");
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .map_err(|err| DesktopActionError::Spawn {
                program: program.to_string(),
                reason: err.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(DesktopActionError::ExitStatus {
                program: program.to_string(),
                status: status.to_string(),
            })
        }
    }
}

impl DesktopActions for SystemDesktop {
    fn launch_program(&self, program: &str) -> Result<(), DesktopActionError> {
        // URI-style targets such as `ms-settings:` go through the shell handler.
        if program.ends_with(':') {
            return self.open_target(program);
        }

        info!(parent: self.log.span(), program, "launching program");
        Command::new(program)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|err| DesktopActionError::Spawn {
                program: program.to_string(),
                reason: err.to_string(),
            })
    }

    fn open_url(&self, url: &str) -> Result<(), DesktopActionError> {
        self.open_target(url)
    }

    fn open_path(&self, path: &Path) -> Result<(), DesktopActionError> {
        self.open_target(path)
    }

    fn terminate_process(&self, image_name: &str) -> Result<(), DesktopActionError> {
        if cfg!(windows) {
            self.run("taskkill", &["/f", "/im", image_name])
        } else {
            let name = image_name.strip_suffix(".exe").unwrap_or(image_name);
            self.run("pkill", &["-x", name])
        }
    }

    fn power(&self, action: PowerAction) -> Result<(), DesktopActionError> {
        power_command(action).and_then(|(program, args)| {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            self.run(program, &args)
        })
    }

    fn capture_screen(&self, destination: &Path) -> Result<(), DesktopActionError> {
        let destination = destination.to_string_lossy();
        if cfg!(target_os = "macos") {
            self.run("screencapture", &["-x", &destination])
        } else if cfg!(target_os = "linux") {
            self.run("gnome-screenshot", &["-f", &destination])
        } else {
            Err(DesktopActionError::Unsupported("screen capture".to_string()))
        }
    }
}

fn power_command(action: PowerAction) -> Result<(&'static str, Vec<String>), DesktopActionError> {
    if cfg!(windows) {
        let args = match action {
            PowerAction::Shutdown { delay_seconds } => vec![
                "/s".to_string(),
                "/t".to_string(),
                delay_seconds.to_string(),
                "/c".to_string(),
                "Выключение компьютера по команде пользователя".to_string(),
            ],
            PowerAction::Restart { delay_seconds } => vec![
                "/r".to_string(),
                "/t".to_string(),
                delay_seconds.to_string(),
                "/c".to_string(),
                "Перезагрузка компьютера по команде пользователя".to_string(),
            ],
            PowerAction::CancelPending => vec!["/a".to_string()],
            PowerAction::Lock => {
                return Ok(("rundll32.exe", vec!["user32.dll,LockWorkStation".to_string()]));
            }
        };
        return Ok(("shutdown", args));
    }

    match action {
        PowerAction::Shutdown { delay_seconds } => {
            Ok(("shutdown", vec!["-h".to_string(), delay_minutes(delay_seconds)]))
        }
        PowerAction::Restart { delay_seconds } => {
            Ok(("shutdown", vec!["-r".to_string(), delay_minutes(delay_seconds)]))
        }
        PowerAction::CancelPending if cfg!(target_os = "linux") => {
            Ok(("shutdown", vec!["-c".to_string()]))
        }
        PowerAction::Lock if cfg!(target_os = "linux") => {
            Ok(("loginctl", vec!["lock-session".to_string()]))
        }
        PowerAction::Lock if cfg!(target_os = "macos") => {
            Ok(("pmset", vec!["displaysleepnow".to_string()]))
        }
        other => Err(DesktopActionError::Unsupported(format!("{other:?}"))),
    }
}

/// `shutdown` on Unix schedules in whole minutes.
fn delay_minutes(delay_seconds: u32) -> String {
    format!("+{}", delay_seconds.div_ceil(60))
}
