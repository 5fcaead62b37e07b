use std::path::Path;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Shutdown { delay_seconds: u32 },
    Restart { delay_seconds: u32 },
    CancelPending,
    Lock,
}

#[derive(Debug, Error)]
pub enum DesktopActionError {
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("{program} exited with status {status}")]
    ExitStatus { program: String, status: String },
    #[error("failed to open {target}: {reason}")]
    Open { target: String, reason: String },
    #[error("not supported on this platform: {0}")]
    Unsupported(String),
}

/// Operating-system effects the assistant can request.
///
/// Implementations report failures through [`DesktopActionError`]; turning
/// them into spoken replies is the caller's job.
pub trait DesktopActions: Send + Sync {
    fn launch_program(&self, program: &str) -> Result<(), DesktopActionError>;

    fn open_url(&self, url: &str) -> Result<(), DesktopActionError>;

    fn open_path(&self, path: &Path) -> Result<(), DesktopActionError>;

    fn terminate_process(&self, image_name: &str) -> Result<(), DesktopActionError>;

    fn power(&self, action: PowerAction) -> Result<(), DesktopActionError>;

    fn capture_screen(&self, destination: &Path) -> Result<(), DesktopActionError>;
}
