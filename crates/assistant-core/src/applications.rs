use std::path::Path;

use indexmap::IndexMap;
use tracing::{error, info};

use crate::desktop::{DesktopActionError, DesktopActions};
use crate::telemetry::LogContext;

const BUILTIN_PROGRAMS: [(&str, &str); 13] = [
    ("chrome", "chrome"),
    ("гугл", "chrome"),
    ("браузер", "chrome"),
    ("блокнот", "notepad"),
    ("калькулятор", "calc"),
    ("проводник", "explorer"),
    ("word", "winword"),
    ("excel", "excel"),
    ("музыка", "wmplayer"),
    ("медиаплеер", "wmplayer"),
    ("paint", "mspaint"),
    ("настройки", "ms-settings:"),
    ("диспетчер задач", "taskmgr"),
];

const BUILTIN_URLS: [(&str, &str); 9] = [
    ("youtube", "https://www.youtube.com"),
    ("ютуб", "https://www.youtube.com"),
    ("google", "https://www.google.com"),
    ("гугл", "https://www.google.com"),
    ("почта", "https://mail.google.com"),
    ("gmail", "https://mail.google.com"),
    ("новости", "https://news.google.com"),
    ("погода", "https://www.gismeteo.ru"),
    ("карты", "https://maps.google.com"),
];

const BUILTIN_PROCESSES: [(&str, &str); 6] = [
    ("chrome", "chrome.exe"),
    ("браузер", "chrome.exe"),
    ("блокнот", "notepad.exe"),
    ("калькулятор", "calc.exe"),
    ("word", "winword.exe"),
    ("excel", "excel.exe"),
];

/// Opens programs, bookmarked sites and files by spoken name, and closes
/// known programs.
///
/// Names are looked up in order: program table, URL table, then an existing
/// filesystem path.
#[derive(Debug, Clone)]
pub struct ApplicationManager {
    programs: IndexMap<String, String>,
    urls: IndexMap<String, String>,
    processes: IndexMap<String, String>,
    log: LogContext,
}

impl ApplicationManager {
    pub fn new(log: LogContext) -> Self {
        let manager = Self {
            programs: to_table(&BUILTIN_PROGRAMS),
            urls: to_table(&BUILTIN_URLS),
            processes: to_table(&BUILTIN_PROCESSES),
            log,
        };
        info!(
            parent: manager.log.span(),
            programs = manager.programs.len(),
            urls = manager.urls.len(),
            "application manager ready"
        );
        manager
    }

    pub fn with_program(mut self, name: &str, command: impl Into<String>) -> Self {
        self.programs.insert(name.to_lowercase(), command.into());
        self
    }

    pub fn with_url(mut self, name: &str, url: impl Into<String>) -> Self {
        self.urls.insert(name.to_lowercase(), url.into());
        self
    }

    pub fn with_process(mut self, name: &str, image_name: impl Into<String>) -> Self {
        self.processes.insert(name.to_lowercase(), image_name.into());
        self
    }

    pub fn open_application(&self, name: &str, desktop: &dyn DesktopActions) -> String {
        let name = name.to_lowercase();
        info!(parent: self.log.span(), name = %name, "opening application");

        let outcome = if let Some(command) = self.programs.get(&name) {
            desktop.launch_program(command)
        } else if let Some(url) = self.urls.get(&name) {
            desktop.open_url(url)
        } else if !name.is_empty() && Path::new(&name).exists() {
            desktop.open_path(Path::new(&name))
        } else {
            return format!("Не знаю, как открыть {name}");
        };

        match outcome {
            Ok(()) => format!("Открываю {name}"),
            Err(err) => {
                self.log_failure("open", &name, &err);
                format!("Не удалось открыть {name}: {err}")
            }
        }
    }

    pub fn close_application(&self, name: &str, desktop: &dyn DesktopActions) -> String {
        let name = name.to_lowercase();
        let Some(image_name) = self.processes.get(&name) else {
            return format!("Не знаю, как закрыть {name}");
        };

        info!(parent: self.log.span(), name = %name, image_name = %image_name, "closing application");
        match desktop.terminate_process(image_name) {
            Ok(()) => format!("Закрываю {name}"),
            Err(err) => {
                self.log_failure("close", &name, &err);
                format!("Не удалось закрыть {name}: {err}")
            }
        }
    }

    fn log_failure(&self, operation: &'static str, name: &str, err: &DesktopActionError) {
        error!(parent: self.log.span(), operation, name, error = %err, "application action failed");
    }
}

fn to_table(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(name, target)| ((*name).to_string(), (*target).to_string()))
        .collect()
}
