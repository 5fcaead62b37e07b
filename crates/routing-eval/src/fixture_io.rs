use std::fs;
use std::path::{Path, PathBuf};

use assistant_core::commands::{CommandTableError, CommandTriggerTable};
use thiserror::Error;

use crate::case::RoutingCaseFixture;

#[derive(Debug, Error)]
pub enum FixtureIoError {
    #[error("failed to read fixtures directory {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read fixture file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("fixture file {path} is not valid JSON: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Commands(#[from] CommandTableError),
}

pub fn load_cases(cases_dir: Option<&Path>) -> Result<Vec<RoutingCaseFixture>, FixtureIoError> {
    let cases_dir = cases_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fixture_root().join("cases"));
    let mut files = list_case_files(&cases_dir)?;
    files.sort();

    let mut cases = Vec::with_capacity(files.len());
    for file in files {
        let raw = fs::read_to_string(&file).map_err(|source| FixtureIoError::ReadFile {
            path: file.display().to_string(),
            source,
        })?;
        let case = serde_json::from_str::<RoutingCaseFixture>(&raw).map_err(|source| {
            FixtureIoError::ParseJson {
                path: file.display().to_string(),
                source,
            }
        })?;
        cases.push(case);
    }

    Ok(cases)
}

/// Missing or malformed configuration is an error here, unlike the
/// assistant's startup load.
pub fn load_commands(path: Option<&Path>) -> Result<CommandTriggerTable, FixtureIoError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fixture_root().join("commands.json"));
    Ok(CommandTriggerTable::read(&path)?)
}

fn list_case_files(cases_dir: &Path) -> Result<Vec<PathBuf>, FixtureIoError> {
    let entries = fs::read_dir(cases_dir).map_err(|source| FixtureIoError::ReadDir {
        path: cases_dir.display().to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| FixtureIoError::ReadDir {
            path: cases_dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }

    Ok(files)
}

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}
