use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    /// Trigger configuration; the bundled fixture when absent.
    pub commands: Option<PathBuf>,
    /// Directory of case files; the bundled fixtures when absent.
    pub cases_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--commands" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    options.commands = Some(PathBuf::from(value));
                }
                "--cases" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    options.cases_dir = Some(PathBuf::from(value));
                }
                unknown => return Err(CliError::UnknownArgument(unknown.to_string())),
            }
        }

        Ok(options)
    }
}
