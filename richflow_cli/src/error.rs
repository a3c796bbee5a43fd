//! CLI error types and exit codes

use thiserror::Error;

/// Errors raised by the CLI itself, as opposed to the core library
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Unknown output format: {0}")]
    UnknownFormat(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Key '{0}' not found")]
    UnknownKey(String),

    #[error("Invalid key path: {0}")]
    InvalidKeyPath(String),
}

impl CliError {
    pub fn invalid_value(key: &str, reason: &str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    FilesystemError = 4,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Map an error chain to the exit code of its first recognised cause
pub fn exit_code(error: &anyhow::Error) -> ExitCode {
    for cause in error.chain() {
        if cause.downcast_ref::<CliError>().is_some() {
            return ExitCode::Misuse;
        }
        if let Some(core) = cause.downcast_ref::<richflow_core::Error>() {
            return if core.is_configuration() {
                ExitCode::Misuse
            } else {
                ExitCode::FilesystemError
            };
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return ExitCode::FilesystemError;
        }
    }
    ExitCode::GeneralError
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_codes() {
        let misuse = anyhow::Error::from(CliError::UnknownFormat("xml".into()));
        assert_eq!(exit_code(&misuse), ExitCode::Misuse);

        let missing: anyhow::Result<()> =
            Err(std::io::Error::from(std::io::ErrorKind::NotFound)).context("Failed to open input");
        assert_eq!(exit_code(&missing.unwrap_err()), ExitCode::FilesystemError);

        assert_eq!(exit_code(&anyhow::anyhow!("boom")), ExitCode::GeneralError);
        assert_eq!(ExitCode::Misuse.code(), 2);
    }
}
