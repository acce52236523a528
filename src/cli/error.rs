//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Http { .. } => crate::exitcode::SOFTWARE,
                InfraError::Application(e) => match e {
                    ApplicationError::Domain(_)
                    | ApplicationError::Decode { .. }
                    | ApplicationError::IndexDrift { .. } => crate::exitcode::DATAERR,
                    ApplicationError::Transport(_) => crate::exitcode::UNAVAILABLE,
                    ApplicationError::OperationFailed { .. } => crate::exitcode::IOERR,
                    ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                    ApplicationError::Encode(_) | ApplicationError::Unsupported(_) => {
                        crate::exitcode::SOFTWARE
                    }
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn given_domain_error_when_mapping_exit_code_then_dataerr() {
        let err = CliError::from(ApplicationError::Domain(DomainError::RepositoryNotFound(
            "osbooks-physics".into(),
        )));
        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
        assert_eq!(
            err.to_string(),
            "repository not found in the ABL: osbooks-physics"
        );
    }

    #[test]
    fn given_invalid_args_when_mapping_exit_code_then_usage() {
        let err = CliError::InvalidArgs("bad".into());
        assert_eq!(err.exit_code(), crate::exitcode::USAGE);
    }

    #[test]
    fn given_unsupported_when_mapping_exit_code_then_software() {
        let err = CliError::from(ApplicationError::Unsupported("push".into()));
        assert_eq!(err.exit_code(), crate::exitcode::SOFTWARE);
    }
}
