//! CLI error type and its mapping onto exit codes.

use registrar_core::{ConfigError, DbError, LoggingError, RepoError, ServiceError};
use std::fmt;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Logging(LoggingError),
    Db(DbError),
    Repo(RepoError),
    Service(ServiceError),
    /// Malformed `--json` argument.
    InvalidJson(serde_json::Error),
    Output(serde_json::Error),
    Io(std::io::Error),
}

impl CliError {
    /// Stable error code shared with the core service layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Service(err) => err.error_code(),
            Self::InvalidJson(_) => "validation",
            Self::Config(_) => "config",
            Self::Logging(_) | Self::Db(_) | Self::Repo(_) | Self::Output(_) | Self::Io(_) => {
                "internal"
            }
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Service(err) => err.status_code(),
            Self::InvalidJson(_) | Self::Config(_) => 400,
            _ => 500,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.error_code() {
            "validation" | "config" => 2,
            "not_found" => 3,
            "conflict" => 4,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Logging(err) => write!(f, "logging error: {err}"),
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Repo(err) => write!(f, "repository error: {err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::InvalidJson(err) => write!(f, "invalid JSON input: {err}"),
            Self::Output(err) => write!(f, "failed to encode output: {err}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Service(err) => Some(err),
            Self::InvalidJson(err) | Self::Output(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<LoggingError> for CliError {
    fn from(err: LoggingError) -> Self {
        Self::Logging(err)
    }
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        Self::Db(err)
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        Self::Repo(err)
    }
}

impl From<ServiceError> for CliError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::CliError;
    use registrar_core::{EntityKind, ServiceError};

    #[test]
    fn exit_codes_follow_error_kind() {
        let not_found = CliError::from(ServiceError::NotFound {
            entity: EntityKind::Course,
            id: uuid::Uuid::nil(),
        });
        assert_eq!(not_found.exit_code(), 3);
        assert_eq!(not_found.status(), 404);

        let conflict = CliError::from(ServiceError::Conflict("taken".to_string()));
        assert_eq!(conflict.exit_code(), 4);

        let bad_json = CliError::InvalidJson(serde_json::from_str::<u8>("{").unwrap_err());
        assert_eq!(bad_json.error_code(), "validation");
        assert_eq!(bad_json.exit_code(), 2);
    }
}
