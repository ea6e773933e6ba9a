//! Error taxonomy for configuration resolution and provisioning.

use serde::Serialize;
use std::path::PathBuf;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Document errors
    DocumentLoad,
    NestedBase,

    // Resolution errors
    UnknownEnumValue,
    DirectiveApplication,

    // Lookup errors
    TaskNotFound,
    MissingSetting,

    // Remote errors
    CommandFailed,
    TransferFailed,
    VerificationFailed,
}

/// Errors raised while resolving configuration or driving a host.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Source document missing, unreadable, unparseable, or not a mapping.
    #[error("failed to load document {path}: {reason}")]
    DocumentLoad { path: PathBuf, reason: String },

    /// A base document declared its own `base`.
    #[error("base document {path} declares its own base '{base}'; only one level is allowed")]
    NestedBase { path: PathBuf, base: String },

    #[error("unknown {kind} '{value}'")]
    UnknownEnumValue { kind: &'static str, value: String },

    #[error("cannot apply override at '{path}': {reason}")]
    DirectiveApplication { path: String, reason: String },

    #[error("no configuration for task '{0}'")]
    TaskNotFound(String),

    /// A required setting is absent or has the wrong type.
    #[error("task '{task}' setting '{key}': {reason}")]
    MissingSetting {
        task: String,
        key: String,
        reason: String,
    },

    #[error("command failed on {host} (exit {exit_code}): {command}: {stderr}")]
    CommandFailed {
        host: String,
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// A package signature or installed certificate did not check out.
    #[error("verification of {target} failed on {host}")]
    VerificationFailed { host: String, target: String },

    #[error("upload to {host}:{path} failed: {reason}")]
    Transfer {
        host: String,
        path: String,
        reason: String,
    },
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::DocumentLoad { .. } => ErrorCode::DocumentLoad,
            Error::NestedBase { .. } => ErrorCode::NestedBase,
            Error::UnknownEnumValue { .. } => ErrorCode::UnknownEnumValue,
            Error::DirectiveApplication { .. } => ErrorCode::DirectiveApplication,
            Error::TaskNotFound(_) => ErrorCode::TaskNotFound,
            Error::MissingSetting { .. } => ErrorCode::MissingSetting,
            Error::CommandFailed { .. } => ErrorCode::CommandFailed,
            Error::Transfer { .. } => ErrorCode::TransferFailed,
            Error::VerificationFailed { .. } => ErrorCode::VerificationFailed,
        }
    }

    // Convenience constructors

    pub fn document_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::DocumentLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn directive(path: &str, reason: impl Into<String>) -> Self {
        Error::DirectiveApplication {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing_setting(task: &str, key: &str, reason: impl Into<String>) -> Self {
        Error::MissingSetting {
            task: task.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that can only come from configuration, never from a host.
    pub fn is_config_error(&self) -> bool {
        !matches!(
            self,
            Error::CommandFailed { .. } | Error::Transfer { .. } | Error::VerificationFailed { .. }
        )
    }
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::DirectiveApplication).unwrap();
        assert_eq!(json, "\"DIRECTIVE_APPLICATION\"");
    }

    #[test]
    fn test_error_code_mapping() {
        let err = Error::TaskNotFound("install-docker".into());
        assert_eq!(err.code(), ErrorCode::TaskNotFound);
        assert!(err.is_config_error());
        assert_eq!(err.to_string(), "no configuration for task 'install-docker'");

        let err = Error::CommandFailed {
            host: "h1".into(),
            command: "false".into(),
            exit_code: 1,
            stderr: String::new(),
        };
        assert!(!err.is_config_error());
    }
}
