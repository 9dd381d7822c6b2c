use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Coarse status class attached to every error, mirroring HTTP semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    BadRequest,
    InternalServerError,
    NotImplemented,
}

impl StatusClass {
    /// Numeric HTTP status equivalent
    pub fn as_u16(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::InternalServerError => 500,
            Self::NotImplemented => 501,
        }
    }
}

/// Machine readable error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidEmail,
    InvalidPassword,
    UserAlreadyExists,
    NotFound,
    NothingChanged,
    DatabaseError,
    NotImplemented,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidRequest => "InvalidRequest",
            Self::InvalidEmail => "InvalidEmail",
            Self::InvalidPassword => "InvalidPassword",
            Self::UserAlreadyExists => "UserAlreadyExists",
            Self::NotFound => "NotFound",
            Self::NothingChanged => "NothingChanged",
            Self::DatabaseError => "DatabaseError",
            Self::NotImplemented => "NotImplemented",
        };
        f.write_str(name)
    }
}

/// Core domain errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{message}")]
    InvalidRequest { message: String },

    #[error("{message}")]
    InvalidEmail { message: String },

    #[error("{message}")]
    InvalidPassword { message: String },

    #[error("{message}")]
    UserAlreadyExists { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    NothingChanged { message: String },

    #[error("{message}")]
    Database { message: String },

    #[error("{message}")]
    NotImplemented { message: String },
}

impl DomainError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn invalid_email(message: impl Into<String>) -> Self {
        Self::InvalidEmail {
            message: message.into(),
        }
    }

    pub fn invalid_password(message: impl Into<String>) -> Self {
        Self::InvalidPassword {
            message: message.into(),
        }
    }

    pub fn user_already_exists(message: impl Into<String>) -> Self {
        Self::UserAlreadyExists {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn nothing_changed(message: impl Into<String>) -> Self {
        Self::NothingChanged {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn not_implemented(operation: &str) -> Self {
        Self::NotImplemented {
            message: format!("{} is not implemented yet.", operation),
        }
    }

    /// Error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            Self::InvalidEmail { .. } => ErrorCode::InvalidEmail,
            Self::InvalidPassword { .. } => ErrorCode::InvalidPassword,
            Self::UserAlreadyExists { .. } => ErrorCode::UserAlreadyExists,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::NothingChanged { .. } => ErrorCode::NothingChanged,
            Self::Database { .. } => ErrorCode::DatabaseError,
            Self::NotImplemented { .. } => ErrorCode::NotImplemented,
        }
    }

    /// Status class for this error
    pub fn status(&self) -> StatusClass {
        match self {
            Self::Database { .. } => StatusClass::InternalServerError,
            Self::NotImplemented { .. } => StatusClass::NotImplemented,
            _ => StatusClass::BadRequest,
        }
    }

    /// Human readable message
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidRequest { message }
            | Self::InvalidEmail { message }
            | Self::InvalidPassword { message }
            | Self::UserAlreadyExists { message }
            | Self::NotFound { message }
            | Self::NothingChanged { message }
            | Self::Database { message }
            | Self::NotImplemented { message } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("User with id 42 does not exist.");
        assert_eq!(error.to_string(), "User with id 42 does not exist.");
        assert_eq!(error.code(), ErrorCode::NotFound);
        assert_eq!(error.status(), StatusClass::BadRequest);
    }

    #[test]
    fn test_database_error_is_server_side() {
        let error = DomainError::database("User could not be added.");
        assert_eq!(error.code(), ErrorCode::DatabaseError);
        assert_eq!(error.status(), StatusClass::InternalServerError);
        assert_eq!(error.status().as_u16(), 500);
    }

    #[test]
    fn test_not_implemented_error() {
        let error = DomainError::not_implemented("login");
        assert_eq!(error.message(), "login is not implemented yet.");
        assert_eq!(error.status(), StatusClass::NotImplemented);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::UserAlreadyExists.to_string(), "UserAlreadyExists");
        assert_eq!(ErrorCode::NothingChanged.to_string(), "NothingChanged");
    }
}
