//! User validation rule engine
//!
//! Rules run in a fixed order and stop at the first failure.

use thiserror::Error;

use super::entity::User;
use crate::domain::{DomainError, ErrorCode};

pub const MINIMUM_CHARACTERS_FOR_EMAIL: usize = 5;
pub const MINIMUM_CHARACTERS_FOR_PASSWORD: usize = 16;

/// Characters accepted as the special character of a password
pub const PASSWORD_SPECIAL_CHARACTERS: [char; 10] =
    ['#', '*', '?', '¿', '¡', '!', '&', '^', '$', '%'];

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    #[error("User cannot be empty.")]
    EmptyUser,

    #[error("Email cannot be empty.")]
    EmptyEmail,

    #[error("Password cannot be empty.")]
    EmptyPassword,

    #[error("Username cannot be empty.")]
    EmptyUsername,

    #[error("Email must have at least {0} characters.")]
    EmailTooShort(usize),

    #[error("Email must have one @.")]
    EmailSeparator,

    #[error("Email must have at least one dot.")]
    EmailDot,

    #[error("Password must have at least {0} characters.")]
    PasswordTooShort(usize),

    #[error("Password must have at least one number.")]
    PasswordNumber,

    #[error("Password must have at least one lowercase and uppercase character.")]
    PasswordCase,

    #[error("Password must have at least one special character.")]
    PasswordSpecialCharacter,

    #[error("Devices must have distinct address and user agent.")]
    DuplicateDevice,
}

impl UserValidationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyUser | Self::EmptyUsername | Self::DuplicateDevice => {
                ErrorCode::InvalidRequest
            }
            Self::EmptyEmail | Self::EmailTooShort(_) | Self::EmailSeparator | Self::EmailDot => {
                ErrorCode::InvalidEmail
            }
            Self::EmptyPassword
            | Self::PasswordTooShort(_)
            | Self::PasswordNumber
            | Self::PasswordCase
            | Self::PasswordSpecialCharacter => ErrorCode::InvalidPassword,
        }
    }
}

impl From<UserValidationError> for DomainError {
    fn from(err: UserValidationError) -> Self {
        let message = err.to_string();
        match err.code() {
            ErrorCode::InvalidEmail => DomainError::invalid_email(message),
            ErrorCode::InvalidPassword => DomainError::invalid_password(message),
            _ => DomainError::invalid_request(message),
        }
    }
}

type Rule = fn(&User, bool) -> Result<(), UserValidationError>;

/// Rules applied to a present user, in evaluation order
const USER_RULES: [Rule; 6] = [
    email_present,
    password_present,
    username_present,
    email_format,
    password_format,
    devices_distinct,
];

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn email_present(user: &User, _: bool) -> Result<(), UserValidationError> {
    if is_blank(user.email.as_deref()) {
        return Err(UserValidationError::EmptyEmail);
    }
    Ok(())
}

fn password_present(user: &User, require_password: bool) -> Result<(), UserValidationError> {
    if require_password && is_blank(user.password.as_deref()) {
        return Err(UserValidationError::EmptyPassword);
    }
    Ok(())
}

fn username_present(user: &User, _: bool) -> Result<(), UserValidationError> {
    if is_blank(user.username.as_deref()) {
        return Err(UserValidationError::EmptyUsername);
    }
    Ok(())
}

fn email_format(user: &User, _: bool) -> Result<(), UserValidationError> {
    validate_email(user.email.as_deref().unwrap_or_default())
}

fn password_format(user: &User, require_password: bool) -> Result<(), UserValidationError> {
    if !require_password {
        return Ok(());
    }
    validate_password(user.password.as_deref().unwrap_or_default())
}

// At most one device per (address, user agent) identity
fn devices_distinct(user: &User, _: bool) -> Result<(), UserValidationError> {
    let duplicated = user.devices.iter().enumerate().any(|(index, device)| {
        user.devices[..index]
            .iter()
            .any(|earlier| earlier.same_identity(device))
    });

    if duplicated {
        return Err(UserValidationError::DuplicateDevice);
    }
    Ok(())
}

/// Validate a user
///
/// `require_password` is false on update paths, where the password is
/// optional and left unchecked; every other rule still applies.
pub fn validate_user(user: Option<&User>, require_password: bool) -> Result<(), UserValidationError> {
    let user = user.ok_or(UserValidationError::EmptyUser)?;

    USER_RULES
        .iter()
        .try_for_each(|rule| rule(user, require_password))
}

/// Validate the format of an email address
///
/// Rules:
/// - At least `MINIMUM_CHARACTERS_FOR_EMAIL` characters
/// - Exactly one `@`
/// - At least one `.` after the `@`
pub fn validate_email(email: &str) -> Result<(), UserValidationError> {
    if email.chars().count() < MINIMUM_CHARACTERS_FOR_EMAIL {
        return Err(UserValidationError::EmailTooShort(MINIMUM_CHARACTERS_FOR_EMAIL));
    }

    let mut parts = email.split('@');
    let (Some(_), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(UserValidationError::EmailSeparator);
    };

    if !domain.contains('.') {
        return Err(UserValidationError::EmailDot);
    }

    Ok(())
}

/// Validate the format of a clear-text password
///
/// Rules:
/// - At least `MINIMUM_CHARACTERS_FOR_PASSWORD` characters
/// - At least one digit
/// - At least one lowercase and one uppercase letter
/// - At least one of `PASSWORD_SPECIAL_CHARACTERS`
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    if password.chars().count() < MINIMUM_CHARACTERS_FOR_PASSWORD {
        return Err(UserValidationError::PasswordTooShort(MINIMUM_CHARACTERS_FOR_PASSWORD));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(UserValidationError::PasswordNumber);
    }

    if !(password.chars().any(char::is_lowercase) && password.chars().any(char::is_uppercase)) {
        return Err(UserValidationError::PasswordCase);
    }

    if !password.chars().any(|c| PASSWORD_SPECIAL_CHARACTERS.contains(&c)) {
        return Err(UserValidationError::PasswordSpecialCharacter);
    }

    Ok(())
}
