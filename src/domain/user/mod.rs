//! User domain
//!
//! User entity, the validation rule engine, the persisted document mapping,
//! the update diff and the repository trait.

mod codec;
mod diff;
mod entity;
mod repository;
mod validation;

pub use codec::{fields, user_from_document};
pub use diff::{diff, FieldChange, UserPatch};
pub use entity::User;
pub use repository::UserRepository;
pub use validation::{
    validate_email, validate_password, validate_user, UserValidationError,
    MINIMUM_CHARACTERS_FOR_EMAIL, MINIMUM_CHARACTERS_FOR_PASSWORD, PASSWORD_SPECIAL_CHARACTERS,
};
