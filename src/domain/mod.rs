//! Domain layer - entities, validation and repository traits

pub mod device;
pub mod error;
pub mod storage;
pub mod user;

pub use device::{Device, DeviceRepository};
pub use error::{DomainError, ErrorCode, StatusClass};
pub use storage::{
    ArrayUpsert, Collection, DeleteResult, Document, DocumentId, DocumentStore, Filter,
    InsertOneResult, Update, UpdateResult,
};
pub use user::{
    diff, validate_user, FieldChange, User, UserPatch, UserRepository, UserValidationError,
};
