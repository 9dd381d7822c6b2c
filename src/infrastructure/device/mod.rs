//! Device infrastructure module

mod repository;
mod token;

pub use repository::DocumentDeviceRepository;
pub use token::{AuthTokenGenerator, RandomTokenGenerator};
