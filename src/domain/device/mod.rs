//! Device domain
//!
//! Devices have no collection of their own: they are embedded in the owning
//! user's document and matched by (address, user agent).

mod codec;
mod entity;
mod repository;

pub use codec::{fields, IDENTITY_FIELDS};
pub use entity::Device;
pub use repository::DeviceRepository;
