//! Infrastructure layer - document store backends and repository implementations

pub mod device;
pub mod logging;
pub mod storage;
pub mod user;
