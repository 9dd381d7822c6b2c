//! User entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::device::Device;

/// User entity
///
/// `id` is only present once the user has been stored. `password` is the
/// stored digest after registration and is cleared on secure reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub validated: bool,
    #[serde(default)]
    pub validation_code: Option<String>,
    #[serde(default)]
    pub profile_picture_path: Option<String>,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl User {
    /// Create an unsaved user with its compulsory properties
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: Some(username.into()),
            email: Some(email.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.devices.push(device);
        self
    }

    /// Drop sensitive fields before handing the user out
    pub fn secured(mut self) -> Self {
        self.password = None;
        self
    }

    /// Device sharing the (address, user agent) identity of `device`
    pub fn find_device(&self, device: &Device) -> Option<&Device> {
        self.devices.iter().find(|d| d.same_identity(device))
    }

    /// Device holding the given auth token
    pub fn find_device_by_token(&self, token: &str) -> Option<&Device> {
        self.devices
            .iter()
            .find(|d| d.token.as_deref() == Some(token))
    }
}
