//! Device entity

use serde::{Deserialize, Serialize};

/// A client device holding an auth token for its owning user
///
/// Devices live embedded in the owner's user document. Two devices are the
/// same device when their address and user agent match; the token is
/// reissued freely and takes no part in identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl Device {
    pub fn new(address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            id: None,
            address: Some(address.into()),
            user_agent: Some(user_agent.into()),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Whether both devices share the (address, user agent) identity
    pub fn same_identity(&self, other: &Device) -> bool {
        self.address == other.address && self.user_agent == other.user_agent
    }
}
