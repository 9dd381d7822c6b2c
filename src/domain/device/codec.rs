//! Device <-> document mapping

use crate::domain::storage::{Document, DocumentId, ID_KEY};

use super::entity::Device;

/// Persisted key of every device field
pub mod fields {
    pub const ID: &str = super::ID_KEY;
    pub const ADDRESS: &str = "address";
    pub const USER_AGENT: &str = "useragent";
    pub const TOKEN: &str = "token";
}

/// Keys forming the device identity inside an embedded array
pub const IDENTITY_FIELDS: [&str; 2] = [fields::ADDRESS, fields::USER_AGENT];

impl From<&Device> for Document {
    fn from(device: &Device) -> Self {
        let mut document = Document::new();

        if let Some(id) = &device.id {
            document.insert(fields::ID, DocumentId::value_of(id));
        }

        document
            .append(fields::ADDRESS, device.address.clone())
            .append(fields::USER_AGENT, device.user_agent.clone())
            .append(fields::TOKEN, device.token.clone())
    }
}

impl From<&Document> for Device {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id_string(),
            address: document.get_str(fields::ADDRESS).map(str::to_owned),
            user_agent: document.get_str(fields::USER_AGENT).map(str::to_owned),
            token: document.get_str(fields::TOKEN).map(str::to_owned),
        }
    }
}
