//! User <-> document mapping
//!
//! Keys are lower-case and fixed by [`fields`]; encode and decode read the
//! same table so the mapping stays bijective.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use super::entity::User;
use crate::domain::device::Device;
use crate::domain::storage::{Document, DocumentId, ID_KEY};

/// Persisted key of every user field
pub mod fields {
    pub const ID: &str = super::ID_KEY;
    pub const USERNAME: &str = "username";
    pub const EMAIL: &str = "email";
    pub const PASSWORD: &str = "password";
    pub const VALIDATED: &str = "validated";
    pub const VALIDATION_CODE: &str = "validationcode";
    pub const PROFILE_PICTURE_PATH: &str = "profilepicturepath";
    pub const CREATION_TIME: &str = "creationtime";
    pub const DEVICES: &str = "devices";
}

fn encode_time(time: &DateTime<Utc>) -> Value {
    Value::String(time.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

// Older documents carry epoch milliseconds instead of a timestamp string
fn decode_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|time| time.with_timezone(&Utc)),
        Value::Number(millis) => millis
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

pub(crate) fn encode_devices(devices: &[Device]) -> Value {
    Value::Array(
        devices
            .iter()
            .map(|device| Document::from(device).into())
            .collect(),
    )
}

impl From<&User> for Document {
    fn from(user: &User) -> Self {
        let mut document = Document::new();

        if let Some(id) = &user.id {
            document.insert(fields::ID, DocumentId::value_of(id));
        }

        document
            .append(fields::USERNAME, user.username.clone())
            .append(fields::EMAIL, user.email.clone())
            .append(fields::PASSWORD, user.password.clone())
            .append(fields::VALIDATED, user.validated)
            .append(fields::VALIDATION_CODE, user.validation_code.clone())
            .append(fields::PROFILE_PICTURE_PATH, user.profile_picture_path.clone())
            .append(
                fields::CREATION_TIME,
                user.creation_time.as_ref().map_or(Value::Null, encode_time),
            )
            .append(fields::DEVICES, encode_devices(&user.devices))
    }
}

impl From<&Document> for User {
    fn from(document: &Document) -> Self {
        let owned = |key: &str| document.get_str(key).map(str::to_owned);

        Self {
            id: document.id_string(),
            username: owned(fields::USERNAME),
            email: owned(fields::EMAIL),
            password: owned(fields::PASSWORD),
            validated: document.get_bool(fields::VALIDATED).unwrap_or(false),
            validation_code: owned(fields::VALIDATION_CODE),
            profile_picture_path: owned(fields::PROFILE_PICTURE_PATH),
            creation_time: document.get(fields::CREATION_TIME).and_then(decode_time),
            devices: document
                .get_array(fields::DEVICES)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Document::from_value)
                        .map(|device| Device::from(&device))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Decode an optional document; absence stays absence
pub fn user_from_document(document: Option<&Document>) -> Option<User> {
    document.map(User::from)
}
