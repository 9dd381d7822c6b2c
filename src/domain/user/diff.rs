//! Update-diff calculator
//!
//! Only username and the device list take part in an update. Email,
//! password and the validation fields are ignored on this path.

use crate::domain::device::Device;
use crate::domain::storage::Update;

use super::codec::{encode_devices, fields};
use super::entity::User;

/// One changed, update-eligible field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Username(Option<String>),
    Devices(Vec<Device>),
}

/// Minimal set of field changes moving a stored user to a desired state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    changes: Vec<FieldChange>,
}

impl UserPatch {
    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }
}

impl From<&FieldChange> for Update {
    fn from(change: &FieldChange) -> Self {
        match change {
            FieldChange::Username(username) => Update::new().set(fields::USERNAME, username.clone()),
            FieldChange::Devices(devices) => Update::new().set(fields::DEVICES, encode_devices(devices)),
        }
    }
}

impl From<&UserPatch> for Update {
    fn from(patch: &UserPatch) -> Self {
        Update::combine(patch.changes.iter().map(Update::from))
    }
}

fn devices_changed(existing: &[Device], desired: &[Device]) -> bool {
    desired.iter().any(|wanted| {
        match existing.iter().find(|stored| stored.same_identity(wanted)) {
            Some(stored) => stored.token != wanted.token,
            None => true,
        }
    })
}

// Devices already stored keep their identifier when the caller omits it
fn merge_device_ids(existing: &[Device], desired: &[Device]) -> Vec<Device> {
    desired
        .iter()
        .map(|wanted| {
            let mut device = wanted.clone();
            if device.id.is_none() {
                device.id = existing
                    .iter()
                    .find(|stored| stored.same_identity(wanted))
                    .and_then(|stored| stored.id.clone());
            }
            device
        })
        .collect()
}

/// Compute the patch turning `existing` into `desired`
///
/// Returns `None` when no update-eligible field differs.
pub fn diff(existing: &User, desired: &User) -> Option<UserPatch> {
    let mut changes = Vec::new();

    if desired.username != existing.username {
        changes.push(FieldChange::Username(desired.username.clone()));
    }

    if devices_changed(&existing.devices, &desired.devices) {
        changes.push(FieldChange::Devices(merge_device_ids(
            &existing.devices,
            &desired.devices,
        )));
    }

    if changes.is_empty() {
        None
    } else {
        Some(UserPatch { changes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::Document;
    use serde_json::Value;

    fn stored() -> User {
        User::new("bot.valhalla", "bot@valhalla.org", "digest")
            .with_id("6f9619ff-8b86-d011-b42d-00c04fc964ff")
            .with_device(
                Device::new("127.0.0.1", "Firefox, Linux")
                    .with_token("t-1")
                    .with_id("0d1c6a52-2a8a-4d5c-9b9e-3f1a7a0c2b11"),
            )
    }

    #[test]
    fn test_identical_user_has_no_diff() {
        assert_eq!(diff(&stored(), &stored()), None);
    }

    #[test]
    fn test_ignored_fields_have_no_diff() {
        let mut desired = stored()
            .with_email("other@valhalla.org")
            .with_password("changed");
        desired.validated = true;
        desired.validation_code = Some("654321".into());

        assert_eq!(diff(&stored(), &desired), None);
    }

    #[test]
    fn test_username_change() {
        let desired = stored().with_username("bot.asgard");
        let patch = diff(&stored(), &desired).unwrap();

        assert_eq!(
            patch.changes(),
            &[FieldChange::Username(Some("bot.asgard".into()))]
        );

        let update = Update::from(&patch);
        assert_eq!(
            update.fields().collect::<Vec<_>>(),
            vec![("username", &Value::from("bot.asgard"))]
        );
    }

    #[test]
    fn test_new_device_is_a_change() {
        let desired = stored().with_device(Device::new("10.0.0.2", "Safari, macOS").with_token("t-2"));
        let patch = diff(&stored(), &desired).unwrap();

        let FieldChange::Devices(devices) = &patch.changes()[0] else {
            panic!("expected a device change");
        };
        assert_eq!(devices.len(), 2);
    }

    #[test]
    fn test_token_change_is_a_change() {
        let mut desired = stored();
        desired.devices[0].token = Some("t-9".into());
        desired.devices[0].id = None;

        let patch = diff(&stored(), &desired).unwrap();
        let FieldChange::Devices(devices) = &patch.changes()[0] else {
            panic!("expected a device change");
        };

        assert_eq!(devices[0].token.as_deref(), Some("t-9"));
        assert_eq!(devices[0].id, stored().devices[0].id);
    }

    #[test]
    fn test_dropped_device_alone_is_not_a_change() {
        let mut desired = stored();
        desired.devices.clear();

        assert_eq!(diff(&stored(), &desired), None);
    }

    #[test]
    fn test_patch_moves_stored_document_to_desired_state() {
        let desired = stored()
            .with_username("bot.asgard")
            .with_device(Device::new("10.0.0.2", "Safari, macOS").with_token("t-2"));
        let patch = diff(&stored(), &desired).unwrap();

        let mut document = Document::from(&stored());
        assert!(Update::from(&patch).apply(&mut document));

        let updated = User::from(&document);
        assert_eq!(updated.username.as_deref(), Some("bot.asgard"));
        assert_eq!(updated.devices, desired.devices);
        assert_eq!(updated.email, stored().email);
    }
}
