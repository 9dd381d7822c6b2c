//! Device repository over the users collection
//!
//! Devices are embedded in the owning user's document. Registration goes
//! through one atomic array upsert keyed by (address, user agent), so two
//! concurrent registrations for the same user cannot drop each other's
//! entries.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::token::{AuthTokenGenerator, RandomTokenGenerator};
use crate::domain::device::{self, Device, DeviceRepository, IDENTITY_FIELDS};
use crate::domain::storage::{ArrayUpsert, Collection, Document, DocumentId, DocumentStore, Filter};
use crate::domain::user::{self, User, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::user::parse_user_id;

fn device_not_found() -> DomainError {
    DomainError::not_found("Device not found.")
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

pub struct DocumentDeviceRepository {
    store: Arc<dyn DocumentStore>,
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn AuthTokenGenerator>,
}

impl fmt::Debug for DocumentDeviceRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentDeviceRepository")
            .field("users", &self.users)
            .field("tokens", &self.tokens)
            .finish()
    }
}

impl DocumentDeviceRepository {
    pub fn new(store: Arc<dyn DocumentStore>, users: Arc<dyn UserRepository>) -> Self {
        Self::with_token_generator(store, users, Arc::new(RandomTokenGenerator::new()))
    }

    pub fn with_token_generator(
        store: Arc<dyn DocumentStore>,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn AuthTokenGenerator>,
    ) -> Self {
        Self {
            store,
            users,
            tokens,
        }
    }

    fn validate(device: Option<Device>) -> Result<Device, DomainError> {
        let device = device.ok_or_else(|| DomainError::invalid_request("Device cannot be empty."))?;

        if is_blank(device.address.as_deref()) {
            return Err(DomainError::invalid_request("Device address cannot be empty."));
        }
        if is_blank(device.user_agent.as_deref()) {
            return Err(DomainError::invalid_request("Device user agent cannot be empty."));
        }

        Ok(device)
    }
}

#[async_trait]
impl DeviceRepository for DocumentDeviceRepository {
    #[tracing::instrument(skip(self, device))]
    async fn register(&self, user_id: &str, device: Option<Device>) -> Result<String, DomainError> {
        let document_id = parse_user_id(user_id)?;
        let mut device = Self::validate(device)?;
        self.users.get(user_id, true).await?;

        if is_blank(device.token.as_deref()) {
            device.token = Some(self.tokens.generate());
        }
        device
            .id
            .get_or_insert_with(|| DocumentId::new().to_string());

        let upsert = ArrayUpsert::new(user::fields::DEVICES, Document::from(&device))
            .keyed_by(IDENTITY_FIELDS)
            .refreshing([device::fields::TOKEN]);

        debug!("Upserting device");
        let result = self
            .store
            .upsert_array_element(Collection::Users.as_str(), &Filter::id(&document_id), &upsert)
            .await?;

        if result.matched_count == 0 {
            warn!("Store matched no user for the device upsert");
            return Err(DomainError::database("Device could not be registered."));
        }

        let user = self.users.get(user_id, true).await?;
        let stored = user.find_device(&device).ok_or_else(|| {
            warn!("Registered device missing after reload");
            DomainError::invalid_request("Device not found.")
        })?;

        info!(device_id = ?stored.id, "Registered device");
        stored
            .token
            .clone()
            .ok_or_else(|| DomainError::invalid_request("Device not found."))
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, user_id: &str, id: &str) -> Result<Device, DomainError> {
        if id.trim().is_empty() {
            return Err(DomainError::invalid_request("Device id cannot be empty."));
        }
        let wanted = DocumentId::parse(id).map_or_else(|_| id.to_owned(), |id| id.to_string());

        let user = self.users.get(user_id, true).await?;
        user.devices
            .into_iter()
            .find(|device| device.id.as_deref() == Some(wanted.as_str()))
            .ok_or_else(device_not_found)
    }

    #[tracing::instrument(skip(self))]
    async fn get_all(&self, user_id: &str) -> Result<Vec<Device>, DomainError> {
        Ok(self.users.get(user_id, true).await?.devices)
    }

    #[tracing::instrument(skip(self, token))]
    async fn get_by_auth(&self, user_id: &str, token: &str) -> Result<Device, DomainError> {
        let document_id = parse_user_id(user_id)?;
        if token.trim().is_empty() {
            return Err(DomainError::invalid_request("Token cannot be empty."));
        }

        let filter = Filter::and(vec![
            Filter::id(&document_id),
            Filter::eq(format!("{}.{}", user::fields::DEVICES, device::fields::TOKEN), token),
        ]);

        debug!("Looking up device by token");
        let document = self
            .store
            .find_one(Collection::Users.as_str(), &filter)
            .await?
            .ok_or_else(device_not_found)?;

        User::from(&document)
            .find_device_by_token(token)
            .cloned()
            .ok_or_else(device_not_found)
    }
}
