//! Document store backed user repository

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::password::{generate_validation_code, PasswordDigest, Sha256Digest};
use crate::domain::storage::{
    Collection, ConditionalInsert, Document, DocumentId, DocumentStore, Filter, Update,
};
use crate::domain::user::{
    diff, fields, user_from_document, validate_user, User, UserRepository, UserValidationError,
};
use crate::domain::DomainError;

/// Parse a caller supplied user id
///
/// A blank id is an invalid request. A malformed id cannot name any stored
/// user, so it fails exactly like an unknown one.
pub(crate) fn parse_user_id(id: &str) -> Result<DocumentId, DomainError> {
    if id.trim().is_empty() {
        return Err(DomainError::invalid_request("User id cannot be empty."));
    }

    DocumentId::parse(id).map_err(|_| user_not_found(id))
}

fn user_not_found(id: &str) -> DomainError {
    DomainError::not_found(format!("User with id {} does not exist.", id))
}

/// User repository over a [`DocumentStore`]
///
/// Holds no state besides the store handle; every call re-reads what it
/// needs.
pub struct DocumentUserRepository {
    store: Arc<dyn DocumentStore>,
    digest: Arc<dyn PasswordDigest>,
}

impl fmt::Debug for DocumentUserRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentUserRepository")
            .field("collection", &Collection::Users.as_str())
            .field("digest", &self.digest)
            .finish()
    }
}

impl DocumentUserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_digest(store, Arc::new(Sha256Digest::new()))
    }

    pub fn with_digest(store: Arc<dyn DocumentStore>, digest: Arc<dyn PasswordDigest>) -> Self {
        Self { store, digest }
    }

    fn collection(&self) -> &'static str {
        Collection::Users.as_str()
    }

    async fn find(&self, filter: &Filter) -> Result<Option<User>, DomainError> {
        let document = self.store.find_one(self.collection(), filter).await?;
        Ok(user_from_document(document.as_ref()))
    }
}

#[async_trait]
impl UserRepository for DocumentUserRepository {
    #[tracing::instrument(skip(self, user))]
    async fn register(&self, user: Option<User>) -> Result<String, DomainError> {
        validate_user(user.as_ref(), true)?;
        let mut user = user.ok_or(UserValidationError::EmptyUser)?;

        user.id = None;
        user.password = user.password.as_deref().map(|p| self.digest.digest(p));
        user.validated = false;
        user.creation_time.get_or_insert_with(Utc::now);
        user.validation_code.get_or_insert_with(generate_validation_code);
        for device in &mut user.devices {
            device.id.get_or_insert_with(|| DocumentId::new().to_string());
        }

        let email = user.email.clone().unwrap_or_default();
        let outcome = self
            .store
            .insert_if_absent(
                self.collection(),
                Document::from(&user),
                &Filter::eq(fields::EMAIL, email),
            )
            .await?;

        let result = match outcome {
            ConditionalInsert::Inserted(result) => result,
            ConditionalInsert::Conflict => {
                debug!("Email is already registered");
                return Err(DomainError::user_already_exists("User already exists."));
            }
        };

        let Some(id) = result.inserted_id else {
            warn!("Store acknowledged the insert without an id");
            return Err(DomainError::database("User could not be added."));
        };

        info!(user_id = %id, "Registered user");
        Ok(id.to_string())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: &str, secure: bool) -> Result<User, DomainError> {
        let document_id = parse_user_id(id)?;

        debug!("Loading user");
        let user = self
            .find(&Filter::id(&document_id))
            .await?
            .ok_or_else(|| user_not_found(id))?;

        Ok(if secure { user.secured() } else { user })
    }

    #[tracing::instrument(skip(self, email))]
    async fn get_by_email(&self, email: &str, secure: bool) -> Result<User, DomainError> {
        if email.trim().is_empty() {
            return Err(DomainError::invalid_request("User email cannot be empty."));
        }

        debug!("Loading user by email");
        let user = self
            .find(&Filter::eq(fields::EMAIL, email))
            .await?
            .ok_or_else(|| {
                DomainError::not_found(format!("User with email {} does not exist.", email))
            })?;

        Ok(if secure { user.secured() } else { user })
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let document_id = parse_user_id(id)?;
        self.get(id, false).await?;

        let result = self
            .store
            .delete_one(self.collection(), &Filter::id(&document_id))
            .await?;

        if result.deleted_count == 0 {
            warn!("Store reported no deleted user");
            return Err(DomainError::database("User could not be deleted."));
        }

        info!("Deleted user");
        Ok(())
    }

    #[tracing::instrument(skip(self, user))]
    async fn update(&self, id: &str, user: Option<User>) -> Result<(), DomainError> {
        let document_id = parse_user_id(id)?;
        validate_user(user.as_ref(), false)?;
        let desired = user.ok_or(UserValidationError::EmptyUser)?;

        let existing = self.get(id, false).await?;
        let patch = diff(&existing, &desired)
            .ok_or_else(|| DomainError::nothing_changed("No changes needed."))?;

        debug!(changes = patch.changes().len(), "Applying user patch");
        let result = self
            .store
            .update_one(
                self.collection(),
                &Filter::id(&document_id),
                &Update::from(&patch),
            )
            .await?;

        if result.matched_count == 0 {
            warn!("Store matched no user to update");
            return Err(DomainError::database("User could not be updated."));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::Device;
    use crate::domain::storage::{DeleteResult, InsertOneResult, MockDocumentStore, UpdateResult};
    use crate::domain::{ErrorCode, StatusClass};
    use crate::infrastructure::storage::InMemoryDocumentStore;

    const PASSWORD: &str = "#PasswordisHereLoL#?2000";

    fn test_user() -> User {
        User::new("bot.valhalla", "bot@valhalla.org", PASSWORD)
    }

    fn repository() -> (Arc<InMemoryDocumentStore>, DocumentUserRepository) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repository = DocumentUserRepository::new(store.clone());
        (store, repository)
    }

    async fn assert_register_fails(user: User, code: ErrorCode, message: &str) {
        let (store, repository) = repository();
        let err = repository.register(Some(user)).await.unwrap_err();

        assert_eq!(err.code(), code);
        assert_eq!(err.message(), message);
        assert_eq!(store.count("users").await, 0);
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let (_, repository) = repository();

        let id = repository.register(Some(test_user())).await.unwrap();
        let user = repository.get(&id, false).await.unwrap();

        assert_eq!(user.id.as_deref(), Some(id.as_str()));
        assert_eq!(user.username.as_deref(), Some("bot.valhalla"));
        assert_eq!(user.password, Some(Sha256Digest::new().digest(PASSWORD)));
        assert!(!user.validated);
        assert_eq!(user.validation_code.as_ref().map(String::len), Some(6));
        assert!(user.creation_time.is_some());
    }

    #[tokio::test]
    async fn test_register_ignores_client_id_and_validated_flag() {
        let (_, repository) = repository();
        let mut user = test_user().with_id(DocumentId::new().to_string());
        user.validated = true;
        let client_id = user.id.clone();

        let id = repository.register(Some(user)).await.unwrap();

        assert_ne!(Some(id.clone()), client_id);
        assert!(!repository.get(&id, false).await.unwrap().validated);
    }

    #[tokio::test]
    async fn test_register_rejects_missing_fields_without_writing() {
        let (store, repository) = repository();
        let err = repository.register(None).await.unwrap_err();
        assert_eq!(err.message(), "User cannot be empty.");
        assert_eq!(store.count("users").await, 0);

        assert_register_fails(
            User { email: None, ..test_user() },
            ErrorCode::InvalidEmail,
            "Email cannot be empty.",
        )
        .await;
        assert_register_fails(
            User { password: Some(String::new()), ..test_user() },
            ErrorCode::InvalidPassword,
            "Password cannot be empty.",
        )
        .await;
        assert_register_fails(
            User { username: None, ..test_user() },
            ErrorCode::InvalidRequest,
            "Username cannot be empty.",
        )
        .await;
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_email_and_password() {
        assert_register_fails(
            test_user().with_email("akrck02.com"),
            ErrorCode::InvalidEmail,
            "Email must have one @.",
        )
        .await;
        assert_register_fails(
            test_user().with_email("akrck02@com"),
            ErrorCode::InvalidEmail,
            "Email must have at least one dot.",
        )
        .await;
        assert_register_fails(
            test_user().with_email("com"),
            ErrorCode::InvalidEmail,
            "Email must have at least 5 characters.",
        )
        .await;
        assert_register_fails(
            test_user().with_password("PasswordisHereLoL2000"),
            ErrorCode::InvalidPassword,
            "Password must have at least one special character.",
        )
        .await;
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (_, repository) = repository();
        let first = repository.register(Some(test_user())).await.unwrap();

        let err = repository.register(Some(test_user())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UserAlreadyExists);
        assert_eq!(err.message(), "User already exists.");

        let second = repository
            .register(Some(test_user().with_email("other@valhalla.org")))
            .await
            .unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_with_one_email() {
        let (store, repository) = repository();
        let repository = Arc::new(repository);

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let repository = repository.clone();
                tokio::spawn(async move {
                    let user = test_user().with_username(format!("bot.valhalla.{}", i));
                    repository.register(Some(user)).await
                })
            })
            .collect();

        let mut registered = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => registered += 1,
                Err(err) => assert_eq!(err.code(), ErrorCode::UserAlreadyExists),
            }
        }

        assert_eq!(registered, 1);
        assert_eq!(store.count("users").await, 1);
    }

    #[tokio::test]
    async fn test_register_rejects_repeated_device_identity() {
        let firefox = Device::new("127.0.0.1", "Firefox, Linux");
        let user = test_user()
            .with_device(firefox.clone().with_token("t-1"))
            .with_device(firefox.with_token("t-2"));

        assert_register_fails(
            user,
            ErrorCode::InvalidRequest,
            "Devices must have distinct address and user agent.",
        )
        .await;
    }

    #[tokio::test]
    async fn test_secure_reads_strip_password() {
        let (_, repository) = repository();
        let id = repository.register(Some(test_user())).await.unwrap();

        assert_eq!(repository.get(&id, true).await.unwrap().password, None);

        let by_email = repository.get_by_email("bot@valhalla.org", true).await.unwrap();
        assert_eq!(by_email.id.as_deref(), Some(id.as_str()));
        assert_eq!(by_email.password, None);

        let insecure = repository.get_by_email("bot@valhalla.org", false).await.unwrap();
        assert!(insecure.password.is_some());
    }

    #[tokio::test]
    async fn test_get_argument_errors() {
        let (_, repository) = repository();

        let err = repository.get("", false).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.message(), "User id cannot be empty.");

        let err = repository.get("not-an-id", false).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "User with id not-an-id does not exist.");

        let err = repository.get_by_email(" ", false).await.unwrap_err();
        assert_eq!(err.message(), "User email cannot be empty.");

        let err = repository.get_by_email("nobody@valhalla.org", false).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "User with email nobody@valhalla.org does not exist.");
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let (_, repository) = repository();
        let id = repository.register(Some(test_user())).await.unwrap();

        repository.delete(&id).await.unwrap();

        let err = repository.get(&id, false).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), format!("User with id {} does not exist.", id));

        let err = repository.delete(&id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_update_username() {
        let (_, repository) = repository();
        let id = repository.register(Some(test_user())).await.unwrap();

        repository
            .update(&id, Some(test_user().with_username("xxx_shadow_the_hedgehog_xxx")))
            .await
            .unwrap();

        let user = repository.get(&id, false).await.unwrap();
        assert_eq!(user.username.as_deref(), Some("xxx_shadow_the_hedgehog_xxx"));
        assert_eq!(user.password, Some(Sha256Digest::new().digest(PASSWORD)));
    }

    #[tokio::test]
    async fn test_update_nothing_changed() {
        let (_, repository) = repository();
        let id = repository.register(Some(test_user())).await.unwrap();

        let err = repository.update(&id, Some(test_user())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NothingChanged);
        assert_eq!(err.status(), StatusClass::BadRequest);
        assert_eq!(err.message(), "No changes needed.");

        let stored = repository.get(&id, false).await.unwrap();
        let err = repository.update(&id, Some(stored)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NothingChanged);
    }

    #[tokio::test]
    async fn test_update_ignores_email_change() {
        let (_, repository) = repository();
        let id = repository.register(Some(test_user())).await.unwrap();

        let err = repository
            .update(&id, Some(test_user().with_email("other@valhalla.org")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NothingChanged);
    }

    #[tokio::test]
    async fn test_update_validates_entity() {
        let (_, repository) = repository();
        let id = repository.register(Some(test_user())).await.unwrap();

        let err = repository.update(&id, None).await.unwrap_err();
        assert_eq!(err.message(), "User cannot be empty.");

        let err = repository
            .update(&id, Some(User { username: Some(String::new()), ..test_user() }))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Username cannot be empty.");

        let err = repository
            .update(&id, Some(User { email: None, password: None, ..test_user() }))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Email cannot be empty.");

        let err = repository.update("", Some(test_user())).await.unwrap_err();
        assert_eq!(err.message(), "User id cannot be empty.");
    }

    #[tokio::test]
    async fn test_update_devices() {
        let (_, repository) = repository();
        let id = repository.register(Some(test_user())).await.unwrap();

        let desired = test_user().with_device(Device::new("127.0.0.1", "Firefox, Linux").with_token("t-1"));
        repository.update(&id, Some(desired)).await.unwrap();

        let user = repository.get(&id, true).await.unwrap();
        assert_eq!(user.devices.len(), 1);
        assert_eq!(user.devices[0].token.as_deref(), Some("t-1"));
    }

    #[tokio::test]
    async fn test_update_rejects_repeated_device_identity() {
        let (_, repository) = repository();
        let firefox = Device::new("127.0.0.1", "Firefox, Linux");
        let id = repository
            .register(Some(test_user().with_device(firefox.clone().with_token("t-0"))))
            .await
            .unwrap();

        let desired = test_user()
            .with_device(firefox.clone().with_token("t-1"))
            .with_device(firefox.with_token("t-2"));
        let err = repository.update(&id, Some(desired)).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.message(), "Devices must have distinct address and user agent.");

        let user = repository.get(&id, true).await.unwrap();
        assert_eq!(user.devices.len(), 1);
        assert_eq!(user.devices[0].token.as_deref(), Some("t-0"));
    }

    #[tokio::test]
    async fn test_stub_operations_are_not_implemented() {
        let (_, repository) = repository();

        let err = repository.login(&test_user()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotImplemented);
        assert!(repository.login_with_auth("token").await.is_err());
        assert!(repository.validate_account("123456").await.is_err());
        assert!(repository.update_profile_picture("id", "/tmp/p.png").await.is_err());
    }

    #[tokio::test]
    async fn test_register_without_inserted_id_is_database_error() {
        let mut store = MockDocumentStore::new();
        store
            .expect_insert_if_absent()
            .returning(|_, _, _| Ok(ConditionalInsert::Inserted(InsertOneResult { inserted_id: None })));

        let repository = DocumentUserRepository::new(Arc::new(store));
        let err = repository.register(Some(test_user())).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert_eq!(err.status(), StatusClass::InternalServerError);
        assert_eq!(err.message(), "User could not be added.");
    }

    #[tokio::test]
    async fn test_delete_without_deletion_is_database_error() {
        let id = DocumentId::new();
        let stored = Document::from(&test_user().with_id(id.to_string()));

        let mut store = MockDocumentStore::new();
        store
            .expect_find_one()
            .returning(move |_, _| Ok(Some(stored.clone())));
        store
            .expect_delete_one()
            .times(1)
            .returning(|_, _| Ok(DeleteResult { deleted_count: 0 }));

        let repository = DocumentUserRepository::new(Arc::new(store));
        let err = repository.delete(&id.to_string()).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert_eq!(err.message(), "User could not be deleted.");
    }

    #[tokio::test]
    async fn test_update_unmatched_is_database_error() {
        let id = DocumentId::new();
        let stored = Document::from(&test_user().with_id(id.to_string()));

        let mut store = MockDocumentStore::new();
        store
            .expect_find_one()
            .returning(move |_, _| Ok(Some(stored.clone())));
        store
            .expect_update_one()
            .returning(|_, _, _| Ok(UpdateResult::default()));

        let repository = DocumentUserRepository::new(Arc::new(store));
        let err = repository
            .update(&id.to_string(), Some(test_user().with_username("bot.asgard")))
            .await
            .unwrap_err();

        assert_eq!(err.message(), "User could not be updated.");
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let mut store = MockDocumentStore::new();
        store
            .expect_insert_if_absent()
            .returning(|_, _, _| Err(DomainError::database("connection reset")));
        store.expect_insert_one().never();

        let repository = DocumentUserRepository::new(Arc::new(store));
        let err = repository.register(Some(test_user())).await.unwrap_err();

        assert_eq!(err, DomainError::database("connection reset"));
    }
}
