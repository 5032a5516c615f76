use async_trait::async_trait;
use epubfix_core::models::{NewUploadRecord, NewUser, UploadRecord, User, UserSummary};
use epubfix_core::AppError;
use uuid::Uuid;

/// Persistence of upload attempts. Every lookup that takes a `user_id` is
/// scoped to that owner; records of other users behave as if absent.
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn create(&self, record: NewUploadRecord) -> Result<UploadRecord, AppError>;

    /// Owner's records, newest first.
    async fn list_for_owner(&self, user_id: Uuid) -> Result<Vec<UploadRecord>, AppError>;

    async fn get_for_owner(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<UploadRecord>, AppError>;

    /// Returns `false` when no row matched both `id` and `user_id`.
    async fn delete_for_owner(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    /// All records, newest first (admin listing).
    async fn list_all(&self) -> Result<Vec<UploadRecord>, AppError>;

    async fn delete_all(&self) -> Result<u64, AppError>;

    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`AppError::Conflict`] when the email is already registered.
    async fn create(&self, user: NewUser) -> Result<User, AppError>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn list_with_upload_counts(&self) -> Result<Vec<UserSummary>, AppError>;

    async fn delete_all(&self) -> Result<u64, AppError>;
}
