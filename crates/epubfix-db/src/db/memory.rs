//! In-memory implementations of the store traits.
//!
//! Mirrors the PostgreSQL semantics the handlers rely on: owner scoping,
//! newest-first ordering and case-insensitive unique emails.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use epubfix_core::models::{NewUploadRecord, NewUser, UploadRecord, User, UserSummary};
use epubfix_core::AppError;
use uuid::Uuid;

use super::store::{UploadStore, UserStore};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    uploads: Vec<UploadRecord>,
}

/// Both stores over one set of tables, so user deletion can cascade.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    /// Number of stored upload records across all owners.
    pub fn upload_count(&self) -> usize {
        self.tables.lock().map(|t| t.uploads.len()).unwrap_or(0)
    }
}

fn newest_first(records: &mut [UploadRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl UploadStore for MemoryStore {
    async fn create(&self, record: NewUploadRecord) -> Result<UploadRecord, AppError> {
        let mut tables = self.lock()?;
        // Strictly increasing timestamps keep newest-first ordering stable in fast tests.
        let now = Utc::now();
        let created_at = tables
            .uploads
            .iter()
            .map(|r| r.created_at)
            .max()
            .filter(|latest| *latest >= now)
            .map(|latest| latest + Duration::milliseconds(1))
            .unwrap_or(now);
        let row = record.into_record(created_at);
        tables.uploads.push(row.clone());
        Ok(row)
    }

    async fn list_for_owner(&self, user_id: Uuid) -> Result<Vec<UploadRecord>, AppError> {
        let tables = self.lock()?;
        let mut rows: Vec<UploadRecord> = tables
            .uploads
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(rows)
    }

    async fn get_for_owner(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<UploadRecord>, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .uploads
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned())
    }

    async fn delete_for_owner(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        let before = tables.uploads.len();
        tables
            .uploads
            .retain(|r| !(r.id == id && r.user_id == user_id));
        Ok(tables.uploads.len() < before)
    }

    async fn list_all(&self) -> Result<Vec<UploadRecord>, AppError> {
        let tables = self.lock()?;
        let mut rows = tables.uploads.clone();
        newest_first(&mut rows);
        Ok(rows)
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        let mut tables = self.lock()?;
        let removed = tables.uploads.len() as u64;
        tables.uploads.clear();
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        let email = user.email.trim().to_string();
        if tables
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&email))
        {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email,
            name: user.name,
            password_hash: Some(user.password_hash),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let tables = self.lock()?;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_with_upload_counts(&self) -> Result<Vec<UserSummary>, AppError> {
        let tables = self.lock()?;
        let mut summaries: Vec<UserSummary> = tables
            .users
            .iter()
            .map(|u| UserSummary {
                id: u.id,
                email: u.email.clone(),
                name: u.name.clone(),
                upload_count: tables.uploads.iter().filter(|r| r.user_id == u.id).count() as i64,
                created_at: u.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        let mut tables = self.lock()?;
        let removed = tables.users.len() as u64;
        tables.users.clear();
        tables.uploads.clear();
        Ok(removed)
    }
}
