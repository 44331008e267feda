//! Credential store interface
//!
//! Handlers and services talk to persistence only through [`UserStore`].
//! A missing record is `Ok(None)` (or `Ok(false)` for deletes), never an error.

use async_trait::async_trait;

use crate::database::models::{NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique constraint on the username was violated
    #[error("username already taken")]
    Conflict,

    #[error("failed to get database connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("database query failed: {0}")]
    Query(#[source] tokio_postgres::Error),
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.code() == Some(&tokio_postgres::error::SqlState::UNIQUE_VIOLATION) {
            StoreError::Conflict
        } else {
            StoreError::Query(err)
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn list(&self) -> Result<Vec<User>, StoreError>;

    async fn exists(&self, username: &str) -> Result<bool, StoreError>;

    async fn update_username(&self, id: i32, username: &str) -> Result<Option<User>, StoreError>;

    /// Soft delete. Returns false when no live user has this id.
    async fn delete(&self, id: i32) -> Result<bool, StoreError>;
}
