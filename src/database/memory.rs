//! In-memory credential store used by the test suite

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::database::models::{NewUser, User};
use crate::database::store::{StoreError, UserStore};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write();
        if users
            .iter()
            .any(|u| u.deleted_at.is_none() && u.username == user.username)
        {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let record = User {
            id: users.len() as i32 + 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            username: user.username,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
        };
        users.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .iter()
            .find(|u| u.deleted_at.is_none() && u.id == id)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .iter()
            .find(|u| u.deleted_at.is_none() && u.username == username)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self
            .users
            .read()
            .iter()
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    async fn update_username(&self, id: i32, username: &str) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write();
        if users
            .iter()
            .any(|u| u.deleted_at.is_none() && u.id != id && u.username == username)
        {
            return Err(StoreError::Conflict);
        }
        let Some(user) = users
            .iter_mut()
            .find(|u| u.deleted_at.is_none() && u.id == id)
        else {
            return Ok(None);
        };
        user.username = username.to_string();
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let mut users = self.users.write();
        match users
            .iter_mut()
            .find(|u| u.deleted_at.is_none() && u.id == id)
        {
            Some(user) => {
                user.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "hash".to_string(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_soft_deleted_users_are_hidden() {
        let store = MemoryUserStore::new();
        let alice = store.create(new_user("alice")).await.unwrap();
        assert_eq!(alice.id, 1);

        assert!(store.delete(alice.id).await.unwrap());
        assert!(!store.delete(alice.id).await.unwrap());
        assert!(store.find_by_id(alice.id).await.unwrap().is_none());
        assert!(!store.exists("alice").await.unwrap());
        assert!(store.list().await.unwrap().is_empty());

        // The name is free again once the holder is soft deleted
        let again = store.create(new_user("alice")).await.unwrap();
        assert_eq!(again.id, 2);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryUserStore::new();
        store.create(new_user("bob")).await.unwrap();
        assert!(matches!(
            store.create(new_user("bob")).await,
            Err(StoreError::Conflict)
        ));
    }
}
