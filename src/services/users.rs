//! User Service
//!
//! Orchestrates signup, credential checks and user management on top of the
//! credential store and the password hasher. Password hashing runs on the
//! blocking pool so request tasks never stall the runtime.

use std::sync::Arc;

use crate::auth::password::{PasswordError, PasswordHasher};
use crate::database::{NewUser, StoreError, User, UserStore};
use crate::error::AppError;

const BAD_CREDENTIALS: &str = "incorrect Username or Password";

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Register a new, non-admin user
    pub async fn signup(&self, username: &str, password: &str) -> Result<User, AppError> {
        let username = normalize_username(username)?;
        require_password(password)?;

        if self.store.exists(&username).await? {
            tracing::info!("Signup rejected, {} already exists", username);
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let password_hash = self.hash_password(password).await?;
        let user = self
            .store
            .create(NewUser {
                username,
                password_hash,
                is_admin: false,
            })
            .await?;

        tracing::info!("👤 Created user {} (id={})", user.username, user.id);
        Ok(user)
    }

    /// Check credentials. Unknown users and wrong passwords fail identically.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let username = username.trim().to_lowercase();

        let Some(user) = self.store.find_by_username(&username).await? else {
            tracing::info!("Signin failed for {}", username);
            return Err(AppError::unauthorized(BAD_CREDENTIALS));
        };

        let hasher = self.hasher.clone();
        let stored = user.password_hash.clone();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || hasher.verify(&stored, &password))
            .await
            .map_err(|e| AppError::Internal(format!("password verification task failed: {}", e)))?;

        match verified {
            Ok(true) => Ok(user),
            Ok(false) => {
                tracing::info!("Signin failed for {}", username);
                Err(AppError::unauthorized(BAD_CREDENTIALS))
            }
            Err(e) => {
                tracing::warn!("Signin for {} hit an unusable password hash: {}", username, e);
                Err(AppError::unauthorized(BAD_CREDENTIALS))
            }
        }
    }

    /// Look up the user a token was issued to
    pub async fn profile(&self, username: &str) -> Result<User, AppError> {
        self.store
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    /// Change the username of the user currently named `username`
    pub async fn rename(&self, username: &str, new_username: &str) -> Result<User, AppError> {
        let new_username = normalize_username(new_username)?;
        let user = self.profile(username).await?;
        if user.username == new_username {
            return Ok(user);
        }

        if self.store.exists(&new_username).await? {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let updated = self
            .store
            .update_username(user.id, &new_username)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;

        tracing::info!("Renamed user {} to {}", username, updated.username);
        Ok(updated)
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.store.list().await?)
    }

    pub async fn find(&self, id: i32) -> Result<User, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        if !self.store.delete(id).await? {
            return Err(AppError::not_found("user not found"));
        }
        tracing::info!("🗑️  Deleted user id={}", id);
        Ok(())
    }

    /// Create the configured admin account unless the name is already taken
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<(), AppError> {
        let username = normalize_username(username)?;
        require_password(password)?;

        if let Some(existing) = self.store.find_by_username(&username).await? {
            if !existing.is_admin {
                tracing::warn!("⚠️  Admin seed {} exists but is not an admin", username);
            }
            return Ok(());
        }

        let password_hash = self.hash_password(password).await?;
        match self
            .store
            .create(NewUser {
                username: username.clone(),
                password_hash,
                is_admin: true,
            })
            .await
        {
            Ok(_) => {
                tracing::info!("🔐 Admin user {} created", username);
                Ok(())
            }
            // Another instance seeded it first
            Err(StoreError::Conflict) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hashed: Result<String, PasswordError> =
            tokio::task::spawn_blocking(move || hasher.hash(&password))
                .await
                .map_err(|e| AppError::Internal(format!("password hashing task failed: {}", e)))?;
        Ok(hashed?)
    }
}

/// Usernames are compared and stored trimmed and lower-cased
pub fn normalize_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim().to_lowercase();
    if username.is_empty() {
        return Err(AppError::Validation("username is required".to_string()));
    }
    Ok(username)
}

fn require_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::test_hasher;
    use crate::database::memory::MemoryUserStore;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryUserStore::new()), test_hasher())
    }

    /// Store that loses every insert to a concurrent signup of the same name
    struct RacingStore;

    #[async_trait::async_trait]
    impl UserStore for RacingStore {
        async fn create(&self, _user: NewUser) -> Result<User, StoreError> {
            Err(StoreError::Conflict)
        }

        async fn find_by_id(&self, _id: i32) -> Result<Option<User>, StoreError> {
            Ok(None)
        }

        async fn find_by_username(&self, _username: &str) -> Result<Option<User>, StoreError> {
            Ok(None)
        }

        async fn list(&self) -> Result<Vec<User>, StoreError> {
            Ok(Vec::new())
        }

        async fn exists(&self, _username: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn update_username(
            &self,
            _id: i32,
            _username: &str,
        ) -> Result<Option<User>, StoreError> {
            Ok(None)
        }

        async fn delete(&self, _id: i32) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_signup_normalizes_and_hashes() {
        let users = service();
        let user = users.signup("  Alice ", "pw1").await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.username, "alice");
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "pw1");
    }

    #[tokio::test]
    async fn test_duplicate_signup_conflicts_without_mutation() {
        let users = service();
        users.signup("alice", "pw1").await.unwrap();

        let err = users.signup("ALICE", "pw2").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let all = users.list().await.unwrap();
        assert_eq!(all.len(), 1);
        // The original password still works
        users.authenticate("alice", "pw1").await.unwrap();
    }

    #[tokio::test]
    async fn test_signup_losing_insert_race_conflicts() {
        let users = UserService::new(Arc::new(RacingStore), test_hasher());
        let err = users.signup("alice", "pw1").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg == "User already exists"));
    }

    #[tokio::test]
    async fn test_signup_requires_fields() {
        let users = service();
        assert!(matches!(
            users.signup("   ", "pw").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            users.signup("bob", "").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_is_generic_on_failure() {
        let users = service();
        users.signup("alice", "pw1").await.unwrap();

        let user = users.authenticate("Alice", "pw1").await.unwrap();
        assert_eq!(user.username, "alice");

        let wrong_password = users.authenticate("alice", "nope").await.unwrap_err();
        let unknown_user = users.authenticate("nobody", "pw1").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert!(matches!(wrong_password, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_malformed_stored_hash_fails_authentication() {
        let store = Arc::new(MemoryUserStore::new());
        store
            .create(NewUser {
                username: "legacy".to_string(),
                password_hash: "plaintext?".to_string(),
                is_admin: false,
            })
            .await
            .unwrap();
        let users = UserService::new(store, test_hasher());

        assert!(matches!(
            users.authenticate("legacy", "plaintext?").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_rename() {
        let users = service();
        users.signup("alice", "pw1").await.unwrap();
        users.signup("bob", "pw2").await.unwrap();

        let renamed = users.rename("alice", "Alicia").await.unwrap();
        assert_eq!(renamed.username, "alicia");
        assert!(matches!(
            users.profile("alice").await,
            Err(AppError::NotFound(_))
        ));

        assert!(matches!(
            users.rename("alicia", "BOB").await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            users.rename("ghost", "casper").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_find() {
        let users = service();
        let alice = users.signup("alice", "pw1").await.unwrap();

        assert_eq!(users.find(alice.id).await.unwrap().username, "alice");
        users.delete(alice.id).await.unwrap();
        assert!(matches!(users.find(alice.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(users.delete(alice.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let users = service();
        users.ensure_admin("admin@test.com", "admin").await.unwrap();
        users.ensure_admin("admin@test.com", "other").await.unwrap();

        let all = users.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_admin);
        users.authenticate("admin@test.com", "admin").await.unwrap();
    }
}
