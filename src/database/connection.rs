// Database Connection Management
//
// Handles PostgreSQL connection pooling using tokio-postgres and deadpool,
// and implements the credential store on top of the pool.
use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::time::Duration;

use crate::database::models::{FromRow, NewUser, User};
use crate::database::store::{StoreError, UserStore};

const USER_COLUMNS: &str =
    "id, created_at, updated_at, deleted_at, username, password_hash, is_admin";

/// Database configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_size: usize,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl DatabaseConfig {
    fn timeouts() -> deadpool_postgres::Timeouts {
        deadpool_postgres::Timeouts {
            wait: Some(Duration::from_secs(30)),
            create: Some(Duration::from_secs(30)),
            recycle: Some(Duration::from_secs(30)),
        }
    }
}

/// Database connection wrapper
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: Pool,
}

impl DatabaseConnection {
    /// Create a new database connection with the provided configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let masked_host = format!("{}:{}/{}", config.host, config.port, config.dbname);
        tracing::info!("🔌 Connecting to database: {}", masked_host);

        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.dbname(&config.dbname);

        let tls_connector = TlsConnector::builder()
            .build()
            .context("Failed to build TLS connector")?;
        let tls = MakeTlsConnector::new(tls_connector);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, tls, mgr_config);

        let timeouts = DatabaseConfig::timeouts();
        let pool = Pool::builder(mgr)
            .max_size(config.max_size)
            .wait_timeout(timeouts.wait)
            .create_timeout(timeouts.create)
            .recycle_timeout(timeouts.recycle)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .context("Failed to create database pool")?;

        let client = pool
            .get()
            .await
            .context("Failed to get connection from pool")?;
        client
            .query("SELECT 1", &[])
            .await
            .context("Failed to test database connection")?;

        tracing::info!("✅ Database connection established successfully");

        Ok(Self { pool })
    }

    /// Run embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        crate::database::migrations::run_migrations(&self.pool).await
    }
}

#[async_trait]
impl UserStore for DatabaseConnection {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO users (username, password_hash, is_admin) VALUES ($1, $2, $3) RETURNING {}",
                    USER_COLUMNS
                ),
                &[&user.username, &user.password_hash, &user.is_admin],
            )
            .await?;
        Ok(User::from_row(&row)?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
                    USER_COLUMNS
                ),
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(User::from_row).transpose()?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {} FROM users WHERE username = $1 AND deleted_at IS NULL",
                    USER_COLUMNS
                ),
                &[&username],
            )
            .await?;
        Ok(row.as_ref().map(User::from_row).transpose()?)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY id",
                    USER_COLUMNS
                ),
                &[],
            )
            .await?;
        rows.iter()
            .map(|row| User::from_row(row).map_err(StoreError::from))
            .collect()
    }

    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND deleted_at IS NULL)",
                &[&username],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn update_username(&self, id: i32, username: &str) -> Result<Option<User>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    "UPDATE users SET username = $2, updated_at = NOW() \
                     WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
                    USER_COLUMNS
                ),
                &[&id, &username],
            )
            .await?;
        Ok(row.as_ref().map(User::from_row).transpose()?)
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        let n = client
            .execute(
                "UPDATE users SET deleted_at = NOW(), updated_at = NOW() \
                 WHERE id = $1 AND deleted_at IS NULL",
                &[&id],
            )
            .await?;
        Ok(n > 0)
    }
}
