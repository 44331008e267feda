//! # Database Module
//!
//! Credential store backed by PostgreSQL through tokio-postgres and deadpool.
//! Includes connection management, models, migrations and the store trait.

pub mod connection;
pub mod migrations;
pub mod models;
pub mod store;

#[cfg(test)]
pub mod memory;

pub use connection::{DatabaseConfig, DatabaseConnection};
pub use models::{NewUser, User};
pub use store::{StoreError, UserStore};
