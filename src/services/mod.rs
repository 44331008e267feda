//! # Services Module
//!
//! Business logic that sits between the HTTP handlers and the credential store.

pub mod users;

pub use users::UserService;
