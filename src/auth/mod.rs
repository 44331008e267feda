//! # Authentication Module
//!
//! Password hashing, JWT issuance/validation/renewal, and the middleware that
//! gates authenticated and admin-only routes.

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
