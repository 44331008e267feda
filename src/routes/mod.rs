// # Routes Module
//
// HTTP route handlers, grouped by functionality. Authentication gates are
// attached in `server.rs`, not here.

/// Signup, signin and token renewal
pub mod auth;

/// Profile and admin user management
pub mod users;
