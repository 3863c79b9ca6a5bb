//! library-catalog: a small library catalog backend.
//!
//! This crate serves a JSON-over-HTTP API for authors and books, with user
//! accounts, capped per-user favorites and same-author recommendations.
//!
//! # Features
//!
//! - Author and book CRUD with cascade deletes
//! - Case-insensitive search over titles and author names
//! - Registration and login with Argon2 password hashes
//! - JWT access/refresh tokens with a persisted refresh-token blacklist
//! - Up to 20 favorites per user, with recommendations

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and user management.
pub mod auth;
/// Author and book management.
pub mod catalog;
/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// Favorites and recommendations.
pub mod favorites;
/// HTTP server.
pub mod server;


pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;
