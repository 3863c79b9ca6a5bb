mod queries;
mod schema;

pub use queries::*;
pub use schema::Database;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Book author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    /// Author ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Portrait URL (may be empty).
    pub image_url: String,
    /// Short biography (may be empty).
    pub bio: String,
}

/// Book in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Book ID.
    pub id: i64,
    /// Title, unique per author.
    pub title: String,
    /// Owning author ID.
    pub author_id: i64,
    /// Owning author name.
    pub author: String,
    /// Description (may be empty).
    pub description: String,
    /// Publication date.
    pub published_date: Option<NaiveDate>,
}

/// Field values for inserting or replacing a book.
#[derive(Debug, Clone)]
pub struct BookFields {
    /// Title.
    pub title: String,
    /// Owning author ID.
    pub author_id: i64,
    /// Description.
    pub description: String,
    /// Publication date.
    pub published_date: Option<NaiveDate>,
}

/// Field values for inserting or replacing an author.
#[derive(Debug, Clone)]
pub struct AuthorFields {
    /// Display name.
    pub name: String,
    /// Portrait URL.
    pub image_url: String,
    /// Biography.
    pub bio: String,
}

/// User account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: i64,
    /// Username for login.
    pub username: String,
    /// Email address.
    pub email: Option<String>,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Account creation timestamp.
    pub created_at: i64,
    /// Last login timestamp.
    pub last_login: Option<i64>,
}

/// A user's bookmark of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    /// Favorite ID.
    pub id: i64,
    /// Owning user ID.
    #[serde(rename = "user")]
    pub user_id: i64,
    /// Favorited book ID.
    #[serde(rename = "book")]
    pub book_id: i64,
}

/// Revoked refresh token.
#[derive(Debug, Clone)]
pub struct BlacklistedToken {
    /// The encoded refresh token.
    pub token: String,
    /// Revocation timestamp.
    pub blacklisted_at: i64,
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}
