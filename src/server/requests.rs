//! Typed request bodies and their field validation.
//!
//! Shape errors (missing fields, wrong types, bad dates) are caught by serde
//! when the body is extracted; the rules here cover what serde cannot express.

use crate::db::{AuthorFields, BookFields};
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use serde::Deserialize;

const MAX_NAME_CHARS: usize = 255;
const MAX_URL_CHARS: usize = 200;

/// Author create/update body.
#[derive(Debug, Deserialize)]
pub struct AuthorRequest {
    name: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    bio: Option<String>,
}

impl AuthorRequest {
    /// Validate and normalize into storable fields.
    pub fn into_fields(self) -> Result<AuthorFields> {
        let name = required_text("name", &self.name)?;

        let image_url = self.image_url.unwrap_or_default().trim().to_string();
        if !image_url.is_empty() {
            if image_url.chars().count() > MAX_URL_CHARS {
                return Err(AppError::Validation(format!(
                    "image_url: Ensure this field has no more than {} characters.",
                    MAX_URL_CHARS
                )));
            }
            if !(image_url.starts_with("http://") || image_url.starts_with("https://")) {
                return Err(AppError::Validation(
                    "image_url: Enter a valid URL.".to_string(),
                ));
            }
        }

        Ok(AuthorFields {
            name,
            image_url,
            bio: self.bio.unwrap_or_default(),
        })
    }
}

/// Book create/update body.
#[derive(Debug, Deserialize)]
pub struct BookRequest {
    title: String,
    author_id: i64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    published_date: Option<NaiveDate>,
}

impl BookRequest {
    /// Validate and normalize into storable fields.
    pub fn into_fields(self) -> Result<BookFields> {
        Ok(BookFields {
            title: required_text("title", &self.title)?,
            author_id: self.author_id,
            description: self.description.unwrap_or_default(),
            published_date: self.published_date,
        })
    }
}

/// Add-favorite body.
#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    /// Book to favorite.
    pub book_id: i64,
}

/// Registration body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Requested username.
    pub username: String,
    /// Plaintext password.
    pub password: String,
    /// Optional email.
    #[serde(default)]
    pub email: Option<String>,
}

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Body carrying a refresh token (logout and refresh).
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    refresh: Option<String>,
}

impl RefreshRequest {
    /// The token, or a validation error when absent or blank.
    pub fn token(self) -> Result<String> {
        self.refresh
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Refresh token is required.".to_string()))
    }
}

/// Trimmed, non-blank, at most 255 characters.
fn required_text(field: &str, value: &str) -> Result<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(AppError::Validation(format!(
            "{}: This field may not be blank.",
            field
        )));
    }

    if value.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::Validation(format!(
            "{}: Ensure this field has no more than {} characters.",
            field, MAX_NAME_CHARS
        )));
    }

    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(json: &str) -> Result<AuthorFields> {
        serde_json::from_str::<AuthorRequest>(json)
            .unwrap()
            .into_fields()
    }

    #[test]
    fn author_optional_fields_default_to_empty() {
        let fields = author(r#"{"name": "  Jane Doe "}"#).unwrap();
        assert_eq!(fields.name, "Jane Doe");
        assert_eq!(fields.image_url, "");
        assert_eq!(fields.bio, "");
    }

    #[test]
    fn author_rejects_blank_or_long_names() {
        assert!(author(r#"{"name": "   "}"#).is_err());
        let long = format!(r#"{{"name": "{}"}}"#, "x".repeat(256));
        assert!(author(&long).is_err());
        let max = format!(r#"{{"name": "{}"}}"#, "x".repeat(255));
        assert!(author(&max).is_ok());
    }

    #[test]
    fn author_image_url_must_be_http() {
        assert!(author(r#"{"name": "J", "image_url": "https://x.org/a.png"}"#).is_ok());
        assert!(author(r#"{"name": "J", "image_url": ""}"#).is_ok());
        assert!(author(r#"{"name": "J", "image_url": "ftp://x.org"}"#).is_err());
    }

    #[test]
    fn author_requires_name() {
        assert!(serde_json::from_str::<AuthorRequest>(r#"{"bio": "b"}"#).is_err());
    }

    #[test]
    fn book_parses_dates_and_defaults() {
        let req: BookRequest = serde_json::from_str(
            r#"{"title": "Foo", "author_id": 1, "published_date": "2020-02-29"}"#,
        )
        .unwrap();
        let fields = req.into_fields().unwrap();
        assert_eq!(fields.description, "");
        assert_eq!(
            fields.published_date,
            NaiveDate::from_ymd_opt(2020, 2, 29)
        );

        let req: BookRequest =
            serde_json::from_str(r#"{"title": "Foo", "author_id": 1, "published_date": null}"#)
                .unwrap();
        assert!(req.into_fields().unwrap().published_date.is_none());
    }

    #[test]
    fn book_rejects_bad_shapes() {
        assert!(serde_json::from_str::<BookRequest>(r#"{"title": "Foo"}"#).is_err());
        assert!(
            serde_json::from_str::<BookRequest>(r#"{"title": "Foo", "author_id": "one"}"#)
                .is_err()
        );
        assert!(
            serde_json::from_str::<BookRequest>(
                r#"{"title": "Foo", "author_id": 1, "published_date": "2021-13-01"}"#
            )
            .is_err()
        );
    }

    #[test]
    fn refresh_token_required() {
        let empty: RefreshRequest = serde_json::from_str("{}").unwrap();
        assert!(matches!(empty.token(), Err(AppError::Validation(_))));

        let blank: RefreshRequest = serde_json::from_str(r#"{"refresh": " "}"#).unwrap();
        assert!(blank.token().is_err());

        let present: RefreshRequest = serde_json::from_str(r#"{"refresh": "abc"}"#).unwrap();
        assert_eq!(present.token().unwrap(), "abc");
    }
}
