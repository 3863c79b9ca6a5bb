//! Authentication module.
//!
//! Passwords are stored as Argon2 hashes. Sessions are a pair of HS256 JWTs:
//! a short-lived access token checked statelessly on every request, and a
//! longer-lived refresh token that is also checked against the persisted
//! blacklist each time it is presented.

use crate::config::AuthConfig;
use crate::db::{self, Database, User};
use crate::error::{AppError, Result};
use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::{OsRng, RngCore},
    },
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const INVALID_CREDENTIALS: &str = "Invalid login credentials.";
const INVALID_TOKEN: &str = "Token is invalid or expired";

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate a random signing secret.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Token kind, embedded in the claims so one cannot stand in for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived request credential.
    Access,
    /// Long-lived credential exchanged for access tokens.
    Refresh,
}

/// JWT claims shared by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    /// Username (access tokens only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Token kind.
    pub token_type: TokenType,
    /// Unique token ID.
    pub jti: String,
    /// Expiration timestamp.
    pub exp: i64,
    /// Issued-at timestamp.
    pub iat: i64,
}

impl Claims {
    fn user_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| AppError::Auth(INVALID_TOKEN.to_string()))
    }
}

/// Access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token.
    pub access: String,
    /// Refresh token.
    pub refresh: String,
}

/// A newly registered user with their first token pair.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Created user.
    pub user: User,
    /// Issued tokens.
    pub tokens: TokenPair,
}

/// Authentication service.
pub struct AuthService {
    db: Database,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
    registration_enabled: bool,
    dummy_hash: OnceLock<String>,
}

impl AuthService {
    /// Create a new auth service signing with `secret`.
    pub fn new(db: Database, secret: &str, config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            db,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_lifetime: Duration::minutes(i64::from(config.access_token_minutes)),
            refresh_lifetime: Duration::days(i64::from(config.refresh_token_days)),
            registration_enabled: config.registration_enabled(),
            dummy_hash: OnceLock::new(),
        }
    }

    /// Register a new user and log them in.
    pub fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<Registration> {
        if !self.registration_enabled {
            return Err(AppError::Validation("Registration is disabled".to_string()));
        }

        let user = self.create_user(username, password, email)?;
        let tokens = self.issue_tokens(&user)?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(Registration { user, tokens })
    }

    /// Create a new user (admin function).
    pub fn create_user(&self, username: &str, password: &str, email: Option<&str>) -> Result<User> {
        validate_username(username)?;

        if password.is_empty() {
            return Err(AppError::Validation("Password may not be blank.".to_string()));
        }

        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if let Some(email) = email {
            validate_email(email)?;
        }

        // Hash outside the lock; Argon2 is deliberately slow.
        let password_hash = hash_password(password)?;

        self.db.write(|conn| {
            if db::get_user_by_username(conn, username)?.is_some() {
                return Err(AppError::Validation("Username already exists.".to_string()));
            }
            if let Some(email) = email {
                if db::email_taken(conn, email)? {
                    return Err(AppError::Validation("Email already exists.".to_string()));
                }
            }
            db::insert_user(conn, username, email, &password_hash)
        })
    }

    /// Check credentials and issue a token pair.
    pub fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let user = self
            .db
            .read(|conn| db::get_user_by_username(conn, username))?;

        // Same error and same Argon2 cost whichever half was wrong.
        let verified = match &user {
            Some(user) => verify_password(password, &user.password_hash)?,
            None => {
                verify_password(password, self.dummy_hash()?)?;
                false
            }
        };

        let user = match user {
            Some(user) if verified => user,
            _ => {
                tracing::debug!(username, "Login failed");
                return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
            }
        };

        self.db.write(|conn| db::update_last_login(conn, user.id))?;
        self.issue_tokens(&user)
    }

    /// Exchange a refresh token for a new access token.
    pub fn refresh(&self, refresh_token: &str) -> Result<String> {
        let claims = self.decode_token(refresh_token, TokenType::Refresh)?;

        let user = self.db.read(|conn| {
            if db::is_blacklisted(conn, refresh_token)? {
                return Err(AppError::Auth("Token is blacklisted".to_string()));
            }
            db::get_user_by_id(conn, claims.user_id()?)
        })?;

        let user = user.ok_or_else(|| AppError::Auth("User not found".to_string()))?;
        self.encode_token(&user, TokenType::Access)
    }

    /// Blacklist a refresh token so it can never be used again.
    pub fn logout(&self, refresh_token: &str) -> Result<()> {
        let claims = self.decode_token(refresh_token, TokenType::Refresh)?;

        let inserted = self
            .db
            .write(|conn| db::insert_blacklisted(conn, refresh_token))?;
        if !inserted {
            return Err(AppError::Auth("Token is blacklisted".to_string()));
        }

        tracing::info!(user_id = %claims.sub, jti = %claims.jti, "Refresh token blacklisted");
        Ok(())
    }

    /// Validate an access token and return its user.
    pub fn authenticate(&self, access_token: &str) -> Result<User> {
        let claims = self.decode_token(access_token, TokenType::Access)?;
        let user_id = claims.user_id()?;

        self.db
            .read(|conn| db::get_user_by_id(conn, user_id))?
            .ok_or_else(|| AppError::Auth("User not found".to_string()))
    }

    /// Delete a user.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        self.db.write(|conn| db::delete_user(conn, username))
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.db.read(db::list_users)
    }

    /// Hash verified against when the username is unknown.
    fn dummy_hash(&self) -> Result<&str> {
        if let Some(hash) = self.dummy_hash.get() {
            return Ok(hash.as_str());
        }
        let hash = hash_password("not-a-real-password")?;
        Ok(self.dummy_hash.get_or_init(|| hash).as_str())
    }

    fn issue_tokens(&self, user: &User) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.encode_token(user, TokenType::Access)?,
            refresh: self.encode_token(user, TokenType::Refresh)?,
        })
    }

    fn encode_token(&self, user: &User, token_type: TokenType) -> Result<String> {
        let now = Utc::now();
        let (lifetime, username) = match token_type {
            TokenType::Access => (self.access_lifetime, Some(user.username.clone())),
            TokenType::Refresh => (self.refresh_lifetime, None),
        };

        let claims = Claims {
            sub: user.id.to_string(),
            username,
            token_type,
            jti: uuid::Uuid::new_v4().simple().to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    fn decode_token(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::Auth(INVALID_TOKEN.to_string())
            })?
            .claims;

        if claims.token_type != expected {
            return Err(AppError::Auth("Token has wrong type".to_string()));
        }

        Ok(claims)
    }
}

/// Letters, digits and `@.+-_`, 1-150 characters.
fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() || username.chars().count() > 150 {
        return Err(AppError::Validation(
            "Username must be 1-150 characters".to_string(),
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AppError::Validation(
            "Username can only contain letters, numbers and @/./+/-/_".to_string(),
        ));
    }

    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Enter a valid email address.".to_string(),
        ))
    }
}
