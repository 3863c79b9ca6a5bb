use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable overriding the token signing secret.
pub const SECRET_ENV: &str = "LIBRARY_SECRET";

/// Library catalog backend with token authentication.
#[derive(Parser, Debug, Clone)]
#[command(name = "library-catalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "LIBRARY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the server (default if no command given).
    Serve {
        /// Address to bind the server to.
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// User management commands.
    User {
        /// User subcommand action.
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Initialize database and create default config.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// User management subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Add a new user.
    Add {
        /// Username.
        username: String,
        /// Password (will prompt if not provided).
        #[arg(short, long)]
        password: Option<String>,
        /// Email address.
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Delete a user and their favorites.
    Del {
        /// Username to delete.
        username: String,
    },

    /// List all users.
    List,
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Favorites configuration.
    #[serde(default)]
    pub favorites: FavoritesConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(
        std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        8000,
    )
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/catalog.db")
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign tokens. Empty means "generate at startup".
    #[serde(default)]
    pub secret: String,

    /// Registration mode: "open", "disabled".
    #[serde(default = "default_registration")]
    pub registration: String,

    /// Access token lifetime in minutes.
    #[serde(default = "default_access_minutes")]
    pub access_token_minutes: u32,

    /// Refresh token lifetime in days.
    #[serde(default = "default_refresh_days")]
    pub refresh_token_days: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            registration: default_registration(),
            access_token_minutes: default_access_minutes(),
            refresh_token_days: default_refresh_days(),
        }
    }
}

fn default_registration() -> String {
    "open".to_string()
}

fn default_access_minutes() -> u32 {
    5
}

fn default_refresh_days() -> u32 {
    1
}

impl AuthConfig {
    /// Check if registration is enabled.
    pub fn registration_enabled(&self) -> bool {
        self.registration == "open"
    }

    /// Signing secret, preferring the environment over the file.
    pub fn resolved_secret(&self) -> Option<String> {
        std::env::var(SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.secret.clone()).filter(|s| !s.is_empty()))
    }
}

/// Favorites configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesConfig {
    /// Maximum favorites per user.
    #[serde(default = "default_favorites_limit")]
    pub limit: u32,

    /// Maximum recommendations returned after adding a favorite.
    #[serde(default = "default_recommendations")]
    pub recommendations: u32,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            limit: default_favorites_limit(),
            recommendations: default_recommendations(),
        }
    }
}

fn default_favorites_limit() -> u32 {
    20
}

fn default_recommendations() -> u32 {
    5
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("library-catalog.toml"),
            dirs::config_dir()
                .map(|p| p.join("library-catalog").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/library-catalog/config.toml"),
        ];

        candidates.into_iter().find(|p| p.is_file())
    }

    /// Generate default config file content with the given signing secret.
    pub fn generate_default(secret: &str) -> String {
        format!(
            r#"# library-catalog configuration

[server]
bind = "0.0.0.0:8000"

[database]
# path = "/var/lib/library-catalog/catalog.db"

[auth]
# Token signing secret (LIBRARY_SECRET overrides this)
secret = "{secret}"
# Registration mode: "open" or "disabled"
registration = "open"
access_token_minutes = 5
refresh_token_days = 1

[favorites]
limit = 20
recommendations = 5
"#
        )
    }
}
