//! Application state shared across handlers.

use crate::auth::AuthService;
use crate::catalog::CatalogService;
use crate::config::Config;
use crate::db::Database;
use crate::favorites::FavoritesService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Authentication service.
    pub auth: Arc<AuthService>,
    /// Author and book operations.
    pub catalog: CatalogService,
    /// Favorites operations.
    pub favorites: FavoritesService,
}

impl AppState {
    /// Wire all services onto one database, signing tokens with `secret`.
    pub fn new(config: &Config, db: Database, secret: &str) -> Self {
        Self {
            auth: Arc::new(AuthService::new(db.clone(), secret, &config.auth)),
            favorites: FavoritesService::new(db.clone(), &config.favorites),
            catalog: CatalogService::new(db),
        }
    }
}
