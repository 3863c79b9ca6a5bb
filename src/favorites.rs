//! Per-user favorites and same-author recommendations.

use crate::config::FavoritesConfig;
use crate::db::{self, Book, Database, Favorite, User};
use crate::error::{AppError, Result};

/// Outcome of adding a favorite.
#[derive(Debug, Clone)]
pub struct AddedFavorite {
    /// The stored favorite.
    pub favorite: Favorite,
    /// Other books by the authors the user favors.
    pub recommendations: Vec<Book>,
}

/// Bounded favorites list per user.
#[derive(Clone)]
pub struct FavoritesService {
    db: Database,
    limit: u32,
    recommendations: u32,
}

impl FavoritesService {
    /// Create a new favorites service.
    pub fn new(db: Database, config: &FavoritesConfig) -> Self {
        Self {
            db,
            limit: config.limit,
            recommendations: config.recommendations,
        }
    }

    /// Favorite a book and compute recommendations.
    ///
    /// The cap, existence and uniqueness checks run in the same transaction
    /// as the insert, so concurrent adds cannot push a user past the limit.
    pub fn add_favorite(&self, user: &User, book_id: i64) -> Result<AddedFavorite> {
        let added = self.db.write(|conn| {
            if db::count_favorites(conn, user.id)? >= self.limit {
                return Err(AppError::LimitExceeded(format!(
                    "Maximum of {} favorite books allowed.",
                    self.limit
                )));
            }

            if !db::book_exists(conn, book_id)? {
                return Err(AppError::NotFound("Book not found".to_string()));
            }

            if db::favorite_exists(conn, user.id, book_id)? {
                return Err(AppError::Conflict(
                    "This book is already in your favorites.".to_string(),
                ));
            }

            let favorite = db::insert_favorite(conn, user.id, book_id)?;
            let recommendations = db::recommend_books(conn, user.id, self.recommendations)?;

            Ok(AddedFavorite {
                favorite,
                recommendations,
            })
        })?;

        tracing::info!(
            user_id = user.id,
            book_id,
            recommendations = added.recommendations.len(),
            "Favorite added"
        );
        Ok(added)
    }

    /// Recommendations for the user's current favorites.
    pub fn recommendations(&self, user: &User) -> Result<Vec<Book>> {
        self.db
            .read(|conn| db::recommend_books(conn, user.id, self.recommendations))
    }

    /// List the user's favorites.
    pub fn list_favorites(&self, user: &User) -> Result<Vec<Favorite>> {
        self.db.read(|conn| db::list_favorites(conn, user.id))
    }

    /// Remove one of the user's favorites.
    pub fn remove_favorite(&self, user: &User, favorite_id: i64) -> Result<()> {
        if !self
            .db
            .write(|conn| db::delete_favorite(conn, user.id, favorite_id))?
        {
            return Err(AppError::NotFound("Favorite not found".to_string()));
        }
        Ok(())
    }
}
